//! Saving many independent tables at once.
//!
//! Each table is encoded and written on its own; nothing is shared between
//! them, so with the `parallel` feature the work is spread over Rayon's
//! pool.  Without it the tables are saved one after another.  Either way
//! every table is attempted and the first error, in table order, is
//! returned.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::CodecConfig;
use crate::error::Result;
use crate::table::DbcTable;

/// Save every table into `folder`.  With `config.sort_before_save` each
/// table is sorted by its rows' sort keys first.
///
/// Returns the written paths in table order.
pub fn save_all<P: AsRef<Path>>(
    tables: &mut [DbcTable],
    folder: P,
    config: &CodecConfig,
) -> Result<Vec<PathBuf>> {
    let folder = folder.as_ref();
    let sort = config.sort_before_save;
    let save_one = |table: &mut DbcTable| -> Result<PathBuf> {
        if sort {
            table.sort_rows();
        }
        table.save(folder)
    };

    #[cfg(feature = "parallel")]
    let results: Vec<Result<PathBuf>> = {
        use rayon::prelude::*;
        tables.par_iter_mut().map(save_one).collect()
    };

    #[cfg(not(feature = "parallel"))]
    let results: Vec<Result<PathBuf>> = tables.iter_mut().map(save_one).collect();

    let mut paths = Vec::with_capacity(results.len());
    for r in results {
        paths.push(r?);
    }
    info!(tables = paths.len(), folder = %folder.display(), "saved tables");
    Ok(paths)
}
