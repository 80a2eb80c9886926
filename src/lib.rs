pub mod error;
pub mod header;
pub mod string_pool;
pub mod field;
pub mod row;
pub mod table;
pub mod ids;
pub mod config;
pub mod batch;

pub use error::{DbcError, Result};
pub use header::{TableHeader, HEADER_SIZE, MAGIC};
pub use string_pool::{decode_cstr, StringPool};
pub use field::{FieldKind, FieldValue, TableLayout, LOCALE_FLAGS};
pub use row::{Row, RowReader, SortKeys, TypedRow};
pub use table::DbcTable;
pub use ids::{IdAllocator, IdAllocators, IdError, IdRange, LocalIdAllocator};
pub use config::CodecConfig;
