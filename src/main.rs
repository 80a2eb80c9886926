use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use wdbc::{CodecConfig, DbcTable, StringPool, TableHeader};

#[derive(Parser)]
#[command(name = "dbc", about = "Inspect and verify WDBC client tables")]
struct Cli {
    /// Log load/save details (honours RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Suppress all log output
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show header fields and file statistics
    Info {
        input: PathBuf,
    },
    /// Print records as hex
    Dump {
        input: PathBuf,
        /// Only print the first N records
        #[arg(short, long)]
        rows: Option<usize>,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Decode and re-encode in memory; fail unless the bytes are identical
    Verify {
        input: PathBuf,
    },
    /// Show the configured identifier ranges
    Ids {
        /// JSON config file (built-in defaults when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct DumpRow {
    index: usize,
    id:    Option<i32>,
    kind:  &'static str,
    hex:   String,
}

#[derive(Serialize)]
struct DumpOutput<'a> {
    file:   &'a str,
    header: TableHeader,
    rows:   Vec<DumpRow>,
}

fn init_tracing(cli: &Cli) {
    let filter = if cli.quiet {
        tracing_subscriber::EnvFilter::new("off")
    } else if cli.verbose {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "debug".into())
    } else {
        tracing_subscriber::EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(&cli);

    match cli.command {

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input } => {
            let bytes = std::fs::read(&input)?;
            let table = DbcTable::from_bytes(file_name(&input), &bytes)?;
            let header = table.header();
            let strings = StringPool::from_block(table.string_block().to_vec());

            println!("── WDBC table ───────────────────────────────────────────");
            println!("  Path           {}", input.display());
            println!("  Records        {}", header.record_count);
            println!("  Fields         {}", header.field_count);
            println!("  Record size    {} B", header.record_size);
            println!("  String block   {} B ({} strings)", header.string_block_size, strings.string_count());
            println!("  File length    {} B", bytes.len());
            println!("  CRC32          {:08x}", crc32fast::hash(&bytes));
        }

        // ── Dump ─────────────────────────────────────────────────────────────
        Commands::Dump { input, rows, json } => {
            let table = open_table(&input)?;
            let limit = rows.unwrap_or(usize::MAX);
            let dumped: Vec<DumpRow> = table
                .rows()
                .iter()
                .take(limit)
                .enumerate()
                .map(|(index, row)| DumpRow {
                    index,
                    id:   row.id(),
                    kind: if row.is_raw() { "raw" } else { "typed" },
                    hex:  row.raw_bytes().map(hex::encode).unwrap_or_default(),
                })
                .collect();

            if json {
                let out = DumpOutput { file: table.file_name(), header: *table.header(), rows: dumped };
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("{:>6} {:>10}  Bytes", "Row", "ID");
                for row in dumped {
                    let id = row.id.map(|v| v.to_string()).unwrap_or_else(|| "-".into());
                    println!("{:>6} {:>10}  {}", row.index, id, row.hex);
                }
            }
        }

        // ── Verify ───────────────────────────────────────────────────────────
        Commands::Verify { input } => {
            let bytes = std::fs::read(&input)?;
            let table = DbcTable::from_bytes(file_name(&input), &bytes)?;
            let encoded = table.to_bytes()?;
            // Trailing bytes past the declared layout are not part of the table.
            let expected = &bytes[..encoded.len().min(bytes.len())];
            if encoded == expected {
                println!("OK  {} ({} records, byte-identical)", input.display(), table.len());
            } else {
                let at = encoded.iter().zip(bytes.iter()).position(|(a, b)| a != b)
                    .unwrap_or_else(|| encoded.len().min(bytes.len()));
                return Err(format!("{}: re-encoded output differs at byte {at}", input.display()).into());
            }
        }

        // ── Ids ──────────────────────────────────────────────────────────────
        Commands::Ids { config } => {
            let config = match config {
                Some(path) => CodecConfig::from_path(path)?,
                None       => CodecConfig::default(),
            };
            let allocators = config.build_allocators()?;
            println!("{:<18} Ranges", "Allocator");
            for alloc in allocators.iter() {
                let ranges: Vec<String> = alloc.ranges().iter()
                    .map(|r| format!("{}..={}", r.start, r.end))
                    .collect();
                println!("{:<18} {}", alloc.name(), ranges.join(", "));
            }
            println!("sort_before_save = {}", config.sort_before_save);
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn open_table(path: &Path) -> Result<DbcTable, Box<dyn std::error::Error>> {
    let folder = path.parent().unwrap_or_else(|| Path::new("."));
    let mut table = DbcTable::default();
    table.load(folder, &file_name(path))?;
    Ok(table)
}
