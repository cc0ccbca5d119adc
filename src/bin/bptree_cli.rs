//! Command-line shell for the B+Tree index and its tables.
//!
//! Usage:
//!   bptree_cli [--data-dir DIR] shell
//!   bptree_cli [--data-dir DIR] exec "SELECT * FROM movie WHERE key < 100"
//!   bptree_cli [--data-dir DIR] dump <table>
//!   bptree_cli [--data-dir DIR] stats <table>

use bptree_index::query::Outcome;
use bptree_index::{BTreeConfig, Config, SqlEngine};
use clap::{Parser, Subcommand};
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::process::exit;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "bptree_cli", version, about = "B+Tree index shell")]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "BPTREE_DATA_DIR",
        default_value = ".",
        help = "Directory holding table and index files"
    )]
    data_dir: PathBuf,

    #[arg(long, global = true, help = "Sync every page write to disk")]
    sync: bool,

    #[arg(
        long,
        global = true,
        help = "Maximum keys per node for newly built indexes (2-85)"
    )]
    max_keys: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Read statements from standard input")]
    Shell,

    #[command(about = "Run a single statement")]
    Exec {
        #[arg(value_name = "STATEMENT")]
        statement: String,
    },

    #[command(about = "Print the index tree of a table as JSON")]
    Dump {
        #[arg(value_name = "TABLE")]
        table: String,
    },

    #[command(about = "Print index statistics of a table")]
    Stats {
        #[arg(value_name = "TABLE")]
        table: String,
    },
}

fn install_tracing_subscriber() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run<W: Write>(cli: Cli, out: &mut W) -> bptree_index::Result<()> {
    let mut config = Config::new(cli.data_dir).sync_on_write(cli.sync);
    if let Some(max_keys) = cli.max_keys {
        config = config.btree_config(BTreeConfig::uniform(max_keys));
    }
    let engine = SqlEngine::new(config);

    match cli.command {
        Command::Shell => {
            let stdin = io::stdin();
            let prompt = stdin.is_terminal();
            engine.run(stdin.lock(), out, prompt)?;
        }
        Command::Exec { statement } => {
            if let Outcome::Loaded(rows) = engine.execute_line(&statement, out)? {
                writeln!(out, "Loaded {} tuples", rows)?;
            }
        }
        Command::Dump { table } => {
            let index = engine.open_index(&table)?;
            let tree = index.export_tree()?;
            serde_json::to_writer_pretty(&mut *out, &tree).map_err(io::Error::from)?;
            writeln!(out)?;
        }
        Command::Stats { table } => {
            let index = engine.open_index(&table)?;
            let stats = index.stats()?;
            writeln!(out, "Root page: {:?}", stats.root_page)?;
            writeln!(out, "Tree height: {}", stats.tree_height)?;
            writeln!(out, "Pages: {}", stats.page_count)?;
            writeln!(out, "Leaves: {}", stats.leaf_count)?;
            writeln!(out, "Entries: {}", stats.entry_count)?;
        }
    }
    Ok(())
}

fn main() {
    install_tracing_subscriber();
    let cli = Cli::parse();

    let stdout = io::stdout();
    if let Err(e) = run(cli, &mut stdout.lock()) {
        eprintln!("ERROR: {}", e);
        exit(1);
    }
}
