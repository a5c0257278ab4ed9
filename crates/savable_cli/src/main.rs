//! Savable CLI
//!
//! Command-line tools for inspecting and editing Savable stores.
//!
//! # Commands
//!
//! - `inspect` - Display store statistics
//! - `query` - Run a filter chain and print the matching rows
//! - `get` - Print one object or one field
//! - `put` / `put-list` - Write one field or one list
//! - `delete` - Delete one object or one field

mod commands;

use clap::{Args, Parser, Subcommand};
use commands::StoreArgs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Savable command-line store tools.
#[derive(Parser)]
#[command(name = "savable")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    store: StoreOptions,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct StoreOptions {
    /// JSON configuration file
    #[arg(global = true, short, long)]
    config: Option<PathBuf>,

    /// Engine to open when no configuration file is given (flat-file, sqlite, document)
    #[arg(global = true, short, long)]
    engine: Option<String>,

    /// Path of the store
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Display store statistics
    Inspect {
        /// Only count objects whose id starts with this prefix
        #[arg(long)]
        prefix: Option<String>,

        /// List every object
        #[arg(short, long)]
        objects: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Run a filter chain
    Query {
        /// Filter as `[and:|or:]column:type:value`, e.g. `row_id:starts_with:user-`
        #[arg(short = 'w', long = "where")]
        filters: Vec<String>,

        /// Columns to return (row_id, key, value); all when omitted
        #[arg(long = "column")]
        columns: Vec<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print one object, or one of its fields
    Get {
        /// Object id
        object_id: String,

        /// Field name; the whole object when omitted
        key: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Write one field
    Put {
        /// Object id
        object_id: String,

        /// Field name
        key: String,

        /// Value in its stored text form
        value: String,

        /// Type name of the value (string, int, float, bool, uuid)
        #[arg(short = 't', long = "type", default_value = "string")]
        type_name: String,
    },

    /// Write one list
    PutList {
        /// Object id
        object_id: String,

        /// List name
        key: String,

        /// List items
        items: Vec<String>,
    },

    /// Delete one object, or one of its fields
    Delete {
        /// Object id
        object_id: String,

        /// Field name; the whole object when omitted
        key: Option<String>,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let store = StoreArgs {
        config: cli.store.config,
        engine: cli.store.engine,
        path: cli.store.path,
    };

    match cli.command {
        Commands::Inspect {
            prefix,
            objects,
            format,
        } => {
            let backend = store.open()?;
            commands::inspect::run(backend, prefix.as_deref(), objects, &format)?;
        }
        Commands::Query {
            filters,
            columns,
            format,
        } => {
            let backend = store.open()?;
            commands::query::run(backend.as_ref(), &filters, &columns, &format)?;
        }
        Commands::Get {
            object_id,
            key,
            format,
        } => {
            let backend = store.open()?;
            commands::object::get(backend, &object_id, key.as_deref(), &format)?;
        }
        Commands::Put {
            object_id,
            key,
            value,
            type_name,
        } => {
            let backend = store.open()?;
            commands::object::put(backend.as_ref(), &object_id, &key, &value, &type_name)?;
        }
        Commands::PutList {
            object_id,
            key,
            items,
        } => {
            let backend = store.open()?;
            commands::object::put_list(backend, &object_id, &key, &items)?;
        }
        Commands::Delete { object_id, key } => {
            let backend = store.open()?;
            commands::object::delete(backend, &object_id, key.as_deref())?;
        }
        Commands::Version => {
            println!("Savable CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
