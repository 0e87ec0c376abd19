// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Catalog inspection CLI
//!
//! Reads the schema catalog of a SQLite-backed store without loading any
//! application type.
//!
//! # Usage
//!
//! ```bash
//! # Latest version of every stored type
//! vellum-catalog --db store.db list
//!
//! # Version chain of one type, newest first
//! vellum-catalog --db store.db history app::Point
//!
//! # Full catalog as JSON
//! vellum-catalog --db store.db export --pretty
//! ```

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use vellum::{export_catalog, SqliteStorage, TypeLoader};

#[derive(Parser, Debug)]
#[command(name = "vellum-catalog")]
#[command(about = "Inspect the schema catalog of a vellum store", long_about = None)]
struct Args {
    /// Database path (SQLite file)
    #[arg(short, long, default_value = "vellum.db")]
    db: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the latest version of every stored type
    List,
    /// Show every version of a type, newest first
    History {
        /// Catalog type name
        type_name: String,
    },
    /// Dump the whole catalog as JSON
    Export {
        /// Pretty-print the JSON document
        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let storage = SqliteStorage::new(&args.db, Arc::new(TypeLoader::new()))
        .with_context(|| format!("Failed to open catalog at {}", args.db))?;
    let catalog = export_catalog(&storage).context("Failed to read catalog")?;
    tracing::debug!("{} versions in {}", catalog.versions.len(), args.db);

    match args.command {
        Commands::List => {
            println!(
                "{:<40} {:>6} {:>4} {:>7}  FINGERPRINT",
                "TYPE", "ID", "GEN", "FIELDS"
            );
            for desc in catalog.latest() {
                println!(
                    "{:<40} {:>6} {:>4} {:>7}  {}",
                    desc.type_name,
                    desc.id.to_string(),
                    desc.generation,
                    desc.fields.len(),
                    desc.fingerprint
                );
            }
        }
        Commands::History { type_name } => {
            let history = catalog.history(&type_name);
            if history.is_empty() {
                bail!("Type {} is not in the catalog", type_name);
            }
            for desc in history {
                let predecessor = desc
                    .predecessor
                    .map_or_else(|| "-".to_string(), |p| p.to_string());
                println!(
                    "{} generation {} (predecessor {}, references: {})",
                    desc.id, desc.generation, predecessor, desc.has_references
                );
                for field in &desc.fields {
                    let nested = field
                        .nested
                        .map(|n| format!(" -> {}", n))
                        .unwrap_or_default();
                    println!(
                        "    {}::{}: {}{}",
                        field.owner, field.name, field.signature, nested
                    );
                }
                for change in &desc.changes {
                    println!("  {}", change);
                }
            }
        }
        Commands::Export { pretty } => {
            println!("{}", catalog.to_json(pretty)?);
        }
    }

    Ok(())
}
