//! UniStore Demo CLI
//!
//! Command-line interface for trying the unified store against the built-in
//! fake backend and a remote receipt validator.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod ui;

#[derive(Parser)]
#[command(name = "unistore-demo")]
#[command(about = "UniStore Demo CLI - Try unified in-app purchase flows", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Store configuration file (JSON) for `buy` and `restore`; UNISTORE_* env vars override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the products in a catalog file
    Catalog {
        /// Catalog file: {"id": "type"} map or array of products
        file: PathBuf,
    },

    /// Buy a product and print the resulting events
    Buy {
        /// Product id
        id: String,

        /// Catalog file (defaults to the built-in demo catalog)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Validate the receipt against this endpoint
        #[arg(long)]
        validation_url: Option<String>,
    },

    /// Restore purchases and print the result
    Restore {
        /// Catalog file (defaults to the built-in demo catalog)
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Submit a receipt to a validation endpoint once
    Validate {
        /// Validation endpoint URL
        #[arg(long)]
        url: String,

        /// Receipt text
        #[arg(long)]
        receipt: String,

        /// Product id the receipt belongs to
        #[arg(long)]
        product: String,

        /// Receipt encoding (raw, base64, unified_envelope)
        #[arg(long, default_value = "raw")]
        encoding: String,

        /// Application identifier sent as bundle_id
        #[arg(long, default_value = "")]
        bundle_id: String,

        /// Device identifier sent as user_id
        #[arg(long, default_value = "")]
        user_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("unistore_demo_cli=debug,unistore_lib=debug")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("unistore_demo_cli=info,unistore_lib=warn")
            .init();
    }

    match cli.command {
        Commands::Catalog { file } => {
            commands::catalog::run(&file, cli.verbose).await?;
        }
        Commands::Buy {
            id,
            catalog,
            validation_url,
        } => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::buy::run(config, catalog.as_deref(), &id, validation_url, cli.verbose)
                .await?;
        }
        Commands::Restore { catalog } => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::restore::run(config, catalog.as_deref(), cli.verbose).await?;
        }
        Commands::Validate {
            url,
            receipt,
            product,
            encoding,
            bundle_id,
            user_id,
        } => {
            commands::validate::run(
                commands::validate::ValidateArgs {
                    url,
                    receipt,
                    product,
                    encoding,
                    bundle_id,
                    user_id,
                },
                cli.verbose,
            )
            .await?;
        }
    }

    Ok(())
}
