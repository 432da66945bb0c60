// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use gcsfs::{GcsStorageFactory, TransferMode};

use cmd::commands::{delete_command, transfer_command, validate_command, write_command};
use cmd::common::{PluginKind, run_context};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "gcsplug")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Runtime argument as key=value, e.g. gcp.cmek.key.name=projects/...
    #[arg(long = "arg", global = true, value_name = "KEY=VALUE")]
    args: Vec<String>,

    /// Storage endpoint, e.g. a local GCS emulator
    #[arg(long, global = true)]
    endpoint: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a stage configuration without running it
    Validate {
        /// Plugin the configuration is for
        #[arg(value_enum)]
        plugin: PluginKind,
        /// Stage configuration file (YAML or JSON)
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Delete the configured paths (GCSBucketDelete)
    Delete {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Copy an object or directory (GCSCopy)
    Copy {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Move an object or directory (GCSMove)
    Move {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Write the rows of a CSV file through the GCS sink
    Write {
        #[arg(short, long)]
        config: PathBuf,
        /// CSV input with a header row
        #[arg(short, long)]
        input: PathBuf,
        /// Logical start time used for the path suffix (RFC 3339)
        #[arg(long)]
        start_time: Option<String>,
    },
}

#[allow(clippy::print_stdout)]
fn print(text: String) {
    print!("{}", text);
}

#[tokio::main]
async fn main() -> Result<()> {
    diagnostics::init();

    let cli = Cli::parse();

    let factory = match &cli.endpoint {
        Some(endpoint) => GcsStorageFactory::new().with_endpoint(endpoint.as_str()),
        None => GcsStorageFactory::new(),
    };

    match &cli.command {
        Commands::Validate { plugin, config } => {
            validate_command(&factory, *plugin, config, print).await
        }
        Commands::Delete { config } => {
            let context = run_context(&cli.args, None)?;
            delete_command(&factory, &context, config, print).await.map(|_| ())
        }
        Commands::Copy { config } => {
            let context = run_context(&cli.args, None)?;
            transfer_command(&factory, &context, TransferMode::Copy, config, print)
                .await
                .map(|_| ())
        }
        Commands::Move { config } => {
            let context = run_context(&cli.args, None)?;
            transfer_command(&factory, &context, TransferMode::Move, config, print)
                .await
                .map(|_| ())
        }
        Commands::Write {
            config,
            input,
            start_time,
        } => {
            let context = run_context(&cli.args, start_time.as_deref())?;
            write_command(&factory, &context, config, input, print)
                .await
                .map(|_| ())
        }
    }
}
