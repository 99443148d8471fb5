mod commands;
mod logging;
mod secrets;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "pipewright",
    version,
    about = "Provisions CI/CD pipelines on AWS CodePipeline"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Path to the pipeline definition YAML file
    #[arg(short = 'f', long = "file", default_value = "pipewright.yml", global = true)]
    file: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the pipeline file without touching any account
    Check,
    /// Deploy one pipeline, or every pipeline in the file
    Deploy {
        /// Path to the account config YAML file
        #[arg(long)]
        account_config: PathBuf,
        /// Pipeline to deploy (default: all pipelines in the file)
        #[arg(long)]
        pipeline: Option<String>,
        /// Secret value as phase:key=value (repeatable); falls back to
        /// PIPEWRIGHT_SECRET_<PHASE>_<KEY> env vars
        #[arg(long = "secret")]
        secrets: Vec<String>,
    },
    /// Delete a pipeline and the resources its phases provisioned
    Delete {
        /// Path to the account config YAML file
        #[arg(long)]
        account_config: PathBuf,
        /// Pipeline to delete
        #[arg(long)]
        pipeline: String,
    },
    /// List the secrets the file's phases need before a deploy
    ListSecrets,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    match cli.command {
        Commands::Check => commands::check::execute(&cli.file),
        Commands::Deploy {
            account_config,
            pipeline,
            secrets,
        } => {
            commands::deploy::execute(&cli.file, &account_config, pipeline.as_deref(), &secrets)
                .await
        }
        Commands::Delete {
            account_config,
            pipeline,
        } => commands::delete::execute(&cli.file, &account_config, &pipeline).await,
        Commands::ListSecrets => commands::list_secrets::execute(&cli.file),
    }
}
