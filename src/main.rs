use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use pikpak_dl::{
    download_files, download_folder, ApiConfig, DownloadConfig, FsStore, PikPakClient,
    DEFAULT_API_URL,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Exit code for a rejected or missing session.
const EXIT_AUTH: u8 = 1;
/// Exit code for errors that stop the run before any transfer.
const EXIT_FATAL: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "pikpak-dl")]
#[command(about = "Mirror PikPak drive folders to local storage", long_about = None)]
#[command(version)]
struct Cli {
    /// Access token of an established PikPak session
    #[arg(long, env = "PIKPAK_ACCESS_TOKEN", hide_env_values = true, default_value = "")]
    token: String,

    /// Drive API base URL
    #[arg(long, env = "PIKPAK_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download files from the PikPak server
    #[command(alias = "d")]
    Download(DownloadArgs),
}

#[derive(Args, Debug)]
struct DownloadArgs {
    /// Number of simultaneous downloads
    #[arg(short, long, default_value_t = 1)]
    count: usize,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Folder on the PikPak server to download from
    #[arg(short, long, default_value = "/")]
    path: String,

    /// Folder id to use instead of resolving --path
    #[arg(short = 'P', long)]
    parent_id: Option<String>,

    /// Files to download, relative to --path. Downloads the whole folder when empty
    files: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pikpak_dl={}", log_level)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let Command::Download(args) = cli.command;

    let client = match build_client(&cli.api_url, &cli.token) {
        Ok(client) => client,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_FATAL);
        }
    };
    if let Err(e) = client.authenticate().await {
        error!("Login failed: {}", e);
        return ExitCode::from(if e.is_auth() { EXIT_AUTH } else { EXIT_FATAL });
    }

    let config = DownloadConfig {
        concurrency: args.count,
        output: args.output,
        remote_path: args.path,
        parent_id: args.parent_id,
        ..DownloadConfig::default()
    };
    info!("Output directory: {:?}", config.output);

    let store = Arc::new(FsStore);
    let catalog = Arc::new(client);
    let result = if args.files.is_empty() {
        download_folder(catalog, store, &config).await
    } else {
        download_files(catalog, store, &config, &args.files).await
    };

    match result {
        Ok(summary) if summary.failed > 0 => {
            info!("{} files need attention, run again to retry them", summary.failed);
            ExitCode::SUCCESS
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Download aborted: {}", e);
            ExitCode::from(if e.is_auth() { EXIT_AUTH } else { EXIT_FATAL })
        }
    }
}

fn build_client(api_url: &str, token: &str) -> anyhow::Result<PikPakClient> {
    let config = ApiConfig {
        base_url: api_url.to_string(),
        access_token: token.to_string(),
        ..ApiConfig::default()
    };
    PikPakClient::new(config).with_context(|| format!("invalid API URL {:?}", api_url))
}
