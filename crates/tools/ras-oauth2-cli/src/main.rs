use clap::Parser;
use ras_oauth2_cli::cli::Args;
use ras_oauth2_cli::config::CliConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let config = CliConfig::load(args.config.as_deref())?;

    // Initialize tracing; RUST_LOG overrides the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!(
        provider = %config.provider,
        token_file = %config.token_file.display(),
        "Configuration loaded"
    );

    match args.execute(&config).await {
        Ok(output) => {
            println!("{output}");
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Error: {e:#}");
            std::process::exit(1);
        }
    }
}
