use clap::Parser;
use task_organizer_api::cli::{self, utils::output_error, Cli, OutputFormat};
use task_organizer_api::config::AppConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load .env if present so DB_* and JWT_SECRET can live next to the binary.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let output_format = OutputFormat::from_cli(&cli);

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            output_error(output_format, &e.to_string());
            std::process::exit(1);
        }
    };

    if let Err(e) = cli::run(cli, config).await {
        match std::env::var("CLI_VERBOSE").as_deref() {
            Ok("true") | Ok("1") => output_error(output_format, &format!("{e:?}")),
            _ => output_error(output_format, &e.to_string()),
        }
        std::process::exit(1);
    }
}
