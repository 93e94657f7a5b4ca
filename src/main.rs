use clap::Parser;
use log::{debug, error, info};

use sql_extract::cli::Cli;
use sql_extract::error::ConfigError;
use sql_extract::logging::init_logging;
use sql_extract::orchestrator::run_with_connection;
use sql_extract::util::envfile::{load_dotenv_if_present, write_env_template};

const EXIT_FAILURE: i32 = 1;
const EXIT_CONFIG: i32 = 2;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = load_dotenv_if_present() {
        eprintln!("Warning: could not load .env: {:#}", e);
    }
    init_logging();

    let cli = Cli::parse();
    if let Some(path) = &cli.env_template {
        match write_env_template(path) {
            Ok(()) => {
                println!(
                    "Wrote {}. Copy to .env and edit values as needed.",
                    path.display()
                );
                return;
            }
            Err(e) => {
                error!("{:#}", e);
                std::process::exit(EXIT_FAILURE);
            }
        }
    }

    let (db, cfg) = match cli.to_configs() {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };
    debug!("Database: {:?}", db);
    debug!("Run: {:?}", cfg);

    match run_with_connection(&db, &cfg).await {
        Ok(summary) => {
            info!("{}", summary.report_line());
            debug!(
                "Wrote {} column(s) to {} in {:.2?}",
                summary.columns.len(),
                summary.out_path.display(),
                summary.elapsed
            );
        }
        Err(e) => {
            error!("{:#}", e);
            debug!("{:?}", e);
            if e.downcast_ref::<ConfigError>().is_some() {
                std::process::exit(EXIT_CONFIG);
            }
            std::process::exit(EXIT_FAILURE);
        }
    }
}
