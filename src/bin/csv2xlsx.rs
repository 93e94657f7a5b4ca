use clap::Parser;
use log::{debug, error};

use sql_extract::cli::ConvertCli;
use sql_extract::logging::init_logging;
use sql_extract::orchestrator::run_convert;
use sql_extract::util::envfile::load_dotenv_if_present;

fn main() {
    if let Err(e) = load_dotenv_if_present() {
        eprintln!("Warning: could not load .env: {:#}", e);
    }
    init_logging();

    let cli = ConvertCli::parse();
    let output = cli.output_path();
    if let Err(e) = run_convert(&cli.filename, &output) {
        error!("{:#}", e);
        debug!("{:?}", e);
        std::process::exit(1);
    }
}
