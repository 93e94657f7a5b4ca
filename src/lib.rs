pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod logging;
pub mod orchestrator;
pub mod query;
pub mod util;
