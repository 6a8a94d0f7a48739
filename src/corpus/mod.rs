pub mod anomaly;
pub mod audit;
pub mod catalog;
pub mod config;
pub mod file_scanner;
pub mod index;
pub mod log_parser;
pub mod paths;
pub mod reconcile;
pub mod record;
pub mod report;
pub mod search;
pub mod util;
