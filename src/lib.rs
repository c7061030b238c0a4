pub mod command;
pub mod config;
pub mod csv_loader;
pub mod debounce;
pub mod landmarks;
pub mod orchestrator;
pub mod sink;
pub mod source;
pub mod stabilizer;
pub mod transport;
pub mod types;
