// Shared infrastructure: configuration, document storage and logging.

pub mod config;
pub mod db;
pub mod logging;
