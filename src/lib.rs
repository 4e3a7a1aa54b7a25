pub mod config;
pub mod monitoring;
pub mod notification;
pub mod shutdown;
pub mod utils;
