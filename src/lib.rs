pub mod config;
pub mod doorbell;
pub mod gpio;
pub mod mqtt;
