pub mod config;
pub mod google;
pub mod progress;
