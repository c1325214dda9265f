pub mod aggregate;
pub mod api;
pub mod config;
pub mod detector;
pub mod driver;
pub mod error;
pub mod scoring;
pub mod state;
pub mod tracking;
