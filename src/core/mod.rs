pub mod cache;
pub mod config;
pub mod dedup;
pub mod enricher;
pub mod error;
pub mod models;
