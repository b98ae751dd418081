pub mod backoff;
pub mod config;
pub mod matching;
pub mod models;
pub mod repositories;
pub mod services;
