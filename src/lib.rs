pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod metrics;
pub mod models;
pub mod optimizer;
pub mod output;
pub mod pool;
pub mod state;
pub mod variates;
