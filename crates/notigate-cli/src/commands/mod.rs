pub mod best_time;
pub mod config;
pub mod engine;
pub mod limits;
pub mod quiet;
pub mod replay;
pub mod send;
pub mod status;
