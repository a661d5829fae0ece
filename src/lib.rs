pub mod app;
pub mod config;
pub mod pipeline;
pub mod process;
pub mod shared;
pub mod workspace;
