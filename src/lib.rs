pub mod analysis;
pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod inference;
pub mod integrity;
pub mod memory;
pub mod recommend;
pub mod scans;
pub mod state;
