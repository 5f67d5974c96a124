pub mod api;
pub mod config;
pub mod location;
pub mod runner;
pub mod store;
