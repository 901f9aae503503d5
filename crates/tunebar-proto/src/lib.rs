pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod platform;
pub mod scrobbler;
pub mod service;
