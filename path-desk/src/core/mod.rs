//! Core desk infrastructure: configuration

pub mod config;

pub use config::DeskConfig;
