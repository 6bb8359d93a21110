pub mod accounts;
pub mod app;
pub mod config;
pub mod error;
pub mod mail;
pub mod state;
