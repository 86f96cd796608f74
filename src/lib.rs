pub mod app;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod humanize;
pub mod observability;
pub mod router;
pub mod server;
pub mod telegram;
