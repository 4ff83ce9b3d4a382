pub mod app;
pub mod audit;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod model;
pub mod permissions;
pub mod server;
pub mod utils;
pub mod ws;
