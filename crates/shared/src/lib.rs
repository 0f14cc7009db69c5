pub mod backend;
pub mod chat;
pub mod config;
mod config_env;
pub mod extract;
pub mod models;
pub mod tools;
