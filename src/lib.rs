//! # quoteboard lib

use std::env;

pub mod api;
pub mod config;
pub mod data;
pub mod display;
pub mod ds;
pub mod error;
pub mod utils;
pub mod web;

pub fn init() {
    env_logger::Builder::new()
        .parse_filters(env::var("LOG").as_deref().unwrap_or("info"))
        .init();
}
