pub mod config;
pub mod dictionary;
pub mod error;
pub mod game;
pub mod models;
pub mod session;
pub mod transport;
pub mod utils;
