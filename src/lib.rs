// This file exposes the modules as public modules in the crate

pub mod board;
pub mod clock;
pub mod config;
pub mod driver;
pub mod error;
pub mod export;
pub mod handlers;
pub mod logging;
pub mod models;
pub mod outreach;
pub mod progress_stream;
pub mod projector;
pub mod research;
pub mod scripts;
pub mod studio;
pub mod terminal;
pub mod tokenizer;
pub mod wizard;
