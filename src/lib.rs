pub mod adapters;
pub mod commands;
pub mod common;
pub mod entities;
pub mod events;
pub mod ingest;
pub mod models;
pub mod parser;
pub mod repositories;
pub mod settings;
pub mod usecases;
pub mod workers;
