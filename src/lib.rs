pub mod api;
pub mod config;
pub mod controller;
pub mod database;
pub mod domain;
pub mod engine;
pub mod ml;
pub mod repo;
pub mod telemetry;
pub mod weather;
