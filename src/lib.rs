pub mod config;
pub mod demo;
pub mod display;
pub mod error;
pub mod parser;
pub mod schedule;
pub mod telemetry;
pub mod web;
