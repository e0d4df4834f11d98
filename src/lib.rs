// lib.rs
pub mod bridge;
pub mod config;
pub mod control;
pub mod docs;
pub mod error;
pub mod events;
pub mod gate;
pub mod gateway;
pub mod handlers;
pub mod metrics;
pub mod midi;
pub mod models;
pub mod show;
pub mod utils;

#[cfg(test)]
mod testing;
