#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod engine;
pub mod error;
pub mod feed;
pub mod payload;
#[cfg(not(target_arch = "wasm32"))]
pub mod telemetry;
pub mod types;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub type Result<T> = std::result::Result<T, error::Error>;
