//! Core domain types and logic.

pub mod config_validation;
pub mod distribution;
pub mod equitable;
pub mod error;
pub mod execution;
pub mod indicator;
pub mod market;
pub mod metrics;
pub mod ohlcv;
pub mod orchestrator;
pub mod pipeline;
pub mod recommendation;
pub mod scored;
pub mod scoring;
pub mod signals;
pub mod universe;
