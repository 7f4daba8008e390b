//! hydra-buddies: layered YAML configuration without a framework runtime.
//!
//! This module exports the core components for testing and integration.

pub mod cli;
pub mod config;
pub mod error;
pub mod keys;
pub mod logging;
pub mod reader;
pub mod scaffold;
pub mod variants;
pub mod version;
