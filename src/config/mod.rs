//! Configuration module for pwdist
//!
//! This module handles:
//! - Model build settings (`pwdist.toml`)
//! - Defaults for the standard eight-country run

mod model_config;

pub use model_config::{
    load_model_config, validate_country, ModelConfig, CONFIG_FILENAME, CONFIG_TEMPLATE, DEFAULT_COUNTRIES,
};
