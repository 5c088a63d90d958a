mod app_config;
mod config;
pub mod filter;
pub mod shop;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env, MAX_PAGE_SIZE};
pub use filter::FilterSelection;
pub use shop::{ShopRow, CSV_COLUMNS, UNKNOWN};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
