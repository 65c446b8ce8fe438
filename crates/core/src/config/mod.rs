//! Environment and file based configuration

mod env;
mod error;

pub use env::{env_flag, env_var, AppConfigTrait, ConfigSource};
pub use error::ConfigError;
