#[cfg(feature = "cli")]
pub mod cli;
pub mod storage;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::{CliConfig, ReportFormat};
pub use storage::LocalStorage;
pub use toml_config::TomlConfig;
