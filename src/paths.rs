//! Where geochat keeps its config file and logs.
//!
//! Debug builds and `cargo run` use the working directory. Installed builds
//! use `dirs::config_dir()/geochat` for `config.json` and
//! `dirs::data_dir()/geochat/logs` for logs.

use std::path::PathBuf;

const APP_DIR: &str = "geochat";

/// Running from a checkout rather than an installed build
fn is_dev_mode() -> bool {
    std::env::var("CARGO").is_ok() || cfg!(debug_assertions)
}

/// Directory under a platform base dir, or the working directory in dev mode
fn app_dir(base: Option<PathBuf>) -> PathBuf {
    if is_dev_mode() {
        return PathBuf::from(".");
    }
    base.map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn config_file() -> PathBuf {
    app_dir(dirs::config_dir()).join("config.json")
}

pub fn logs_dir() -> PathBuf {
    app_dir(dirs::data_dir()).join("logs")
}

/// Create the config and log directories if they are missing
pub fn ensure_directories() -> std::io::Result<()> {
    if let Some(config_dir) = config_file().parent() {
        std::fs::create_dir_all(config_dir)?;
    }
    std::fs::create_dir_all(logs_dir())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dev_mode_uses_working_directory() {
        assert!(is_dev_mode());
        assert_eq!(config_file(), PathBuf::from("./config.json"));
        assert_eq!(logs_dir(), PathBuf::from("./logs"));
    }

    #[test]
    fn test_app_dir_ignores_base_in_dev_mode() {
        assert_eq!(app_dir(Some(PathBuf::from("/somewhere"))), PathBuf::from("."));
        assert_eq!(app_dir(None), PathBuf::from("."));
    }
}
