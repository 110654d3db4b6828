// src/infra/paths.rs — Config and output locations
//
// REVISER_HOME overrides everything. Without it, config lives in
// ~/.reviser/ and run transcripts in the platform data dir.

use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

fn reviser_home() -> Option<PathBuf> {
    std::env::var_os("REVISER_HOME").map(PathBuf::from)
}

/// Configuration directory: $REVISER_HOME/ or ~/.reviser/
pub fn config_dir() -> Option<PathBuf> {
    if let Some(home) = reviser_home() {
        return Some(home);
    }
    BaseDirs::new().map(|b| b.home_dir().join(".reviser"))
}

pub fn config_file_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Data directory: $REVISER_HOME/data/ or XDG_DATA_HOME/reviser
pub fn data_dir() -> Option<PathBuf> {
    if let Some(home) = reviser_home() {
        return Some(home.join("data"));
    }
    ProjectDirs::from("", "", "reviser").map(|p| p.data_local_dir().to_path_buf())
}

/// Default location for an exported run ledger.
pub fn runs_dir() -> Option<PathBuf> {
    data_dir().map(|d| d.join("runs"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_under_config_dir() {
        if let (Some(dir), Some(file)) = (config_dir(), config_file_path()) {
            assert!(file.starts_with(&dir));
            assert_eq!(file.file_name().unwrap(), "config.toml");
        }
    }

    #[test]
    fn test_runs_dir_under_data_dir() {
        if let (Some(data), Some(runs)) = (data_dir(), runs_dir()) {
            assert!(runs.starts_with(&data));
            assert!(runs.ends_with("runs"));
        }
    }
}
