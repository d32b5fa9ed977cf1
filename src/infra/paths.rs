// src/infra/paths.rs — Config and data locations
//
// All paths respect the CODECRAFT_HOME environment variable for isolation.
// When CODECRAFT_HOME is set, config and data live under that directory.
// When unset, config uses ~/.codecraft/ and data uses XDG_DATA_HOME/codecraft.

use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;
use std::sync::OnceLock;

static PROJECT_DIRS: OnceLock<Option<ProjectDirs>> = OnceLock::new();

fn project_dirs() -> Option<&'static ProjectDirs> {
    PROJECT_DIRS
        .get_or_init(|| ProjectDirs::from("", "", "codecraft"))
        .as_ref()
}

/// Returns the CODECRAFT_HOME override, if set.
fn codecraft_home() -> Option<PathBuf> {
    std::env::var_os("CODECRAFT_HOME").map(PathBuf::from)
}

/// Home directory, or the working directory when no home can be determined.
pub fn dirs_home() -> PathBuf {
    BaseDirs::new()
        .map(|b| b.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Configuration directory: $CODECRAFT_HOME/ or ~/.codecraft/
pub fn config_dir() -> PathBuf {
    if let Some(home) = codecraft_home() {
        return home;
    }
    dirs_home().join(".codecraft")
}

/// Data directory: $CODECRAFT_HOME/data/ or ~/.local/share/codecraft/
pub fn data_dir() -> PathBuf {
    if let Some(home) = codecraft_home() {
        return home.join("data");
    }
    match project_dirs() {
        Some(dirs) => dirs.data_local_dir().to_path_buf(),
        None => config_dir().join("data"),
    }
}

/// Artifact database path
pub fn db_path() -> PathBuf {
    data_dir().join("codecraft.db")
}

/// Config file path
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}
