use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const FOURDX_DIR: &str = ".fourdx";
pub const CONFIG_FILE: &str = ".fourdx/config.yaml";
pub const DB_FILE: &str = ".fourdx/fourdx.db";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn fourdx_dir(root: &Path) -> PathBuf {
    root.join(FOURDX_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn db_path(root: &Path) -> PathBuf {
    root.join(DB_FILE)
}

pub fn is_initialized(root: &Path) -> bool {
    config_path(root).exists()
}
