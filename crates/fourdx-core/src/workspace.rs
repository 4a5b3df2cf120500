//! A team workspace on disk: `.fourdx/config.yaml` plus `.fourdx/fourdx.db`.

use crate::config::{ConfigPatch, WigConfig};
use crate::context::OpContext;
use crate::error::{FourdxError, Result};
use crate::io;
use crate::paths;
use crate::store::{RedbStore, Store};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::info;

pub struct Workspace {
    pub root: PathBuf,
    pub config: WigConfig,
    pub store: RedbStore,
}

/// What `init` did. Re-running init on a workspace is harmless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitReport {
    pub config_created: bool,
    pub config_path: PathBuf,
    pub db_path: PathBuf,
}

/// Create `.fourdx/`, seed the config with the default measures (unless one
/// exists) and create the database tables.
pub fn init(root: &Path, title: Option<&str>) -> Result<InitReport> {
    io::ensure_dir(&paths::fourdx_dir(root))?;
    let config_path = paths::config_path(root);
    let config_created = !config_path.exists();
    if config_created {
        let cfg = match title {
            Some(t) => WigConfig::new(t),
            None => WigConfig::default(),
        };
        cfg.save(root)?;
        info!(path = %config_path.display(), "wrote team config");
    }
    let db_path = paths::db_path(root);
    RedbStore::open(&db_path)?;
    Ok(InitReport {
        config_created,
        config_path,
        db_path,
    })
}

/// Merge `patch` into the team config carried by `ctx` and save it under
/// `root`. ADMIN or MANAGER only. Returns the config now on disk.
pub fn update_config(root: &Path, ctx: &OpContext<'_>, patch: &ConfigPatch) -> Result<WigConfig> {
    let actor = ctx.require_privileged("edit the team configuration")?;
    let next = ctx.config.patched(patch)?;
    next.save(root)?;
    info!(
        actor = %actor.id,
        current = next.current_value,
        target = next.target_value,
        measures = next.lead_measures.len(),
        "team config updated"
    );
    Ok(next)
}

impl Workspace {
    pub fn open(root: &Path) -> Result<Self> {
        if !paths::is_initialized(root) {
            return Err(FourdxError::NotInitialized);
        }
        let config = WigConfig::load(root)?;
        let store = RedbStore::open(&paths::db_path(root))?;
        Ok(Self {
            root: root.to_path_buf(),
            config,
            store,
        })
    }

    pub fn ctx(&self, now: DateTime<Utc>) -> OpContext<'_> {
        OpContext::new(&self.store as &dyn Store, &self.config, now)
    }
}
