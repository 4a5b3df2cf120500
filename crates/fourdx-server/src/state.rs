use crate::error::AppError;
use axum::http::HeaderMap;
use chrono::Utc;
use fourdx_core::config::WigConfig;
use fourdx_core::context::{Actor, OpContext};
use fourdx_core::error::FourdxError;
use fourdx_core::store::{ChangeEvent, Store};
use fourdx_core::workspace::Workspace;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

/// Header naming the member on whose behalf a request runs.
pub const MEMBER_HEADER: &str = "x-member-id";

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub root: PathBuf,
    pub workspace: Arc<Workspace>,
    /// The team config requests run against. Replaced wholesale on edit.
    pub config: Arc<RwLock<Arc<WigConfig>>>,
    pub event_tx: broadcast::Sender<ChangeEvent>,
}

impl AppState {
    /// Open the workspace at `root` and bridge its change feed onto a
    /// broadcast channel for SSE subscribers.
    pub fn open(root: PathBuf) -> anyhow::Result<Self> {
        let workspace = Workspace::open(&root)?;
        let (tx, _) = broadcast::channel(64);
        let feed_tx = tx.clone();
        workspace.store.feed().subscribe(move |event| {
            // No subscribers is fine.
            let _ = feed_tx.send(event.clone());
        });
        let config = Arc::new(RwLock::new(Arc::new(workspace.config.clone())));
        Ok(Self {
            root,
            workspace: Arc::new(workspace),
            config,
            event_tx: tx,
        })
    }

    /// Snapshot of the current team config.
    pub fn config(&self) -> Arc<WigConfig> {
        let cfg = self
            .config
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&*cfg)
    }

    pub fn set_config(&self, next: WigConfig) {
        let mut cfg = self
            .config
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *cfg = Arc::new(next);
    }

    /// Run a core operation on the blocking pool with a fresh context for the
    /// acting member named in `headers`.
    pub async fn run<T, F>(&self, headers: &HeaderMap, f: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(&OpContext<'_>) -> fourdx_core::Result<T> + Send + 'static,
    {
        let workspace = Arc::clone(&self.workspace);
        let config = self.config();
        let actor = actor_id(headers);
        let result = tokio::task::spawn_blocking(move || {
            let mut ctx = OpContext::new(&workspace.store as &dyn Store, &config, Utc::now());
            if let Some(id) = actor {
                let actor = match Actor::resolve(ctx.store, &id) {
                    Ok(a) => a,
                    Err(FourdxError::MemberNotFound(_)) => {
                        return Err(FourdxError::Forbidden {
                            actor: id,
                            action: "act as an unknown member".to_string(),
                        })
                    }
                    Err(e) => return Err(e),
                };
                ctx = ctx.with_actor(actor);
            }
            f(&ctx)
        })
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
        Ok(result)
    }
}

pub fn actor_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(MEMBER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn open_requires_initialized_workspace() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(AppState::open(dir.path().to_path_buf()).is_err());
    }

    #[test]
    fn actor_header_is_trimmed() {
        let mut headers = HeaderMap::new();
        assert_eq!(actor_id(&headers), None);
        headers.insert(MEMBER_HEADER, HeaderValue::from_static(" m1 "));
        assert_eq!(actor_id(&headers).as_deref(), Some("m1"));
        headers.insert(MEMBER_HEADER, HeaderValue::from_static(""));
        assert_eq!(actor_id(&headers), None);
    }
}
