use crate::config::WigConfig;
use crate::error::{FourdxError, Result};
use crate::store::Store;
use crate::types::Role;
use crate::week::{self, WeekId};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// The member on whose behalf an operation runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    /// Look the member up in the roster.
    pub fn resolve(store: &dyn Store, member_id: &str) -> Result<Self> {
        let member = store
            .get_member(member_id)?
            .ok_or_else(|| FourdxError::MemberNotFound(member_id.to_string()))?;
        Ok(Self::new(member.id, member.role))
    }
}

/// Everything an operation may touch: the store, the team configuration, the
/// acting member and the clock. Nothing in the core reads ambient state.
pub struct OpContext<'a> {
    pub store: &'a dyn Store,
    pub config: &'a WigConfig,
    pub actor: Option<Actor>,
    pub now: DateTime<Utc>,
}

impl<'a> OpContext<'a> {
    pub fn new(store: &'a dyn Store, config: &'a WigConfig, now: DateTime<Utc>) -> Self {
        Self {
            store,
            config,
            actor: None,
            now,
        }
    }

    pub fn with_actor(mut self, actor: Actor) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn current_week(&self) -> WeekId {
        week::current_week_id(self.now)
    }

    pub fn actor_id(&self) -> Option<&str> {
        self.actor.as_ref().map(|a| a.id.as_str())
    }

    /// The actor, provided it holds ADMIN or MANAGER.
    pub fn require_privileged(&self, action: &str) -> Result<&Actor> {
        match &self.actor {
            Some(a) if a.role.is_privileged() => Ok(a),
            Some(a) => Err(FourdxError::Forbidden {
                actor: a.id.clone(),
                action: action.to_string(),
            }),
            None => Err(FourdxError::Forbidden {
                actor: "anonymous".to_string(),
                action: action.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    #[test]
    fn current_week_follows_the_clock() {
        let store = MemoryStore::new();
        let cfg = WigConfig::default();
        let now = Utc.with_ymd_and_hms(2024, 12, 31, 12, 0, 0).unwrap();
        let ctx = OpContext::new(&store, &cfg, now);
        assert_eq!(ctx.current_week().to_string(), "2025-W01");
        assert!(ctx.actor_id().is_none());
    }

    #[test]
    fn privilege_check() {
        let store = MemoryStore::new();
        let cfg = WigConfig::default();
        let ctx = OpContext::new(&store, &cfg, Utc::now());
        assert!(matches!(
            ctx.require_privileged("reset"),
            Err(FourdxError::Forbidden { .. })
        ));

        let staff = OpContext::new(&store, &cfg, Utc::now()).with_actor(Actor::new("s", Role::Staff));
        assert!(staff.require_privileged("reset").is_err());

        let mgr =
            OpContext::new(&store, &cfg, Utc::now()).with_actor(Actor::new("m", Role::Manager));
        assert_eq!(mgr.require_privileged("reset").unwrap().id, "m");
    }
}
