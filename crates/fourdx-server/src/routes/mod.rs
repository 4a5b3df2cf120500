pub mod commitments;
pub mod config;
pub mod dashboard;
pub mod events;
pub mod members;
pub mod sessions;
pub mod weeks;

use fourdx_core::context::OpContext;
use fourdx_core::week::WeekId;

/// Resolve a `{week}` path segment. `current` means the context's week.
pub(crate) fn resolve_week(ctx: &OpContext<'_>, raw: &str) -> fourdx_core::Result<WeekId> {
    if raw == "current" {
        return Ok(ctx.current_week());
    }
    raw.parse()
}
