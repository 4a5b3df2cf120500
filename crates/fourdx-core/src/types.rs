use crate::error::FourdxError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Manager,
    Staff,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Manager => "MANAGER",
            Role::Staff => "STAFF",
        }
    }

    /// Admins and managers may run destructive team-level operations.
    pub fn is_privileged(self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = FourdxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "MANAGER" => Ok(Role::Manager),
            "STAFF" => Ok(Role::Staff),
            _ => Err(FourdxError::InvalidRole(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// CommitmentStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitmentStatus {
    #[default]
    Incomplete,
    Partial,
    Completed,
}

impl CommitmentStatus {
    pub fn all() -> &'static [CommitmentStatus] {
        &[
            CommitmentStatus::Incomplete,
            CommitmentStatus::Partial,
            CommitmentStatus::Completed,
        ]
    }

    /// Next status in the single-click ring:
    /// incomplete → completed → partial → incomplete.
    pub fn cycle(self) -> CommitmentStatus {
        match self {
            CommitmentStatus::Incomplete => CommitmentStatus::Completed,
            CommitmentStatus::Completed => CommitmentStatus::Partial,
            CommitmentStatus::Partial => CommitmentStatus::Incomplete,
        }
    }

    pub fn is_completed(self) -> bool {
        self == CommitmentStatus::Completed
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CommitmentStatus::Incomplete => "incomplete",
            CommitmentStatus::Partial => "partial",
            CommitmentStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for CommitmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CommitmentStatus {
    type Err = FourdxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "incomplete" => Ok(CommitmentStatus::Incomplete),
            "partial" => Ok(CommitmentStatus::Partial),
            "completed" => Ok(CommitmentStatus::Completed),
            _ => Err(FourdxError::InvalidStatus(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Scheduled,
    InProgress,
    Completed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Scheduled => "scheduled",
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
