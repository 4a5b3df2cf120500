use thiserror::Error;

/// Broad classification of a [`FourdxError`], used by callers to decide how
/// to surface or recover from a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input to a mutating operation. Never partially applied.
    Validation,
    /// The referenced record does not exist. Refresh, do not retry.
    NotFound,
    /// The actor's role does not allow the operation.
    Forbidden,
    /// A conditional write lost a race. Re-read and re-evaluate.
    Conflict,
    /// The persistence collaborator failed or is unreachable.
    Unavailable,
}

#[derive(Debug, Error)]
pub enum FourdxError {
    #[error("not initialized: run 'fourdx init'")]
    NotInitialized,

    #[error("invalid week id '{0}': expected YYYY-Www")]
    InvalidWeekId(String),

    #[error("commitment description must not be empty")]
    EmptyDescription,

    #[error("member '{member}' already has {limit} commitments for {week}")]
    CommitmentCapReached {
        member: String,
        week: String,
        limit: usize,
    },

    #[error("week {week} is in the past and can no longer be edited")]
    PastWeekLocked { week: String },

    #[error("invalid session transition from {from}: {reason}")]
    InvalidSessionTransition { from: String, reason: String },

    #[error("{0} requires explicit confirmation")]
    ConfirmationRequired(String),

    #[error("invalid role: {0}")]
    InvalidRole(String),

    #[error("invalid commitment status: {0}")]
    InvalidStatus(String),

    #[error("invalid agenda step: {0}")]
    InvalidStep(u8),

    #[error("invalid member: {0}")]
    InvalidMember(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("commitment not found: {0}")]
    CommitmentNotFound(String),

    #[error("member not found: {0}")]
    MemberNotFound(String),

    #[error("member already exists: {0}")]
    MemberExists(String),

    #[error("commitment template not found: {0}")]
    TemplateNotFound(String),

    #[error("no WIG session for week {0}")]
    SessionNotFound(String),

    #[error("{actor} is not allowed to {action}")]
    Forbidden { actor: String, action: String },

    #[error("concurrent update of {0}: state changed since it was read")]
    ConcurrencyConflict(String),

    #[error("store error: {0}")]
    Store(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl FourdxError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FourdxError::NotInitialized
            | FourdxError::InvalidWeekId(_)
            | FourdxError::EmptyDescription
            | FourdxError::CommitmentCapReached { .. }
            | FourdxError::PastWeekLocked { .. }
            | FourdxError::InvalidSessionTransition { .. }
            | FourdxError::ConfirmationRequired(_)
            | FourdxError::InvalidRole(_)
            | FourdxError::InvalidStatus(_)
            | FourdxError::InvalidStep(_)
            | FourdxError::InvalidMember(_)
            | FourdxError::InvalidConfig(_)
            | FourdxError::MemberExists(_) => ErrorKind::Validation,
            FourdxError::CommitmentNotFound(_)
            | FourdxError::MemberNotFound(_)
            | FourdxError::TemplateNotFound(_)
            | FourdxError::SessionNotFound(_) => ErrorKind::NotFound,
            FourdxError::Forbidden { .. } => ErrorKind::Forbidden,
            FourdxError::ConcurrencyConflict(_) => ErrorKind::Conflict,
            FourdxError::Store(_)
            | FourdxError::Io(_)
            | FourdxError::Yaml(_)
            | FourdxError::Json(_) => ErrorKind::Unavailable,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}

pub type Result<T> = std::result::Result<T, FourdxError>;
