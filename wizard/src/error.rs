use thiserror::Error;

/// Stable error taxonomy, spec §6-7: every variant maps one-to-one onto a
/// wire-level error code a transport layer renders, independent of this
/// crate's internals.
#[derive(Debug, Error)]
pub enum WizardError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: i64 },

    #[error("stale candidates for items: {item_ids:?}")]
    Stale { item_ids: Vec<uuid::Uuid> },

    #[error("session expired")]
    Expired,

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<catalog::CatalogError> for WizardError {
    fn from(e: catalog::CatalogError) -> Self {
        match e {
            catalog::CatalogError::NotFound => WizardError::NotFound("offer".into()),
            other => WizardError::Internal(other.into()),
        }
    }
}

impl From<wizard_session::store::SessionStoreError> for WizardError {
    fn from(e: wizard_session::store::SessionStoreError) -> Self {
        use wizard_session::store::SessionStoreError;
        match e {
            SessionStoreError::NotFound => WizardError::NotFound("session".into()),
            SessionStoreError::VersionConflict => WizardError::Conflict("session version conflict".into()),
            SessionStoreError::Backend(err) => WizardError::Internal(err),
        }
    }
}

impl From<wizard_session::listlock::ListLockError> for WizardError {
    fn from(e: wizard_session::listlock::ListLockError) -> Self {
        use wizard_session::listlock::ListLockError;
        match e {
            ListLockError::AlreadyLocked => WizardError::Conflict("list is locked".into()),
            ListLockError::NotOwner => WizardError::Forbidden("session does not own list lock".into()),
            ListLockError::Backend(err) => WizardError::Internal(err),
        }
    }
}

impl From<wizard_session::ratelimit::RateLimitError> for WizardError {
    fn from(e: wizard_session::ratelimit::RateLimitError) -> Self {
        use wizard_session::ratelimit::RateLimitError;
        match e {
            RateLimitError::Exceeded { retry_after_secs } => WizardError::RateLimited { retry_after_secs },
            RateLimitError::Backend(err) => WizardError::Internal(err),
        }
    }
}

impl From<suggestion::SuggestionError> for WizardError {
    fn from(e: suggestion::SuggestionError) -> Self {
        WizardError::Internal(e.into())
    }
}
