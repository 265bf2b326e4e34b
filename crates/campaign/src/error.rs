//! Campaign construction errors

use coc_foundation::ValueError;
use coc_schema::SchemaError;
use thiserror::Error;

/// Result type for campaign operations.
pub type CampaignResult<T> = Result<T, CampaignError>;

/// Errors raised while building, validating or writing a campaign.
///
/// Context wrappers ([`CampaignError::InEvent`], [`CampaignError::InBuilder`])
/// carry the event and builder that failed; [`CampaignError::kind`] sees
/// through them.
#[derive(Debug, Error)]
pub enum CampaignError {
    /// A record violates the engine schema.
    #[error("schema violation: {0}")]
    Schema(#[from] SchemaError),

    /// A consumed signal has no producer, or a state gate is incomplete.
    #[error("wiring error: {0}")]
    Wiring(String),

    /// A property filter starts before the event that sets the property.
    #[error("ordering error: {0}")]
    Ordering(String),

    /// Invalid parameters passed to a builder.
    #[error("argument error: {0}")]
    Argument(String),

    /// The capability exists in the interface but has no implementation.
    #[error("unimplemented: {0}")]
    Unimplemented(&'static str),

    /// A property restriction names a property the demographics never declare.
    #[error("dangling property restriction: {0}")]
    DanglingRestriction(String),

    /// Failed to write the campaign artifact.
    #[error("failed to write campaign: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize the campaign artifact.
    #[error("failed to serialize campaign: {0}")]
    Json(#[from] serde_json::Error),

    #[error("in event '{event}': {source}")]
    InEvent {
        event: String,
        source: Box<CampaignError>,
    },

    #[error("in {builder}: {source}")]
    InBuilder {
        builder: &'static str,
        source: Box<CampaignError>,
    },
}

/// Error category, independent of context wrappers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Schema,
    Wiring,
    Ordering,
    Argument,
    Unimplemented,
    DanglingRestriction,
    Io,
}

impl CampaignError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CampaignError::Schema(_) => ErrorKind::Schema,
            CampaignError::Wiring(_) => ErrorKind::Wiring,
            CampaignError::Ordering(_) => ErrorKind::Ordering,
            CampaignError::Argument(_) => ErrorKind::Argument,
            CampaignError::Unimplemented(_) => ErrorKind::Unimplemented,
            CampaignError::DanglingRestriction(_) => ErrorKind::DanglingRestriction,
            CampaignError::Io(_) | CampaignError::Json(_) => ErrorKind::Io,
            CampaignError::InEvent { source, .. } | CampaignError::InBuilder { source, .. } => {
                source.kind()
            }
        }
    }

    /// Name of the innermost event this error occurred in, if any.
    pub fn event(&self) -> Option<&str> {
        match self {
            CampaignError::InEvent { event, source } => source.event().or(Some(event.as_str())),
            CampaignError::InBuilder { source, .. } => source.event(),
            _ => None,
        }
    }

    /// Name of the outermost builder this error occurred in, if any.
    pub fn builder(&self) -> Option<&'static str> {
        match self {
            CampaignError::InBuilder { builder, .. } => Some(*builder),
            CampaignError::InEvent { source, .. } => source.builder(),
            _ => None,
        }
    }

    pub fn argument(message: impl Into<String>) -> Self {
        CampaignError::Argument(message.into())
    }
}

impl From<ValueError> for CampaignError {
    fn from(err: ValueError) -> Self {
        CampaignError::Argument(err.to_string())
    }
}

/// Attach event or builder context to a result.
pub trait ResultExt<T> {
    fn in_event(self, event: &str) -> CampaignResult<T>;
    fn in_builder(self, builder: &'static str) -> CampaignResult<T>;
}

impl<T, E: Into<CampaignError>> ResultExt<T> for Result<T, E> {
    fn in_event(self, event: &str) -> CampaignResult<T> {
        self.map_err(|e| CampaignError::InEvent {
            event: event.to_string(),
            source: Box::new(e.into()),
        })
    }

    fn in_builder(self, builder: &'static str) -> CampaignResult<T> {
        self.map_err(|e| CampaignError::InBuilder {
            builder,
            source: Box::new(e.into()),
        })
    }
}
