//! Gold Errors - canonical error taxonomy for the Search & Blame Engine
//!
//! Mirrors the `ExError`/`ExErrorKind` facility the rest of the teacher
//! workspace carries (structured kind + op/message/source context, a
//! stable `code()` for programmatic handling), scoped to the error
//! vocabulary the engine actually needs.

use gold_core_types::{RequestId, TraceId};

/// Result type alias using `GoldError`
pub type Result<T> = std::result::Result<T, GoldError>;

/// Canonical error kind taxonomy for the Search & Blame Engine.
///
/// See spec §7: `InvalidQuery`, `NotFound`, `PermissionDenied`, `Transient`,
/// `Internal` are the caller-visible kinds; `NotImplemented` covers the
/// `CountDigestsByTest` multi-value-filter restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoldErrorKind {
    /// Query compilation rejected the request (bad key/value, missing
    /// corpus, contradictory flags).
    InvalidQuery,
    /// A referenced entity (Changelist, diff pair, digest) does not exist.
    NotFound,
    /// The request resolves to data hidden by the public-view matcher.
    PermissionDenied,
    /// A storage round-trip failed in a way the caller may retry.
    Transient,
    /// A requested query shape is valid but not implemented by this surface.
    NotImplemented,
    /// An internal invariant was violated.
    Internal,
}

impl GoldErrorKind {
    /// Stable error code, suitable for programmatic handling or metrics.
    pub fn code(&self) -> &'static str {
        match self {
            GoldErrorKind::InvalidQuery => "ERR_INVALID_QUERY",
            GoldErrorKind::NotFound => "ERR_NOT_FOUND",
            GoldErrorKind::PermissionDenied => "ERR_PERMISSION_DENIED",
            GoldErrorKind::Transient => "ERR_TRANSIENT",
            GoldErrorKind::NotImplemented => "ERR_NOT_IMPLEMENTED",
            GoldErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type for the Search & Blame Engine.
#[derive(Debug, Clone)]
pub struct GoldError {
    kind: GoldErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    request_id: Option<RequestId>,
    trace_id: Option<TraceId>,
    message: String,
    source: Option<Box<GoldError>>,
}

impl GoldError {
    /// Create a new error with the specified kind.
    pub fn new(kind: GoldErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            request_id: None,
            trace_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Shorthand for `GoldError::new(InvalidQuery).with_message(..)`
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::new(GoldErrorKind::InvalidQuery).with_message(message)
    }

    /// Shorthand for `GoldError::new(NotFound).with_message(..)`
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(GoldErrorKind::NotFound).with_message(message)
    }

    /// Shorthand for `GoldError::new(PermissionDenied)`
    pub fn permission_denied() -> Self {
        Self::new(GoldErrorKind::PermissionDenied)
            .with_message("requested data is not visible to this caller")
    }

    /// Shorthand for `GoldError::new(Internal).with_message(..)`
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(GoldErrorKind::Internal).with_message(message)
    }

    /// Add operation context.
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity id context (the CL id, digest, grouping id, ...).
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add request id context.
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add trace id context.
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    /// Add a human-readable message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Chain a source error.
    pub fn with_source(mut self, source: GoldError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// The error kind.
    pub fn kind(&self) -> GoldErrorKind {
        self.kind
    }

    /// The stable error code.
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// The operation context, if any.
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// The entity id context, if any.
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The chained source error, if any.
    pub fn source_error(&self) -> Option<&GoldError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for GoldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        if let Some(source) = &self.source {
            write!(f, " caused by: {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for GoldError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

/// Map a `sqlx::Error` to a `GoldError`.
///
/// Pool exhaustion, connection failures, and I/O errors are `Transient`
/// (the caller may retry); `RowNotFound` is `NotFound`; anything else
/// (protocol/decode errors, which indicate a broken invariant between the
/// schema and the code reading it) is `Internal`.
impl From<sqlx::Error> for GoldError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => {
                GoldError::new(GoldErrorKind::NotFound).with_message(err.to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                GoldError::new(GoldErrorKind::Transient).with_message(err.to_string())
            }
            _ => GoldError::new(GoldErrorKind::Internal).with_message(err.to_string()),
        }
    }
}
