//! Error taxonomy shared across the engine.
//!
//! Every fallible operation in this workspace returns [`TutorError`]. Each
//! variant maps to a stable machine-readable code and an HTTP-style status
//! so callers (the CLI today, a web frontend tomorrow) can translate
//! failures uniformly. Sensitive detail stays out of the variant messages;
//! operators get the specifics through `tracing` at the failure site.

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, TutorError>;

/// The failure vocabulary of the engine.
#[derive(Debug, thiserror::Error)]
pub enum TutorError {
    /// The request itself is malformed: missing question, empty file name,
    /// zero-byte upload, invalid parameter.
    #[error("{0}")]
    Validation(String),

    /// The caller's token is missing, malformed, or failed verification.
    #[error("{0}")]
    Auth(String),

    /// A uniqueness rule at the document level was violated, e.g. the
    /// owner already has a document with this name.
    #[error("{0}")]
    Conflict(String),

    /// An index record with this id already exists. Distinct from
    /// [`TutorError::Conflict`] so ingestion can treat re-adding the same
    /// chunk as idempotent rather than fatal.
    #[error("duplicate record: {0}")]
    DuplicateRecord(String),

    /// The uploaded file could not be parsed as its claimed format.
    #[error("{0}")]
    Unparsable(String),

    /// Extraction succeeded but produced no usable text.
    #[error("document contains no extractable text")]
    EmptyDocument,

    /// The referenced document, module, or retrieval result does not
    /// exist for this caller.
    #[error("{0}")]
    NotFound(String),

    /// An upstream dependency (embedding provider, generation provider,
    /// storage backend) failed after retries.
    #[error("{0}")]
    Upstream(String),
}

impl TutorError {
    /// HTTP-style status for this failure.
    pub fn http_status(&self) -> u16 {
        match self {
            TutorError::Validation(_) => 400,
            TutorError::Auth(_) => 401,
            TutorError::NotFound(_) => 404,
            TutorError::Conflict(_) | TutorError::DuplicateRecord(_) => 409,
            TutorError::Unparsable(_) | TutorError::EmptyDocument => 422,
            TutorError::Upstream(_) => 500,
        }
    }

    /// Stable machine-readable code for this failure.
    pub fn code(&self) -> &'static str {
        match self {
            TutorError::Validation(_) => "validation_error",
            TutorError::Auth(_) => "auth_error",
            TutorError::Conflict(_) => "conflict",
            TutorError::DuplicateRecord(_) => "duplicate_record",
            TutorError::Unparsable(_) => "unparsable_document",
            TutorError::EmptyDocument => "empty_document",
            TutorError::NotFound(_) => "not_found",
            TutorError::Upstream(_) => "upstream_failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(TutorError::Validation("bad".into()).http_status(), 400);
        assert_eq!(TutorError::Auth("no token".into()).http_status(), 401);
        assert_eq!(TutorError::NotFound("gone".into()).http_status(), 404);
        assert_eq!(TutorError::Conflict("name taken".into()).http_status(), 409);
        assert_eq!(TutorError::DuplicateRecord("abc_1".into()).http_status(), 409);
        assert_eq!(TutorError::Unparsable("not a pdf".into()).http_status(), 422);
        assert_eq!(TutorError::EmptyDocument.http_status(), 422);
        assert_eq!(TutorError::Upstream("embed failed".into()).http_status(), 500);
    }

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            TutorError::Validation(String::new()),
            TutorError::Auth(String::new()),
            TutorError::Conflict(String::new()),
            TutorError::DuplicateRecord(String::new()),
            TutorError::Unparsable(String::new()),
            TutorError::EmptyDocument,
            TutorError::NotFound(String::new()),
            TutorError::Upstream(String::new()),
        ];
        let mut codes: Vec<&str> = errors.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_duplicate_record_message_names_the_record() {
        let err = TutorError::DuplicateRecord("doc-1_3".into());
        assert_eq!(err.to_string(), "duplicate record: doc-1_3");
    }
}
