//! Errors - エラー型と分類
//!
//! Every fallible operation in the crate returns [`ArchiveError`]. The
//! [`ErrorKind`] classification tells the caller whether handing the message
//! back to the transport for redelivery is worthwhile.

use thiserror::Error;

/// ErrorKind は実行エラーの分類
///
/// - Transient: 一時的なエラー（リトライ推奨）
/// - Permanent: 恒久的なエラー（リトライ無意味）
/// - Infrastructure: 依存サービスの障害（storage / queue / recognition）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Permanent,
    Infrastructure,
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("feature '{0}' is not part of this envelope")]
    UnknownFeature(String),

    #[error("feature '{0}' has already completed")]
    FeatureAlreadyCompleted(String),

    #[error("feature '{0}' appears more than once")]
    DuplicateFeature(String),

    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),

    /// A conditional write lost against a concurrent writer.
    #[error("write conflict on {resource}: expected version {expected:?}, found {actual:?}")]
    WriteConflict {
        resource: String,
        expected: Option<u64>,
        actual: Option<u64>,
    },

    #[error("{service} unavailable: {message}")]
    UpstreamUnavailable { service: String, message: String },

    #[error("tag limit exceeded: {0}")]
    TagLimitExceeded(String),

    #[error("json codec: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ArchiveError {
    pub fn upstream(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ArchiveError::WriteConflict { .. } => ErrorKind::Transient,
            ArchiveError::UpstreamUnavailable { .. } => ErrorKind::Infrastructure,
            ArchiveError::UnknownFeature(_)
            | ArchiveError::FeatureAlreadyCompleted(_)
            | ArchiveError::DuplicateFeature(_)
            | ArchiveError::InvalidEnvelope(_)
            | ArchiveError::TagLimitExceeded(_)
            | ArchiveError::Codec(_)
            | ArchiveError::InvalidRequest(_) => ErrorKind::Permanent,
        }
    }

    /// Whether redelivering the same message could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Permanent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::conflict(
        ArchiveError::WriteConflict { resource: "tags".into(), expected: Some(1), actual: Some(2) },
        ErrorKind::Transient
    )]
    #[case::upstream(ArchiveError::upstream("s3", "timeout"), ErrorKind::Infrastructure)]
    #[case::unknown(ArchiveError::UnknownFeature("hash".into()), ErrorKind::Permanent)]
    #[case::invalid(ArchiveError::InvalidEnvelope("bad".into()), ErrorKind::Permanent)]
    fn errors_are_classified(#[case] err: ArchiveError, #[case] kind: ErrorKind) {
        assert_eq!(err.kind(), kind);
        assert_eq!(err.is_retryable(), kind != ErrorKind::Permanent);
    }

    #[test]
    fn upstream_message_names_the_service() {
        let err = ArchiveError::upstream("rekognition", "throttled");
        assert_eq!(err.to_string(), "rekognition unavailable: throttled");
    }
}
