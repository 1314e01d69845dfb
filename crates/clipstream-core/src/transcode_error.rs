//! Transcode execution error types
//!
//! Errors inside the transcode worker indicate whether the failure is
//! retryable (the job returns to PENDING for a future claim) or terminal
//! (the job fails immediately without consuming further attempts).

use std::fmt;

/// Worker execution error carrying a retryability flag.
#[derive(Debug)]
pub struct TranscodeError {
    inner: anyhow::Error,
    retryable: bool,
}

impl TranscodeError {
    /// Terminal error: the job should not be retried.
    ///
    /// Use for failures that will not change on retry, such as missing
    /// provider credentials or a storage key that no longer exists.
    pub fn terminal(err: impl Into<anyhow::Error>) -> Self {
        Self {
            inner: err.into(),
            retryable: false,
        }
    }

    /// Retryable error: the job returns to PENDING if attempts remain.
    ///
    /// Use for provider timeouts, a not-yet-ready details response, and
    /// transient network failures.
    pub fn retryable(err: impl Into<anyhow::Error>) -> Self {
        Self {
            inner: err.into(),
            retryable: true,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    pub fn inner(&self) -> &anyhow::Error {
        &self.inner
    }

    pub fn into_inner(self) -> anyhow::Error {
        self.inner
    }
}

impl fmt::Display for TranscodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl std::error::Error for TranscodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

impl From<anyhow::Error> for TranscodeError {
    /// Unclassified errors default to retryable; the attempt counter bounds
    /// the damage either way.
    fn from(err: anyhow::Error) -> Self {
        Self::retryable(err)
    }
}

/// Extension trait for Result to mark errors terminal.
pub trait TranscodeResultExt<T> {
    fn terminal(self) -> Result<T, TranscodeError>;
}

impl<T, E: Into<anyhow::Error>> TranscodeResultExt<T> for Result<T, E> {
    fn terminal(self) -> Result<T, TranscodeError> {
        self.map_err(|e| TranscodeError::terminal(e.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_error() {
        let err = TranscodeError::terminal(anyhow::anyhow!("Missing API token"));
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("Missing API token"));
    }

    #[test]
    fn retryable_error() {
        let err = TranscodeError::retryable(anyhow::anyhow!("Provider timeout"));
        assert!(err.is_retryable());
    }

    #[test]
    fn from_anyhow_defaults_to_retryable() {
        let err: TranscodeError = anyhow::anyhow!("some error").into();
        assert!(err.is_retryable());
    }

    #[test]
    fn result_ext_marks_terminal() {
        let result: Result<(), anyhow::Error> = Err(anyhow::anyhow!("bad config"));
        let err = result.terminal().unwrap_err();
        assert!(!err.is_retryable());
    }
}
