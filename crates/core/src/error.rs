use thiserror::Error;

/// Recoverable failures reported by the correlation pipeline.
///
/// Every variant carries a message meant to be shown to the end user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorrelError {
    #[error("{0}")]
    InvalidParameter(String),

    #[error("{0}")]
    InsufficientData(String),

    #[error("{0}")]
    DataUnavailable(String),

    #[error("{0}")]
    MissingDependency(String),
}

pub type CorrelResult<T> = Result<T, CorrelError>;

impl CorrelError {
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub fn insufficient_data(msg: impl Into<String>) -> Self {
        Self::InsufficientData(msg.into())
    }

    pub fn data_unavailable(msg: impl Into<String>) -> Self {
        Self::DataUnavailable(msg.into())
    }

    pub fn missing_dependency(msg: impl Into<String>) -> Self {
        Self::MissingDependency(msg.into())
    }

    /// Stable tag used in JSON error bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidParameter(_) => "invalid_parameter",
            Self::InsufficientData(_) => "insufficient_data",
            Self::DataUnavailable(_) => "data_unavailable",
            Self::MissingDependency(_) => "missing_dependency",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::InvalidParameter(m)
            | Self::InsufficientData(m)
            | Self::DataUnavailable(m)
            | Self::MissingDependency(m) => m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_message_verbatim() {
        let err = CorrelError::insufficient_data("not enough overlapping observations");
        assert_eq!(err.to_string(), "not enough overlapping observations");
        assert_eq!(err.kind(), "insufficient_data");
        assert_eq!(err.message(), "not enough overlapping observations");
    }

    #[test]
    fn kinds_are_distinct() {
        let kinds = [
            CorrelError::invalid_parameter("a").kind(),
            CorrelError::insufficient_data("b").kind(),
            CorrelError::data_unavailable("c").kind(),
            CorrelError::missing_dependency("d").kind(),
        ];
        for (i, a) in kinds.iter().enumerate() {
            for b in &kinds[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
