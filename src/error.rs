pub type FramixResult<T> = Result<T, FramixError>;

#[derive(thiserror::Error, Debug)]
pub enum FramixError {
    #[error("generation service error: {0}")]
    Generation(String),

    #[error("image decode error: {0}")]
    Decode(String),

    #[error("unsupported action: {0}")]
    UnsupportedAction(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("evaluation error: {0}")]
    Evaluation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FramixError {
    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn unsupported_action(msg: impl Into<String>) -> Self {
        Self::UnsupportedAction(msg.into())
    }

    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            FramixError::generation("x")
                .to_string()
                .contains("generation service error:")
        );
        assert!(
            FramixError::decode("x")
                .to_string()
                .contains("image decode error:")
        );
        assert!(
            FramixError::unsupported_action("x")
                .to_string()
                .contains("unsupported action:")
        );
        assert!(
            FramixError::invalid_parameter("x")
                .to_string()
                .contains("invalid parameter:")
        );
        assert!(
            FramixError::evaluation("x")
                .to_string()
                .contains("evaluation error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = FramixError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
