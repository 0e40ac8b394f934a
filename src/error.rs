pub type ReelResult<T> = Result<T, ReelError>;

#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    #[error("validation error: {0}")]
    Validation(String),

    /// An image or audio asset failed to fetch or decode. The message names
    /// the asset so the caller can tell which page broke the export.
    #[error("asset error: {0}")]
    AssetLoad(String),

    #[error("asset timeout: {0}")]
    Timeout(String),

    #[error("mixing error: {0}")]
    Mixing(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("export canceled")]
    Canceled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn asset(msg: impl Into<String>) -> Self {
        Self::AssetLoad(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn mixing(msg: impl Into<String>) -> Self {
        Self::Mixing(msg.into())
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            ReelError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(ReelError::asset("x").to_string().contains("asset error:"));
        assert!(
            ReelError::timeout("x")
                .to_string()
                .contains("asset timeout:")
        );
        assert!(ReelError::mixing("x").to_string().contains("mixing error:"));
        assert!(
            ReelError::encoding("x")
                .to_string()
                .contains("encoding error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = ReelError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
