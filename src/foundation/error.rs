/// Convenience result type used across kenburns.
pub type KenBurnsResult<T> = Result<T, KenBurnsError>;

/// Top-level error taxonomy used by pipeline and delivery APIs.
#[derive(thiserror::Error, Debug)]
pub enum KenBurnsError {
    /// Malformed request parameters. Raised before any pipeline work starts.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Unrecognized animation identifier.
    #[error("invalid animation kind: {0}")]
    InvalidAnimationKind(String),

    /// Source image is unreadable or corrupt.
    #[error("image decode error: {0}")]
    ImageDecode(String),

    /// The encoding sink rejected input or failed mid-stream.
    #[error("encoding failure: {0}")]
    Encoding(String),

    /// Unknown or expired job id.
    #[error("not found: {0}")]
    NotFound(String),

    /// The job exists but has no output to hand out yet.
    #[error("not ready: {0}")]
    NotReady(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl KenBurnsError {
    /// Build a [`KenBurnsError::InvalidRequest`] value.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Build a [`KenBurnsError::InvalidAnimationKind`] value.
    pub fn invalid_animation_kind(msg: impl Into<String>) -> Self {
        Self::InvalidAnimationKind(msg.into())
    }

    /// Build a [`KenBurnsError::ImageDecode`] value.
    pub fn image_decode(msg: impl Into<String>) -> Self {
        Self::ImageDecode(msg.into())
    }

    /// Build a [`KenBurnsError::Encoding`] value.
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Build a [`KenBurnsError::NotFound`] value.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Build a [`KenBurnsError::NotReady`] value.
    pub fn not_ready(msg: impl Into<String>) -> Self {
        Self::NotReady(msg.into())
    }

    /// `true` for errors caused by the caller's input rather than by the pipeline.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest(_)
                | Self::InvalidAnimationKind(_)
                | Self::ImageDecode(_)
                | Self::NotFound(_)
                | Self::NotReady(_)
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
