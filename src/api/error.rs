use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The upstream API answered 404 (or an empty page): there is nothing past this page.
    #[error("no more pages")]
    Exhausted,

    #[error("ESI request failed with status {status}")]
    Transport { status: StatusCode },

    #[error("ESI request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("failed to decode ESI payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid ESI url: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, ApiError::Exhausted)
    }

    /// Everything except end-of-data and a broken base URL may clear up on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::Transport { .. } | ApiError::Network(_) | ApiError::Decode(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(ApiError::Exhausted.is_exhausted());
        assert!(!ApiError::Exhausted.is_retryable());

        let transport = ApiError::Transport {
            status: StatusCode::BAD_GATEWAY,
        };
        assert!(transport.is_retryable());
        assert!(transport.to_string().contains("502"));

        let decode = serde_json::from_str::<Vec<i64>>("{").unwrap_err();
        assert!(ApiError::from(decode).is_retryable());

        assert!(!ApiError::InvalidUrl("nope".into()).is_retryable());
    }
}
