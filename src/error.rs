use thiserror::Error;

#[derive(Debug, Error)]
pub enum TacauthzError {
    #[error("policy load failed: {0}")]
    PolicyLoad(String),

    #[error("invalid policy: {0}")]
    PolicyValidation(String),
}
