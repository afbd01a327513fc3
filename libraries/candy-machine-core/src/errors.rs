use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("account data too short: {len} bytes")]
    Truncated { len: usize },

    #[error("account discriminator mismatch, expected {expected}")]
    DiscriminatorMismatch { expected: &'static str },

    #[error("failed to decode {account}: {message}")]
    Decode {
        account: &'static str,
        message: String,
    },
}
