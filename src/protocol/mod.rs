//! Authorization body codec (RFC 8907 section 6) and the verdict-to-reply boundary.

pub mod reply;
pub mod request;

use thiserror::Error;

pub use reply::{AuthorReply, AuthorStatus};
pub use request::{AuthorizationRequest, AvPair};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("body too short for header: {0} bytes")]
    TruncatedHeader(usize),

    #[error("body truncated reading {field}: wanted {wanted} bytes, {available} available")]
    TruncatedBody {
        field: &'static str,
        wanted: usize,
        available: usize,
    },

    #[error("{0} is not valid UTF-8")]
    InvalidUtf8(&'static str),

    #[error("argument '{0}' has no '=' or '*' separator")]
    MissingSeparator(String),

    #[error("duplicate '{0}' argument")]
    Duplicate(&'static str),

    #[error("{0} unexpected bytes after last argument")]
    TrailingBytes(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("{field} is {len} bytes, exceeds field limit")]
    FieldTooLong { field: &'static str, len: usize },

    #[error("{0} arguments exceed the 255 argument limit")]
    TooManyArguments(usize),
}
