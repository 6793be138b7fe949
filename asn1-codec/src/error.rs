//! Runtime error categories: a value failing to satisfy a type on
//! encode, bytes failing to conform to a type on decode, and codec
//! features that are recognized but not implemented.

/// A dotted/bracketed path into a value, e.g. `a.b[3].choice-alt.c`,
/// accumulated as errors bubble up through nested encode/decode calls.
pub type ValuePath = String;

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
#[error("encode error at {path}: {message}")]
pub struct EncodeError {
    pub path: ValuePath,
    pub message: String,
}

impl EncodeError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
#[error("decode error at {path} (offset {offset}): {message}")]
pub struct DecodeError {
    pub path: ValuePath,
    pub offset: usize,
    pub message: String,
}

impl DecodeError {
    pub fn new(path: impl Into<String>, offset: usize, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            offset,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
#[error("unsupported: {0}")]
pub struct Unsupported(pub String);

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum CodecError {
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Unsupported(#[from] Unsupported),
}

pub type EncodeResult<T> = Result<T, EncodeError>;
pub type DecodeResult<T> = Result<T, DecodeError>;
pub type CodecResult<T> = Result<T, CodecError>;
