//! The facade's single error type: every error a caller of [`crate::compile`],
//! [`crate::parse`] or [`crate::CompiledSpec`] can see, in one place.

use asn1_core::error::CompileError;
use asn1_codec::error::CodecError;

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("no such type assignment '{0}' in the compiled spec")]
    UnknownType(String),

    #[error("unknown codec name '{0}'")]
    UnknownCodec(String),

    #[error("malformed persisted spec blob: {0}")]
    Schema(String),
}

pub type Result<T> = std::result::Result<T, Error>;
