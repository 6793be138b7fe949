//! Basic Encoding Rules (X.690) and its Distinguished Encoding Rules
//! restriction, sharing one content encoder/decoder pair.

pub mod der;
pub mod decoder;
pub mod encoder;
pub(crate) mod support;
pub mod types;

pub use decoder::BerDecoder;
pub use der::{DerDecoder, DerEncoder};
pub use encoder::BerEncoder;
