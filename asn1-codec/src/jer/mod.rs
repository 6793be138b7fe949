//! JSON Encoding Rules (draft ITU-T X.697 / JER): a value maps to one
//! `serde_json::Value` tree, built and walked directly rather than
//! through `serde::Serialize`, since the shape depends on the resolved
//! type model rather than on a Rust type.

pub mod decoder;
pub mod encoder;

pub use decoder::JerDecoder;
pub use encoder::JerEncoder;
