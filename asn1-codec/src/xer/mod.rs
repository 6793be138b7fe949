//! XML Encoding Rules (X.693), basic variant only (no canonical-XER
//! whitespace/attribute rules).

pub mod decoder;
pub mod encoder;

pub use decoder::XerDecoder;
pub use encoder::XerEncoder;
