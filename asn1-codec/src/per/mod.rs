//! Packed Encoding Rules (X.691): aligned PER and its unaligned (UPER)
//! variant, which share everything but where octet alignment happens.

pub mod bitstream;
pub mod decoder;
pub mod encoder;

pub use decoder::PerDecoder;
pub use encoder::PerEncoder;
