//! BER/DER, PER/UPER, XER/JER and GSER codecs over the `asn1-core` type
//! model: one [`Value`] representation, one dispatch enum per
//! operation, one codec per wire format.

pub mod ber;
pub mod error;
pub mod gser;
pub mod jer;
pub mod per;
pub mod value;
pub mod xer;

use asn1_core::model::{TypeId, TypeModel};

use error::{CodecError, CodecResult};
use value::Value;

/// The encoding a [`Spec`](crate::Codec)-level `encode`/`decode` call
/// should use. GSER is encode-only; decoding through it always fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Ber,
    Der,
    Per,
    Uper,
    Xer,
    Jer,
    Gser,
}

impl Codec {
    pub fn encode(self, model: &TypeModel, type_id: TypeId, value: &Value, path: &str) -> CodecResult<Vec<u8>> {
        match self {
            Codec::Ber => ber::BerEncoder::new(model).encode(type_id, value, path).map_err(CodecError::from),
            Codec::Der => ber::DerEncoder::new(model).encode(type_id, value, path).map_err(CodecError::from),
            Codec::Per => per::PerEncoder::new(model, true).encode(type_id, value, path).map_err(CodecError::from),
            Codec::Uper => per::PerEncoder::new(model, false).encode(type_id, value, path).map_err(CodecError::from),
            Codec::Xer => {
                let root = model.node(type_id).name.as_deref().unwrap_or("value");
                xer::XerEncoder::new(model).encode(type_id, value, root, path).map_err(CodecError::from)
            }
            Codec::Jer => jer::JerEncoder::new(model).encode(type_id, value, path).map_err(CodecError::from),
            Codec::Gser => gser::GserEncoder::new(model)
                .encode(type_id, value, path)
                .map(String::into_bytes)
                .map_err(CodecError::from),
        }
    }

    pub fn decode(self, model: &TypeModel, type_id: TypeId, bytes: &[u8], path: &str) -> CodecResult<Value> {
        match self {
            Codec::Ber => ber::BerDecoder::new(model).decode(type_id, bytes, path).map_err(CodecError::from),
            Codec::Der => ber::DerDecoder::new(model).decode(type_id, bytes, path).map_err(CodecError::from),
            Codec::Per => per::PerDecoder::new(model, true).decode(type_id, bytes, path).map_err(CodecError::from),
            Codec::Uper => per::PerDecoder::new(model, false).decode(type_id, bytes, path).map_err(CodecError::from),
            Codec::Xer => xer::XerDecoder::new(model).decode(type_id, bytes, path).map_err(CodecError::from),
            Codec::Jer => jer::JerDecoder::new(model).decode(type_id, bytes, path).map_err(CodecError::from),
            Codec::Gser => gser::decode(bytes).map_err(CodecError::from),
        }
    }
}

pub use error::CodecError as Error;
