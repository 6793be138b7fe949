//! DER is BER with every encoding choice pinned down; the shared BER
//! encoder already produces definite lengths, minimal integers, and
//! sorted SET OF content, so this module only adds the decode-side
//! strictness checks that are specific to DER rather than to BER.

use asn1_core::model::{TypeId, TypeModel};

use crate::error::{DecodeError, DecodeResult, EncodeResult};
use crate::value::Value;

use super::decoder::BerDecoder;
use super::encoder::BerEncoder;

pub struct DerEncoder<'m> {
    inner: BerEncoder<'m>,
}

impl<'m> DerEncoder<'m> {
    pub fn new(model: &'m TypeModel) -> Self {
        Self {
            inner: BerEncoder::new(model),
        }
    }

    pub fn encode(&self, type_id: TypeId, value: &Value, path: &str) -> EncodeResult<Vec<u8>> {
        self.inner.encode(type_id, value, path)
    }
}

pub struct DerDecoder<'m> {
    decoder: BerDecoder<'m>,
    encoder: BerEncoder<'m>,
}

impl<'m> DerDecoder<'m> {
    pub fn new(model: &'m TypeModel) -> Self {
        Self {
            decoder: BerDecoder::new(model),
            encoder: BerEncoder::new(model),
        }
    }

    /// Decodes, then re-encodes the result and compares byte-for-byte
    /// with the input. Since the shared BER encoder always produces
    /// canonical output, any mismatch means the input used a BER option
    /// DER forbids (non-minimal length or integer, reordered SET OF,
    /// indefinite length already rejected at the BER layer).
    pub fn decode(&self, type_id: TypeId, buf: &[u8], path: &str) -> DecodeResult<Value> {
        let value = self.decoder.decode(type_id, buf, path)?;
        let canonical = self
            .encoder
            .encode(type_id, &value, path)
            .map_err(|e| DecodeError::new(path, 0, format!("value does not re-encode: {e}")))?;
        if canonical != buf {
            return Err(DecodeError::new(path, 0, "input is not DER-canonical BER"));
        }
        Ok(value)
    }
}
