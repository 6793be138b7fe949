//! ASN.1 toolkit facade: compile ASN.1 module text (or a previously
//! parsed/persisted form of it) into one [`spec::CompiledSpec`], then
//! `encode`/`decode` values against it under a chosen wire codec.
//!
//! The pipeline mirrors `asn1-core`'s own split: [`parse`] turns source
//! text into the stable, serializable raw module list on its own
//! (useful for caching or inspecting module structure without picking a
//! codec yet); [`compile`] goes the rest of the way, resolving that list
//! and attaching a codec in one call. Everything downstream — value
//! representation, the seven wire formats, error categories — is
//! re-exported from `asn1-core`/`asn1-codec` rather than wrapped, so a
//! caller who needs lower-level access (the type model, a single
//! encoder) never has to reach past this crate.

pub mod error;
mod schema;
pub mod spec;

pub use asn1_codec::value::{BitStringValue, Value};
pub use asn1_codec::Codec;
pub use asn1_core::model::{TypeId, TypeModel};

pub use error::{Error, Result};
pub use spec::{codec_from_name, compile, parse, CompiledSpec, Encoded, Source};

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_model() -> TypeModel {
        let src = "Test DEFINITIONS ::= BEGIN \
                    Foo ::= INTEGER (0..127) \
                    Bar ::= SEQUENCE { a BOOLEAN, b INTEGER OPTIONAL } \
                    END";
        asn1_core::compile(src, "<test>").expect("module compiles")
    }

    #[test]
    fn compile_from_text_then_encode_uper_integer() {
        let spec = compile(&[Source::Text(
            "Test DEFINITIONS ::= BEGIN Foo ::= INTEGER (0..127) END".to_string(),
        )], Codec::Uper)
        .expect("compiles");
        let encoded = spec.encode("Foo", &Value::Integer(5.into())).expect("encodes");
        assert_eq!(encoded.as_bytes(), &[0x0A]);
    }

    #[test]
    fn round_trip_through_persisted_blob() {
        let model = sample_model();
        let spec = CompiledSpec::new(model, Codec::Der);
        let blob = spec.to_bytes();
        let reloaded = CompiledSpec::from_bytes(&blob).expect("deserializes");
        assert_eq!(reloaded.codec(), Codec::Der);
        assert!(reloaded.model().lookup("Bar").is_some());
    }

    #[test]
    fn compile_rejects_blob_mixed_with_text() {
        let model = sample_model();
        let blob = CompiledSpec::new(model, Codec::Ber).to_bytes();
        let err = compile(
            &[Source::Blob(blob), Source::Text("X DEFINITIONS ::= BEGIN END".to_string())],
            Codec::Ber,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[test]
    fn unknown_type_name_is_reported() {
        let model = sample_model();
        let spec = CompiledSpec::new(model, Codec::Ber);
        let err = spec.decode("NoSuchType", &[]).unwrap_err();
        assert!(matches!(err, Error::UnknownType(_)));
    }

    #[test]
    fn codec_names_are_case_insensitive() {
        assert_eq!(codec_from_name("UPER").unwrap(), Codec::Uper);
        assert!(codec_from_name("rot13").is_err());
    }
}
