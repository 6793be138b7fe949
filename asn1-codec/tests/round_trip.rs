//! Round-trip coverage across the seven codecs over a handful of
//! representative types, complementing the per-module unit tests and
//! the facade crate's pinned scenario assertions.

use asn1_codec::value::{BitStringValue, Value};
use asn1_codec::{ber, gser, jer, per, xer, Codec};
use asn1_core::model::TypeModel;
use indexmap::IndexMap;

fn model(source: &str) -> TypeModel {
    asn1_core::compile(source, "<test>").expect("module compiles")
}

#[test]
fn ber_round_trips_a_nested_sequence() {
    let m = model(
        "Test DEFINITIONS ::= BEGIN \
         Point ::= SEQUENCE { x INTEGER, y INTEGER, label UTF8String OPTIONAL } \
         END",
    );
    let id = m.lookup("Point").unwrap();
    let mut fields = IndexMap::new();
    fields.insert("x".to_string(), Value::Integer((-5).into()));
    fields.insert("y".to_string(), Value::Integer(300.into()));
    fields.insert("label".to_string(), Value::CharacterString("origin".to_string()));
    let value = Value::Sequence(fields);

    let bytes = ber::BerEncoder::new(&m).encode(id, &value, "").unwrap();
    let decoded = ber::BerDecoder::new(&m).decode(id, &bytes, "").unwrap();
    assert_eq!(decoded, value);
}

#[test]
fn der_rejects_non_canonical_ber_set_of_ordering() {
    let m = model("Test DEFINITIONS ::= BEGIN Flags ::= SET OF BOOLEAN END");
    let id = m.lookup("Flags").unwrap();
    let value = Value::SetOf(vec![Value::Boolean(true), Value::Boolean(false)]);

    // The BER encoder always sorts SET OF content octets, so DER decode
    // of its own output must succeed...
    let canonical = ber::BerEncoder::new(&m).encode(id, &value, "").unwrap();
    assert!(ber::DerDecoder::new(&m).decode(id, &canonical, "").is_ok());

    // ...but decoding a hand-built, non-canonically-ordered BER
    // encoding of the same value (TRUE's 0xFF after FALSE's 0x00) must
    // be rejected by the DER layer.
    let mut non_canonical = Vec::new();
    non_canonical.extend_from_slice(&[0x31, 0x06]); // SET OF, length 6
    non_canonical.extend_from_slice(&[0x01, 0x01, 0xFF]); // TRUE first
    non_canonical.extend_from_slice(&[0x01, 0x01, 0x00]); // FALSE second
    assert!(ber::DerDecoder::new(&m).decode(id, &non_canonical, "").is_err());
}

#[test]
fn uper_round_trips_a_choice_with_extension_addition() {
    let m = model(
        "Test DEFINITIONS ::= BEGIN \
         Msg ::= CHOICE { ping NULL, pong BOOLEAN } \
         END",
    );
    let id = m.lookup("Msg").unwrap();
    let value = Value::Choice("pong".to_string(), Box::new(Value::Boolean(true)));

    let bytes = per::PerEncoder::new(&m, false).encode(id, &value, "").unwrap();
    let decoded = per::PerDecoder::new(&m, false).decode(id, &bytes, "").unwrap();
    assert_eq!(decoded, value);
}

#[test]
fn per_round_trips_a_bit_string() {
    let m = model("Test DEFINITIONS ::= BEGIN Mask ::= BIT STRING (SIZE(12)) END");
    let id = m.lookup("Mask").unwrap();
    let value = Value::BitString(BitStringValue::new(vec![0b1010_1100, 0b1111_0000], 12).unwrap());

    let bytes = per::PerEncoder::new(&m, true).encode(id, &value, "").unwrap();
    let decoded = per::PerDecoder::new(&m, true).decode(id, &bytes, "").unwrap();
    assert_eq!(decoded, value);
}

#[test]
fn xer_round_trips_a_sequence_of() {
    let m = model("Test DEFINITIONS ::= BEGIN Names ::= SEQUENCE OF UTF8String END");
    let id = m.lookup("Names").unwrap();
    let value = Value::SequenceOf(vec![
        Value::CharacterString("alice".to_string()),
        Value::CharacterString("bob".to_string()),
    ]);

    let bytes = xer::XerEncoder::new(&m).encode(id, &value, "Names", "").unwrap();
    let decoded = xer::XerDecoder::new(&m).decode(id, &bytes, "").unwrap();
    assert_eq!(decoded, value);
}

#[test]
fn jer_round_trips_an_enumerated_value() {
    let m = model("Test DEFINITIONS ::= BEGIN Color ::= ENUMERATED { red, green, blue } END");
    let id = m.lookup("Color").unwrap();
    let value = Value::Enumerated("green".to_string());

    let bytes = jer::JerEncoder::new(&m).encode(id, &value, "").unwrap();
    assert_eq!(bytes, br#""green""#);
    let decoded = jer::JerDecoder::new(&m).decode(id, &bytes, "").unwrap();
    assert_eq!(decoded, value);
}

#[test]
fn jer_round_trips_a_bit_string_as_value_length_object() {
    let m = model("Test DEFINITIONS ::= BEGIN Mask ::= BIT STRING (SIZE(12)) END");
    let id = m.lookup("Mask").unwrap();
    let value = Value::BitString(BitStringValue::new(vec![0b1010_1100, 0b1111_0000], 12).unwrap());

    let bytes = jer::JerEncoder::new(&m).encode(id, &value, "").unwrap();
    assert_eq!(bytes, br#"{"value":"ACF0","length":12}"#);
    let decoded = jer::JerDecoder::new(&m).decode(id, &bytes, "").unwrap();
    assert_eq!(decoded, value);
}

#[test]
fn jer_falls_back_to_a_string_for_integers_outside_the_safe_range() {
    let m = model("Test DEFINITIONS ::= BEGIN Big ::= INTEGER END");
    let id = m.lookup("Big").unwrap();
    let value = Value::Integer("9007199254740993".parse().unwrap());

    let bytes = jer::JerEncoder::new(&m).encode(id, &value, "").unwrap();
    assert_eq!(bytes, br#""9007199254740993""#);
    let decoded = jer::JerDecoder::new(&m).decode(id, &bytes, "").unwrap();
    assert_eq!(decoded, value);

    let small = Value::Integer(42.into());
    let bytes = jer::JerEncoder::new(&m).encode(id, &small, "").unwrap();
    assert_eq!(bytes, b"42");
}

#[test]
fn ber_decodes_indefinite_length_but_der_rejects_it() {
    let m = model("Test DEFINITIONS ::= BEGIN Point ::= SEQUENCE { x INTEGER, y INTEGER } END");
    let id = m.lookup("Point").unwrap();
    let mut fields = IndexMap::new();
    fields.insert("x".to_string(), Value::Integer(1.into()));
    fields.insert("y".to_string(), Value::Integer(2.into()));
    let value = Value::Sequence(fields);

    // Constructed SEQUENCE tag, indefinite length (0x80), two INTEGER
    // TLVs, then the end-of-contents marker.
    let mut encoded = vec![0x30, 0x80];
    encoded.extend_from_slice(&[0x02, 0x01, 0x01]);
    encoded.extend_from_slice(&[0x02, 0x01, 0x02]);
    encoded.extend_from_slice(&[0x00, 0x00]);

    let decoded = ber::BerDecoder::new(&m).decode(id, &encoded, "").unwrap();
    assert_eq!(decoded, value);
    assert!(ber::DerDecoder::new(&m).decode(id, &encoded, "").is_err());
}

#[test]
fn default_components_equal_to_their_default_are_omitted_from_der() {
    let m = model(
        "Test DEFINITIONS ::= BEGIN \
         Opt ::= SEQUENCE { flag BOOLEAN DEFAULT TRUE } \
         END",
    );
    let id = m.lookup("Opt").unwrap();
    let mut default_valued = IndexMap::new();
    default_valued.insert("flag".to_string(), Value::Boolean(true));
    let default_valued = Value::Sequence(default_valued);

    let mut non_default = IndexMap::new();
    non_default.insert("flag".to_string(), Value::Boolean(false));
    let non_default = Value::Sequence(non_default);

    let omitted = ber::BerEncoder::new(&m).encode(id, &default_valued, "").unwrap();
    assert_eq!(omitted, vec![0x30, 0x00]);

    let present = ber::BerEncoder::new(&m).encode(id, &non_default, "").unwrap();
    assert!(!present.is_empty() && present.len() > omitted.len());
}

#[test]
fn per_decoder_rejects_a_fragmented_length_determinant() {
    let m = model("Test DEFINITIONS ::= BEGIN Blob ::= OCTET STRING END");
    let id = m.lookup("Blob").unwrap();

    // First length octet 0xC1: top two bits set mark the X.691 §10.9.3.8
    // fragmentation form, which this implementation doesn't support.
    let encoded = vec![0xC1, 0x00];
    assert!(per::PerDecoder::new(&m, true).decode(id, &encoded, "").is_err());
}

#[test]
fn gser_renders_sequence_components_without_a_colon() {
    let m = model(
        "Test DEFINITIONS ::= BEGIN \
         Point ::= SEQUENCE { x INTEGER, y INTEGER } \
         END",
    );
    let id = m.lookup("Point").unwrap();
    let mut fields = IndexMap::new();
    fields.insert("x".to_string(), Value::Integer(1.into()));
    fields.insert("y".to_string(), Value::Integer(2.into()));
    let value = Value::Sequence(fields);

    let rendered = gser::GserEncoder::new(&m).encode(id, &value, "").unwrap();
    assert_eq!(rendered, "{ x 1, y 2 }");
}

#[test]
fn codec_enum_dispatches_to_the_same_encoders() {
    let m = model("Test DEFINITIONS ::= BEGIN Flag ::= BOOLEAN END");
    let id = m.lookup("Flag").unwrap();
    let value = Value::Boolean(true);

    let via_enum = Codec::Ber.encode(&m, id, &value, "").unwrap();
    let via_direct = ber::BerEncoder::new(&m).encode(id, &value, "").unwrap();
    assert_eq!(via_enum, via_direct);
}
