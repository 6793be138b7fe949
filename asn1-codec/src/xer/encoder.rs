//! XML Encoding Rules (X.693), basic (unconstrained) variant: one
//! element per component/alternative, named after the ASN.1 field.

use asn1_core::model::{TypeId, TypeKind, TypeModel};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::writer::Writer;

use crate::error::{EncodeError, EncodeResult};
use crate::value::{raw_default_as_value, Value};

pub struct XerEncoder<'m> {
    model: &'m TypeModel,
}

impl<'m> XerEncoder<'m> {
    pub fn new(model: &'m TypeModel) -> Self {
        Self { model }
    }

    pub fn encode(&self, type_id: TypeId, value: &Value, root: &str, path: &str) -> EncodeResult<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        write_element(&mut writer, self.model, type_id, value, root, path)?;
        Ok(writer.into_inner())
    }
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    model: &TypeModel,
    id: TypeId,
    value: &Value,
    tag: &str,
    path: &str,
) -> EncodeResult<()> {
    let node = model.node(id);
    match (&node.kind, value) {
        (TypeKind::Boolean, Value::Boolean(b)) => write_boolean(writer, tag, *b),
        (TypeKind::Integer, Value::Integer(n)) => write_start_end_text(writer, tag, &n.to_string()),
        (TypeKind::Enumerated(_), Value::Enumerated(name)) => write_start_end_text(writer, tag, name),
        (TypeKind::Real, Value::Real(r)) => write_start_end_text(writer, tag, &r.to_string()),
        (TypeKind::Null, Value::Null) => write_empty(writer, tag),
        (TypeKind::OctetString, Value::OctetString(bytes)) => {
            write_start_end_text(writer, tag, &hex_upper(bytes))
        }
        (TypeKind::BitString, Value::BitString(bits)) => {
            let text: String = (0..bits.bit_len()).map(|i| if bits.get(i).unwrap_or(false) { '1' } else { '0' }).collect();
            write_start_end_text(writer, tag, &text)
        }
        (TypeKind::ObjectIdentifier, Value::ObjectIdentifier(arcs)) => {
            let text = arcs.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(".");
            write_start_end_text(writer, tag, &text)
        }
        (
            TypeKind::Utf8String
            | TypeKind::Ia5String
            | TypeKind::PrintableString
            | TypeKind::NumericString
            | TypeKind::VisibleString
            | TypeKind::GeneralString
            | TypeKind::BmpString
            | TypeKind::UniversalString
            | TypeKind::TeletexString
            | TypeKind::GraphicString
            | TypeKind::CharacterString,
            Value::CharacterString(s),
        ) => write_start_end_text(writer, tag, s),
        (
            TypeKind::UtcTime | TypeKind::GeneralizedTime | TypeKind::Date | TypeKind::TimeOfDay | TypeKind::DateTime | TypeKind::Duration,
            Value::TimeString(s),
        ) => write_start_end_text(writer, tag, s),
        (TypeKind::Choice { .. }, Value::Choice(name, inner)) => {
            writer
                .write_event(Event::Start(BytesStart::new(tag)))
                .map_err(|e| EncodeError::new(path, e.to_string()))?;
            write_element(writer, model, choice_alt_ty(&node.kind, name, path)?, inner, name, &format!("{path}.{name}"))?;
            writer
                .write_event(Event::End(BytesEnd::new(tag)))
                .map_err(|e| EncodeError::new(path, e.to_string()))
        }
        (TypeKind::Sequence { components, .. }, Value::Sequence(fields))
        | (TypeKind::Set { components, .. }, Value::Set(fields)) => {
            writer
                .write_event(Event::Start(BytesStart::new(tag)))
                .map_err(|e| EncodeError::new(path, e.to_string()))?;
            for c in components {
                match fields.get(&c.name) {
                    Some(v) if c.default.as_ref().and_then(raw_default_as_value).as_ref() == Some(v) => continue,
                    Some(v) => write_element(writer, model, c.ty, v, &c.name, &format!("{path}.{}", c.name))?,
                    None if c.optional || c.has_default() => continue,
                    None => return Err(EncodeError::new(path, format!("missing required component `{}`", c.name))),
                }
            }
            writer
                .write_event(Event::End(BytesEnd::new(tag)))
                .map_err(|e| EncodeError::new(path, e.to_string()))
        }
        (TypeKind::SequenceOf(inner), Value::SequenceOf(items)) | (TypeKind::SetOf(inner), Value::SetOf(items)) => {
            writer
                .write_event(Event::Start(BytesStart::new(tag)))
                .map_err(|e| EncodeError::new(path, e.to_string()))?;
            for (i, item) in items.iter().enumerate() {
                write_element(writer, model, *inner, item, "item", &format!("{path}[{i}]"))?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(tag)))
                .map_err(|e| EncodeError::new(path, e.to_string()))
        }
        (TypeKind::Any | TypeKind::AnyDefinedBy(_) | TypeKind::OpenType, Value::OpenType(bytes)) => {
            write_start_end_text(writer, tag, &hex_upper(bytes))
        }
        _ => Err(EncodeError::new(path, "value shape does not match declared type")),
    }
}

fn choice_alt_ty(kind: &TypeKind, name: &str, path: &str) -> EncodeResult<TypeId> {
    if let TypeKind::Choice { alternatives, .. } = kind {
        alternatives
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.ty)
            .ok_or_else(|| EncodeError::new(path, format!("no such CHOICE alternative `{name}`")))
    } else {
        Err(EncodeError::new(path, "not a CHOICE"))
    }
}

fn write_start_end_text(writer: &mut Writer<Vec<u8>>, tag: &str, text: &str) -> EncodeResult<()> {
    writer
        .write_event(Event::Start(BytesStart::new(tag)))
        .map_err(|e| EncodeError::new(tag, e.to_string()))?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(|e| EncodeError::new(tag, e.to_string()))?;
    writer
        .write_event(Event::End(BytesEnd::new(tag)))
        .map_err(|e| EncodeError::new(tag, e.to_string()))
}

/// X.693 clause 8.2.3: BOOLEAN is a nested empty element, `<true/>` or
/// `<false/>`, not text content.
fn write_boolean(writer: &mut Writer<Vec<u8>>, tag: &str, b: bool) -> EncodeResult<()> {
    writer
        .write_event(Event::Start(BytesStart::new(tag)))
        .map_err(|e| EncodeError::new(tag, e.to_string()))?;
    write_empty(writer, if b { "true" } else { "false" })?;
    writer
        .write_event(Event::End(BytesEnd::new(tag)))
        .map_err(|e| EncodeError::new(tag, e.to_string()))
}

fn write_empty(writer: &mut Writer<Vec<u8>>, tag: &str) -> EncodeResult<()> {
    writer
        .write_event(Event::Empty(BytesStart::new(tag)))
        .map_err(|e| EncodeError::new(tag, e.to_string()))
}

fn hex_upper(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}
