//! XER decoding via an event cursor over the whole document, recursing
//! through the type model the same way the encoder walks it forward.

use asn1_core::model::{TypeId, TypeKind, TypeModel};
use num_bigint::BigInt;
use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::{DecodeError, DecodeResult};
use crate::value::{BitStringValue, Value};

pub struct XerDecoder<'m> {
    model: &'m TypeModel,
}

struct Cursor<'a> {
    reader: Reader<&'a [u8]>,
    buf: Vec<u8>,
}

impl<'a> Cursor<'a> {
    fn new(xml: &'a [u8]) -> Self {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);
        Self { reader, buf: Vec::new() }
    }

    fn next(&mut self, path: &str) -> DecodeResult<Event<'static>> {
        self.buf.clear();
        self.reader
            .read_event_into(&mut self.buf)
            .map(|e| e.into_owned())
            .map_err(|e| DecodeError::new(path, 0, e.to_string()))
    }
}

impl<'m> XerDecoder<'m> {
    pub fn new(model: &'m TypeModel) -> Self {
        Self { model }
    }

    pub fn decode(&self, type_id: TypeId, xml: &[u8], path: &str) -> DecodeResult<Value> {
        let mut cursor = Cursor::new(xml);
        loop {
            match cursor.next(path)? {
                Event::Start(_) | Event::Empty(_) => {
                    return read_element(&mut cursor, self.model, type_id, path);
                }
                Event::Eof => return Err(DecodeError::new(path, 0, "empty document")),
                _ => continue,
            }
        }
    }
}

fn read_element(cursor: &mut Cursor, model: &TypeModel, id: TypeId, path: &str) -> DecodeResult<Value> {
    let node = model.node(id);
    match &node.kind {
        TypeKind::Boolean => read_boolean(cursor, path).map(Value::Boolean),
        TypeKind::Integer => read_text(cursor, path)?
            .parse::<BigInt>()
            .map(Value::Integer)
            .map_err(|e| DecodeError::new(path, 0, e.to_string())),
        TypeKind::Enumerated(items) => {
            let text = read_text(cursor, path)?;
            if items.iter().any(|(n, _)| n == &text) {
                Ok(Value::Enumerated(text))
            } else {
                Err(DecodeError::new(path, 0, format!("no such ENUMERATED value `{text}`")))
            }
        }
        TypeKind::Real => read_text(cursor, path)?
            .parse::<f64>()
            .map(Value::Real)
            .map_err(|e| DecodeError::new(path, 0, e.to_string())),
        TypeKind::Null => Ok(Value::Null),
        TypeKind::OctetString => Ok(Value::OctetString(hex_decode(&read_text(cursor, path)?, path)?)),
        TypeKind::BitString => {
            let text = read_text(cursor, path)?;
            let bit_len = text.len();
            let mut bytes = vec![0u8; bit_len.div_ceil(8)];
            for (i, c) in text.chars().enumerate() {
                if c == '1' {
                    bytes[i / 8] |= 0x80 >> (i % 8);
                }
            }
            let bits = BitStringValue::new(bytes, bit_len).map_err(|e| DecodeError::new(path, 0, e.message))?;
            Ok(Value::BitString(bits))
        }
        TypeKind::ObjectIdentifier => {
            let text = read_text(cursor, path)?;
            text.split('.')
                .map(|a| a.parse::<u64>().map_err(|e| DecodeError::new(path, 0, e.to_string())))
                .collect::<DecodeResult<Vec<_>>>()
                .map(Value::ObjectIdentifier)
        }
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
        | TypeKind::CharacterString => Ok(Value::CharacterString(read_text(cursor, path)?)),
        TypeKind::UtcTime | TypeKind::GeneralizedTime | TypeKind::Date | TypeKind::TimeOfDay | TypeKind::DateTime | TypeKind::Duration => {
            Ok(Value::TimeString(read_text(cursor, path)?))
        }
        TypeKind::Choice { alternatives, .. } => loop {
            match cursor.next(path)? {
                Event::Start(tag) | Event::Empty(tag) => {
                    let name = String::from_utf8_lossy(tag.name().as_ref()).to_string();
                    let alt = alternatives
                        .iter()
                        .find(|c| c.name == name)
                        .ok_or_else(|| DecodeError::new(path, 0, format!("no CHOICE alternative `{name}`")))?;
                    let value = read_element(cursor, model, alt.ty, &format!("{path}.{name}"))?;
                    skip_to_end(cursor, path)?;
                    return Ok(Value::Choice(name, Box::new(value)));
                }
                Event::End(_) => return Err(DecodeError::new(path, 0, "empty CHOICE element")),
                Event::Eof => return Err(DecodeError::new(path, 0, "unexpected end of document")),
                _ => continue,
            }
        },
        TypeKind::Sequence { components, .. } | TypeKind::Set { components, .. } => {
            let mut fields = indexmap::IndexMap::new();
            let mut next_component = 0;
            loop {
                match cursor.next(path)? {
                    Event::Start(tag) | Event::Empty(tag) => {
                        let name = String::from_utf8_lossy(tag.name().as_ref()).to_string();
                        while next_component < components.len() && components[next_component].name != name {
                            let c = &components[next_component];
                            if !(c.optional || c.has_default()) {
                                return Err(DecodeError::new(path, 0, format!("missing required component `{}`", c.name)));
                            }
                            next_component += 1;
                        }
                        let c = components
                            .get(next_component)
                            .ok_or_else(|| DecodeError::new(path, 0, format!("unexpected element `{name}`")))?;
                        let value = read_element(cursor, model, c.ty, &format!("{path}.{name}"))?;
                        fields.insert(name, value);
                        next_component += 1;
                    }
                    Event::End(_) => break,
                    Event::Eof => return Err(DecodeError::new(path, 0, "unexpected end of document")),
                    _ => continue,
                }
            }
            if matches!(node.kind, TypeKind::Set { .. }) {
                Ok(Value::Set(fields))
            } else {
                Ok(Value::Sequence(fields))
            }
        }
        TypeKind::SequenceOf(inner) | TypeKind::SetOf(inner) => {
            let mut items = Vec::new();
            let mut i = 0;
            loop {
                match cursor.next(path)? {
                    Event::Start(_) | Event::Empty(_) => {
                        items.push(read_element(cursor, model, *inner, &format!("{path}[{i}]"))?);
                        i += 1;
                    }
                    Event::End(_) => break,
                    Event::Eof => return Err(DecodeError::new(path, 0, "unexpected end of document")),
                    _ => continue,
                }
            }
            if matches!(node.kind, TypeKind::SetOf(_)) {
                Ok(Value::SetOf(items))
            } else {
                Ok(Value::SequenceOf(items))
            }
        }
        TypeKind::Any | TypeKind::AnyDefinedBy(_) | TypeKind::OpenType => {
            Ok(Value::OpenType(hex_decode(&read_text(cursor, path)?, path)?))
        }
        TypeKind::ObjectDescriptor | TypeKind::External | TypeKind::EmbeddedPdv | TypeKind::RelativeOid | TypeKind::Reference(_) => {
            Err(DecodeError::new(path, 0, "decoding this type in XER is not implemented"))
        }
    }
}

/// Reads a BOOLEAN's nested `<true/>`/`<false/>` element and consumes
/// the outer element's end tag.
fn read_boolean(cursor: &mut Cursor, path: &str) -> DecodeResult<bool> {
    let b = loop {
        match cursor.next(path)? {
            Event::Empty(tag) => {
                break match tag.name().as_ref() {
                    b"true" => true,
                    b"false" => false,
                    other => {
                        return Err(DecodeError::new(
                            path,
                            0,
                            format!("expected `true` or `false`, got `{}`", String::from_utf8_lossy(other)),
                        ))
                    }
                };
            }
            Event::Start(tag) => {
                let b = match tag.name().as_ref() {
                    b"true" => true,
                    b"false" => false,
                    other => {
                        return Err(DecodeError::new(
                            path,
                            0,
                            format!("expected `true` or `false`, got `{}`", String::from_utf8_lossy(other)),
                        ))
                    }
                };
                skip_to_end(cursor, path)?;
                break b;
            }
            Event::End(_) => return Err(DecodeError::new(path, 0, "empty BOOLEAN element")),
            Event::Eof => return Err(DecodeError::new(path, 0, "unexpected end of document")),
            _ => continue,
        }
    };
    skip_to_end(cursor, path)?;
    Ok(b)
}

/// Reads the text content of the element the cursor just entered and
/// consumes its matching end tag (or, for an empty element, nothing —
/// the empty string).
fn read_text(cursor: &mut Cursor, path: &str) -> DecodeResult<String> {
    match cursor.next(path)? {
        Event::Text(t) => {
            let s = String::from_utf8_lossy(&t).to_string();
            skip_to_end(cursor, path)?;
            Ok(s)
        }
        Event::End(_) => Ok(String::new()),
        Event::Eof => Err(DecodeError::new(path, 0, "unexpected end of document")),
        _ => Err(DecodeError::new(path, 0, "expected text content")),
    }
}

fn skip_to_end(cursor: &mut Cursor, path: &str) -> DecodeResult<()> {
    loop {
        match cursor.next(path)? {
            Event::End(_) => return Ok(()),
            Event::Eof => return Err(DecodeError::new(path, 0, "unexpected end of document")),
            _ => continue,
        }
    }
}

fn hex_decode(s: &str, path: &str) -> DecodeResult<Vec<u8>> {
    if s.len() % 2 != 0 {
        return Err(DecodeError::new(path, 0, "odd-length hex string"));
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(|e| DecodeError::new(path, 0, e.to_string())))
        .collect()
}
