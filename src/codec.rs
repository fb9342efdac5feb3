use std::str::FromStr;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

const FHIR_XMLNS: &str = "http://hl7.org/fhir";

/// The two interchangeable resource encodings.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Format {
    Json,
    Xml,
}

impl Format {
    pub const fn extension(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Xml => "xml",
        }
    }

    pub const fn opposite(self) -> Format {
        match self {
            Format::Json => Format::Xml,
            Format::Xml => Format::Json,
        }
    }

    /// Match a file extension, case-insensitively. Anything outside the two
    /// known encodings is None and handled by the copy path.
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_ascii_lowercase().as_str() {
            "json" => Some(Format::Json),
            "xml" => Some(Format::Xml),
            _ => None,
        }
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Format, String> {
        Format::from_extension(s).ok_or_else(|| format!("unknown format '{s}', expected json or xml"))
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// In-memory structured record. Always a JSON object carrying a
/// `resourceType` field, which names the root element on the XML side.
pub type Record = Value;

/// Two-way codec between the in-memory record and its textual encodings.
///
/// Stateless; construct one and pass it by reference wherever conversion
/// happens.
pub struct RecordCodec;

impl RecordCodec {
    pub fn new() -> RecordCodec {
        RecordCodec
    }

    pub fn decode(&self, bytes: &[u8], format: Format) -> Result<Record> {
        match format {
            Format::Json => decode_json(bytes),
            Format::Xml => decode_xml(bytes),
        }
    }

    pub fn encode(&self, record: &Record, format: Format) -> Result<Vec<u8>> {
        match format {
            Format::Json => encode_json(record),
            Format::Xml => encode_xml(record),
        }
    }
}

impl Default for RecordCodec {
    fn default() -> RecordCodec {
        RecordCodec::new()
    }
}

fn decode_json(bytes: &[u8]) -> Result<Record> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| Error::Decode(format!("invalid JSON: {e}")))?;
    if !value.is_object() {
        return Err(Error::Decode("resource root must be a JSON object".into()));
    }
    Ok(value)
}

fn encode_json(record: &Record) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(record)
        .map_err(|e| Error::Encode(format!("cannot serialize record to JSON: {e}")))?;
    bytes.push(b'\n');
    Ok(bytes)
}

fn encode_xml(record: &Record) -> Result<Vec<u8>> {
    let obj = record
        .as_object()
        .ok_or_else(|| Error::Encode("resource root must be an object".into()))?;
    let resource_type = obj
        .get("resourceType")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Encode("record has no resourceType".into()))?;

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    let mut root = BytesStart::new(resource_type);
    root.push_attribute(("xmlns", FHIR_XMLNS));
    writer
        .write_event(Event::Start(root))
        .map_err(|e| Error::Encode(e.to_string()))?;
    for (name, value) in obj {
        if name == "resourceType" {
            continue;
        }
        write_field(&mut writer, name, value)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(resource_type)))
        .map_err(|e| Error::Encode(e.to_string()))?;

    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}

fn write_field<W: std::io::Write>(writer: &mut Writer<W>, name: &str, value: &Value) -> Result<()> {
    match value {
        // Arrays repeat the element name, one element per item
        Value::Array(items) => {
            for item in items {
                write_field(writer, name, item)?;
            }
            Ok(())
        }
        Value::Object(fields) => {
            writer
                .write_event(Event::Start(BytesStart::new(name)))
                .map_err(|e| Error::Encode(e.to_string()))?;
            for (child_name, child) in fields {
                write_field(writer, child_name, child)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(|e| Error::Encode(e.to_string()))?;
            Ok(())
        }
        Value::Null => Ok(()),
        // Scalars become empty elements carrying a value attribute
        scalar => {
            let text = match scalar {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let mut element = BytesStart::new(name);
            element.push_attribute(("value", text.as_str()));
            writer
                .write_event(Event::Empty(element))
                .map_err(|e| Error::Encode(e.to_string()))
        }
    }
}

fn decode_xml(bytes: &[u8]) -> Result<Record> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::Decode(format!("XML is not valid UTF-8: {e}")))?;
    let mut reader = Reader::from_str(text);

    // Find the root element, skipping the declaration and any comments
    loop {
        match reader.read_event().map_err(|e| Error::Decode(e.to_string()))? {
            Event::Start(start) => {
                let resource_type = element_name(&start)?;
                let attrs = element_attributes(&start)?;
                let body = read_element_body(&mut reader)?;
                let mut fields = Map::new();
                fields.insert("resourceType".into(), Value::String(resource_type));
                for (key, value) in attrs {
                    fields.insert(key, Value::String(value));
                }
                for (key, value) in body.fields {
                    fields.insert(key, value);
                }
                return Ok(Value::Object(fields));
            }
            Event::Empty(start) => {
                let resource_type = element_name(&start)?;
                let mut fields = Map::new();
                fields.insert("resourceType".into(), Value::String(resource_type));
                for (key, value) in element_attributes(&start)? {
                    fields.insert(key, Value::String(value));
                }
                return Ok(Value::Object(fields));
            }
            Event::Eof => return Err(Error::Decode("XML document has no root element".into())),
            _ => {}
        }
    }
}

struct ElementBody {
    fields: Map<String, Value>,
    text: Option<String>,
}

/// Read child events until the enclosing element's End tag.
fn read_element_body(reader: &mut Reader<&[u8]>) -> Result<ElementBody> {
    let mut fields = Map::new();
    let mut text = None;
    loop {
        match reader.read_event().map_err(|e| Error::Decode(e.to_string()))? {
            Event::Start(start) => {
                let name = element_name(&start)?;
                let attrs = element_attributes(&start)?;
                let body = read_element_body(reader)?;
                insert_field(&mut fields, name, element_value(attrs, body));
            }
            Event::Empty(start) => {
                let name = element_name(&start)?;
                let attrs = element_attributes(&start)?;
                let body = ElementBody { fields: Map::new(), text: None };
                insert_field(&mut fields, name, element_value(attrs, body));
            }
            // Text may arrive in several runs (split by comments, CDATA
            // boundaries or entity references); they all belong to one value
            Event::Text(t) => {
                let content = t
                    .unescape()
                    .map_err(|e| Error::Decode(e.to_string()))?;
                if !content.trim().is_empty() {
                    text.get_or_insert_with(String::new).push_str(&content);
                }
            }
            Event::CData(t) => {
                text.get_or_insert_with(String::new)
                    .push_str(&String::from_utf8_lossy(&t));
            }
            Event::End(_) => break,
            Event::Eof => return Err(Error::Decode("unexpected end of XML document".into())),
            _ => {}
        }
    }
    Ok(ElementBody { fields, text })
}

/// Collapse one parsed element into a JSON value.
fn element_value(attrs: Vec<(String, String)>, body: ElementBody) -> Value {
    // The common FHIR shape: a leaf element whose only payload is the value
    // attribute becomes a scalar
    if body.fields.is_empty() && body.text.is_none() && attrs.len() == 1 && attrs[0].0 == "value" {
        return infer_scalar(&attrs[0].1);
    }

    let mut map = Map::new();
    for (key, value) in attrs {
        if key == "value" {
            map.insert(key, infer_scalar(&value));
        } else {
            map.insert(key, Value::String(value));
        }
    }
    for (key, value) in body.fields {
        insert_field(&mut map, key, value);
    }
    if map.is_empty() {
        if let Some(content) = body.text {
            return Value::String(content);
        }
    }
    Value::Object(map)
}

/// Repeated sibling elements fold into an array under one key.
fn insert_field(map: &mut Map<String, Value>, name: String, value: Value) {
    match map.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            map.insert(name, value);
        }
    }
}

/// XML value attributes carry no type marker, so types are inferred from the
/// lexical form on the way back to JSON.
fn infer_scalar(text: &str) -> Value {
    match text {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(n) = text.parse::<i64>() {
        if n.to_string() == text {
            return Value::Number(n.into());
        }
    }
    if text.contains('.') {
        if let Ok(f) = text.parse::<f64>() {
            if let Some(n) = serde_json::Number::from_f64(f) {
                return Value::Number(n);
            }
        }
    }
    Value::String(text.to_string())
}

fn element_name(start: &BytesStart) -> Result<String> {
    std::str::from_utf8(start.local_name().as_ref())
        .map(str::to_owned)
        .map_err(|e| Error::Decode(format!("element name is not valid UTF-8: {e}")))
}

fn element_attributes(start: &BytesStart) -> Result<Vec<(String, String)>> {
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::Decode(e.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| Error::Decode(format!("attribute name is not valid UTF-8: {e}")))?;
        // Namespace declarations are part of the envelope, not the record
        if key == "xmlns" || key.starts_with("xmlns:") {
            continue;
        }
        let value = attr
            .unescape_value()
            .map_err(|e| Error::Decode(e.to_string()))?
            .into_owned();
        attrs.push((key.to_owned(), value));
    }
    Ok(attrs)
}
