//! Renders JSON values as XML elements.

use crate::error::ConvertError;
use crate::options::ConvertOptions;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use serde_json::{Map, Value};

/// Converts JSON text to XML text.
///
/// Blank input yields `Ok(None)`. Text starting with `[` must be an array, anything else
/// an object.
pub fn json_to_xml(json: &str) -> Result<Option<String>, ConvertError> {
    json_to_xml_with(json, &ConvertOptions::default())
}

pub fn json_to_xml_with(json: &str, options: &ConvertOptions) -> Result<Option<String>, ConvertError> {
    let json = json.trim();
    if json.is_empty() {
        log::debug!("Empty JSON body, nothing to convert");
        return Ok(None);
    }
    let value = if json.starts_with('[') {
        Value::Array(serde_json::from_str::<Vec<Value>>(json)?)
    } else {
        Value::Object(serde_json::from_str::<Map<String, Value>>(json)?)
    };
    json_value_to_xml(&value, options).map(Some)
}

/// Converts an already parsed array or object. Other values are not documents.
pub fn json_value_to_xml(value: &Value, options: &ConvertOptions) -> Result<String, ConvertError> {
    let mut xml = XmlBuilder::new(options);
    match value {
        Value::Array(items) => {
            xml.open(&options.list_element)?;
            xml.open(&options.item_element)?;
            xml.anonymous_array(items)?;
            xml.close(&options.item_element)?;
            xml.close(&options.list_element)?;
        }
        Value::Object(map) if needs_list_wrapper(map) => {
            xml.open(&options.list_element)?;
            xml.object(map)?;
            xml.close(&options.list_element)?;
        }
        Value::Object(map) => xml.object(map)?,
        other => {
            return Err(ConvertError::Unsupported(format!(
                "top-level {} (expected an object or array)",
                type_name(other)
            )));
        }
    }
    let rendered = xml.finish()?;
    log::debug!("Converted JSON {} to {} bytes of XML", type_name(value), rendered.len());
    Ok(rendered)
}

/// A single key holding an array would otherwise leave the array's siblings without a
/// common parent.
fn needs_list_wrapper(map: &Map<String, Value>) -> bool {
    map.len() == 1 && map.values().all(Value::is_array)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Element names are taken verbatim from JSON keys, so reject what XML cannot carry.
/// Colons are refused too: output carries no namespace declarations to bind a prefix.
fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// XML 1.0 `Char`: control characters other than tab, newline and carriage return are
/// not allowed, even escaped.
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && !matches!(c, '\u{FFFE}' | '\u{FFFF}'))
}

fn check_text(text: &str) -> Result<(), ConvertError> {
    match text.chars().find(|c| !is_xml_char(*c)) {
        None => Ok(()),
        Some(c) => Err(ConvertError::Unsupported(format!(
            "text contains U+{:04X}, which XML cannot represent",
            u32::from(c)
        ))),
    }
}

fn check_name(name: &str) -> Result<(), ConvertError> {
    if is_xml_name(name) {
        Ok(())
    } else {
        Err(ConvertError::Unsupported(format!(
            "key '{}' is not a valid XML element name",
            name
        )))
    }
}

struct XmlBuilder<'o> {
    writer: Writer<Vec<u8>>,
    options: &'o ConvertOptions,
}

impl<'o> XmlBuilder<'o> {
    fn new(options: &'o ConvertOptions) -> Self {
        Self {
            writer: Writer::new(Vec::new()),
            options,
        }
    }

    fn write(&mut self, event: Event<'_>) -> Result<(), ConvertError> {
        self.writer
            .write_event(event)
            .map_err(|e| ConvertError::Render(e.to_string()))
    }

    fn open(&mut self, name: &str) -> Result<(), ConvertError> {
        check_name(name)?;
        self.write(Event::Start(BytesStart::new(name)))
    }

    fn close(&mut self, name: &str) -> Result<(), ConvertError> {
        self.write(Event::End(BytesEnd::new(name)))
    }

    fn empty(&mut self, name: &str) -> Result<(), ConvertError> {
        check_name(name)?;
        self.write(Event::Empty(BytesStart::new(name)))
    }

    fn text(&mut self, text: &str) -> Result<(), ConvertError> {
        check_text(text)?;
        self.write(Event::Text(BytesText::new(text)))
    }

    fn object(&mut self, map: &Map<String, Value>) -> Result<(), ConvertError> {
        for (key, value) in map {
            self.element(key, value)?;
        }
        Ok(())
    }

    /// Emits `value` under `name`. Arrays repeat the element once per entry.
    fn element(&mut self, name: &str, value: &Value) -> Result<(), ConvertError> {
        match value {
            Value::Array(items) => {
                for item in items {
                    match item {
                        Value::Array(inner) => {
                            self.open(name)?;
                            self.anonymous_array(inner)?;
                            self.close(name)?;
                        }
                        other => self.element(name, other)?,
                    }
                }
                Ok(())
            }
            Value::Object(map) => {
                self.open(name)?;
                self.object(map)?;
                self.close(name)
            }
            Value::String(s) if s.is_empty() => self.empty(name),
            Value::String(s) => self.leaf(name, s),
            Value::Number(n) => self.leaf(name, &n.to_string()),
            Value::Bool(b) => self.leaf(name, &b.to_string()),
            Value::Null => self.leaf(name, "null"),
        }
    }

    fn leaf(&mut self, name: &str, text: &str) -> Result<(), ConvertError> {
        self.open(name)?;
        self.text(text)?;
        self.close(name)
    }

    /// Entries of an array without a key of their own.
    fn anonymous_array(&mut self, items: &[Value]) -> Result<(), ConvertError> {
        let options = self.options;
        let name = options.nested_array_element.as_str();
        for item in items {
            match item {
                Value::Array(inner) => {
                    self.open(name)?;
                    self.anonymous_array(inner)?;
                    self.close(name)?;
                }
                other => self.element(name, other)?,
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<String, ConvertError> {
        String::from_utf8(self.writer.into_inner()).map_err(|e| ConvertError::Render(e.to_string()))
    }
}
