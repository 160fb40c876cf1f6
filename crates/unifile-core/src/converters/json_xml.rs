// SPDX-License-Identifier: AGPL-3.0-or-later
//! JSON to XML converter using quick-xml

use crate::config::XmlConfig;
use crate::format::FormatTag;
use crate::traits::{ensure_readable, Converter, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Maps a JSON tree onto nested XML elements under a configurable root
pub struct JsonToXmlConverter {
    root_element: String,
    item_element: String,
    indent: usize,
}

impl JsonToXmlConverter {
    pub fn new(config: &XmlConfig) -> Self {
        Self {
            root_element: element_name(&config.root_element),
            item_element: element_name(&config.item_element),
            indent: config.indent,
        }
    }

    /// Serialize `value` as an XML document
    pub fn to_xml(&self, value: &Value) -> Result<String> {
        let mut output = Vec::new();
        {
            let mut writer = if self.indent > 0 {
                Writer::new_with_indent(&mut output, b' ', self.indent)
            } else {
                Writer::new(&mut output)
            };
            writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
            self.write_element(&mut writer, &self.root_element, value)?;
        }

        let mut xml = String::from_utf8_lossy(&output).into_owned();
        xml.push('\n');
        Ok(xml)
    }

    /// Write exactly one element named `name` holding `value`
    fn write_element<W: std::io::Write>(
        &self,
        writer: &mut Writer<W>,
        name: &str,
        value: &Value,
    ) -> Result<()> {
        match value {
            Value::Null => {
                writer.write_event(Event::Empty(BytesStart::new(name)))?;
            }
            Value::Object(map) if map.is_empty() => {
                writer.write_event(Event::Empty(BytesStart::new(name)))?;
            }
            Value::Array(items) if items.is_empty() => {
                writer.write_event(Event::Empty(BytesStart::new(name)))?;
            }
            Value::Object(map) => {
                writer.write_event(Event::Start(BytesStart::new(name)))?;
                for (key, member) in map {
                    self.write_member(writer, &element_name(key), member)?;
                }
                writer.write_event(Event::End(BytesEnd::new(name)))?;
            }
            Value::Array(items) => {
                writer.write_event(Event::Start(BytesStart::new(name)))?;
                for item in items {
                    self.write_element(writer, &self.item_element, item)?;
                }
                writer.write_event(Event::End(BytesEnd::new(name)))?;
            }
            scalar => {
                let text = match scalar {
                    Value::String(s) => xml_text(s),
                    other => other.to_string(),
                };
                writer.write_event(Event::Start(BytesStart::new(name)))?;
                writer.write_event(Event::Text(BytesText::new(&text)))?;
                writer.write_event(Event::End(BytesEnd::new(name)))?;
            }
        }
        Ok(())
    }

    /// Object member: arrays repeat the member's element once per item,
    /// an empty array still yields one empty element
    fn write_member<W: std::io::Write>(
        &self,
        writer: &mut Writer<W>,
        name: &str,
        value: &Value,
    ) -> Result<()> {
        match value {
            Value::Array(items) if !items.is_empty() => {
                for item in items {
                    self.write_element(writer, name, item)?;
                }
                Ok(())
            }
            other => self.write_element(writer, name, other),
        }
    }
}

impl Default for JsonToXmlConverter {
    fn default() -> Self {
        Self::new(&XmlConfig::default())
    }
}

impl Converter for JsonToXmlConverter {
    fn name(&self) -> &str {
        "JSON to XML Converter"
    }

    fn supports(&self, from: FormatTag, to: FormatTag) -> bool {
        from == FormatTag::Json && to == FormatTag::Xml
    }

    fn convert(&self, input: &Path, output: &Path) -> Result<()> {
        ensure_readable(input)?;
        let value: Value = serde_json::from_reader(BufReader::new(File::open(input)?))?;
        let xml = self.to_xml(&value)?;
        std::fs::write(output, xml)?;
        Ok(())
    }
}

/// Drop characters outside the XML 1.0 `Char` production
fn xml_text(value: &str) -> String {
    value
        .chars()
        .filter(|&c| {
            matches!(
                c,
                '\t' | '\n' | '\r'
                    | '\u{20}'..='\u{d7ff}'
                    | '\u{e000}'..='\u{fffd}'
                    | '\u{10000}'..='\u{10ffff}'
            )
        })
        .collect()
}

/// Coerce a JSON key into a valid XML element name
fn element_name(key: &str) -> String {
    let mut name: String = key
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    match name.chars().next() {
        Some(first) if first.is_alphabetic() || first == '_' => {}
        _ => name.insert(0, '_'),
    }
    name
}
