use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{ReportError, Result};

/// Element boundaries of a well-formed XML document, one at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlEvent {
    Open { name: String, attributes: Attributes },
    Close { name: String },
}

/// Attributes of one opening tag, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value of the first key present, in the order given.
    pub fn first_of(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.get(key))
    }
}

/// Pull tokenizer over a byte stream. Only element boundaries surface;
/// anything that makes the document ill-formed is a `MalformedInput` error.
pub struct XmlEvents<R: BufRead> {
    source_name: String,
    reader: Reader<R>,
    buf: Vec<u8>,
    depth: usize,
    seen_root: bool,
    /// Close half of a self-closing tag
    pending_close: Option<String>,
}

impl<R: BufRead> XmlEvents<R> {
    pub fn new(source_name: impl Into<String>, input: R) -> Self {
        let mut reader = Reader::from_reader(input);
        reader.trim_text(true);
        Self {
            source_name: source_name.into(),
            reader,
            buf: Vec::new(),
            depth: 0,
            seen_root: false,
            pending_close: None,
        }
    }

    /// `Ok(None)` once the document has ended cleanly.
    pub fn next_event(&mut self) -> Result<Option<XmlEvent>> {
        if let Some(name) = self.pending_close.take() {
            self.depth -= 1;
            return Ok(Some(XmlEvent::Close { name }));
        }

        loop {
            self.buf.clear();
            let event = self
                .reader
                .read_event_into(&mut self.buf)
                .map_err(|e| ReportError::malformed(self.source_name.clone(), e))?;

            match event {
                Event::Start(start) => {
                    let (name, attributes) = open_tag(&self.source_name, &start)?;
                    self.enter(&name)?;
                    return Ok(Some(XmlEvent::Open { name, attributes }));
                }
                Event::Empty(start) => {
                    let (name, attributes) = open_tag(&self.source_name, &start)?;
                    self.enter(&name)?;
                    self.pending_close = Some(name.clone());
                    return Ok(Some(XmlEvent::Open { name, attributes }));
                }
                Event::End(end) => {
                    let name = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                    if self.depth == 0 {
                        return Err(ReportError::malformed(
                            self.source_name.clone(),
                            format!("closing tag </{name}> without an opening tag"),
                        ));
                    }
                    self.depth -= 1;
                    return Ok(Some(XmlEvent::Close { name }));
                }
                Event::Text(text) if self.depth == 0 => {
                    if !text.iter().all(u8::is_ascii_whitespace) {
                        return Err(ReportError::malformed(
                            self.source_name.clone(),
                            "content is not allowed outside the root element",
                        ));
                    }
                }
                Event::CData(_) if self.depth == 0 => {
                    return Err(ReportError::malformed(
                        self.source_name.clone(),
                        "CDATA is not allowed outside the root element",
                    ));
                }
                Event::Eof => {
                    if self.depth > 0 {
                        return Err(ReportError::malformed(
                            self.source_name.clone(),
                            format!("unexpected end of document, {} element(s) left open", self.depth),
                        ));
                    }
                    if !self.seen_root {
                        return Err(ReportError::malformed(
                            self.source_name.clone(),
                            "premature end of file: no root element",
                        ));
                    }
                    return Ok(None);
                }
                _ => {}
            }
        }
    }

    fn enter(&mut self, name: &str) -> Result<()> {
        if self.depth == 0 && self.seen_root {
            return Err(ReportError::malformed(
                self.source_name.clone(),
                format!("<{name}> follows the root element"),
            ));
        }
        self.depth += 1;
        self.seen_root = true;
        Ok(())
    }
}

fn open_tag(source_name: &str, start: &BytesStart<'_>) -> Result<(String, Attributes)> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| ReportError::malformed(source_name, e))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| ReportError::malformed(source_name, e))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok((name, Attributes(attributes)))
}
