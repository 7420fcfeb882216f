use crate::Result;
use crate::diagnostics;
use crate::document::Element;

use anyhow::{Context, anyhow, bail};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::fs;
use std::path::Path;

/// Deepest element nesting accepted by the loader.
///
/// Every recursive walk over one document descends at most this far. Tag
/// resolution adds at most another `MAX_DEPTH` levels (checked when the
/// registry loads), which keeps a match well inside a 2 MiB thread stack.
pub const MAX_DEPTH: usize = 64;

/// Read and parse an XML file into an element tree.
pub fn parse_file(path: &Path) -> Result<Element> {
    let text = fs::read_to_string(path).with_context(|| {
        diagnostics::error_message(format!("read xml file {}", path.display()))
    })?;
    parse_str(&text).with_context(|| {
        diagnostics::error_message(format!("parse xml file {}", path.display()))
    })
}

/// Parse XML text into an element tree, recording the 1-based source line of
/// every start tag.
pub fn parse_str(text: &str) -> Result<Element> {
    let mut reader = Reader::from_str(text);
    let mut lines = LineTracker::new(text);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let pos = reader.buffer_position() as usize;
        let line = lines.line_at(pos);

        let event = reader.read_event().map_err(|err| {
            anyhow!(diagnostics::error_message(format!(
                "xml syntax error near line {}: {}",
                line, err
            )))
        })?;

        match event {
            Event::Start(start) => {
                if stack.len() >= MAX_DEPTH {
                    bail!(
                        "{}",
                        diagnostics::error_message(format!(
                            "element nesting at line {} exceeds the maximum depth of {}",
                            line, MAX_DEPTH
                        ))
                    );
                }
                stack.push(start_element(&start, line)?);
            }
            Event::Empty(start) => {
                if stack.len() >= MAX_DEPTH {
                    bail!(
                        "{}",
                        diagnostics::error_message(format!(
                            "element nesting at line {} exceeds the maximum depth of {}",
                            line, MAX_DEPTH
                        ))
                    );
                }
                let element = start_element(&start, line)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack.pop().ok_or_else(|| {
                    anyhow!(diagnostics::error_message(format!(
                        "unexpected closing tag at line {}",
                        line
                    )))
                })?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(raw) => {
                let text = raw.unescape().map_err(|err| {
                    anyhow!(diagnostics::error_message(format!(
                        "bad text content at line {}: {}",
                        line, err
                    )))
                })?;
                append_text(&mut stack, &text, line)?;
            }
            Event::CData(raw) => {
                let bytes = raw.into_inner();
                let text = std::str::from_utf8(&bytes).with_context(|| {
                    diagnostics::error_message(format!("cdata at line {} is not utf-8", line))
                })?;
                append_text(&mut stack, text, line)?;
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions and doctypes
            // carry nothing the grammars care about.
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        bail!(
            "{}",
            diagnostics::error_message(format!(
                "element <{}> opened at line {} is never closed",
                open.tag, open.line
            ))
        );
    }

    root.ok_or_else(|| anyhow!(diagnostics::error_message("document has no root element")))
}

fn start_element(start: &BytesStart<'_>, line: usize) -> Result<Element> {
    let tag = std::str::from_utf8(start.name().as_ref())
        .with_context(|| diagnostics::error_message(format!("tag name at line {}", line)))?
        .to_string();

    let mut element = Element::new(tag, line);
    for attr in start.attributes() {
        let attr = attr.with_context(|| {
            diagnostics::error_message(format!("bad attribute on <{}> at line {}", element.tag, line))
        })?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .with_context(|| diagnostics::error_message(format!("attribute name at line {}", line)))?
            .to_string();
        let value = attr
            .unescape_value()
            .with_context(|| {
                diagnostics::error_message(format!("attribute {:?} at line {}", key, line))
            })?
            .into_owned();

        if element.attributes.insert(key.clone(), value).is_some() {
            bail!(
                "{}",
                diagnostics::error_message(format!(
                    "duplicate attribute {:?} on <{}> at line {}",
                    key, element.tag, line
                ))
            );
        }
    }
    Ok(element)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        return Ok(());
    }
    if root.is_some() {
        bail!(
            "{}",
            diagnostics::error_message(format!(
                "second root element <{}> at line {}",
                element.tag, element.line
            ))
        );
    }
    *root = Some(element);
    Ok(())
}

fn append_text(stack: &mut [Element], text: &str, line: usize) -> Result<()> {
    match stack.last_mut() {
        Some(top) => {
            top.text.get_or_insert_with(String::new).push_str(text);
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => bail!(
            "{}",
            diagnostics::error_message(format!("text outside the root element at line {}", line))
        ),
    }
}

/// Maps byte offsets to line numbers. Offsets only ever grow while reading,
/// so the scan is incremental.
struct LineTracker<'a> {
    bytes: &'a [u8],
    offset: usize,
    line: usize,
}

impl<'a> LineTracker<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            bytes: text.as_bytes(),
            offset: 0,
            line: 1,
        }
    }

    fn line_at(&mut self, pos: usize) -> usize {
        let pos = pos.min(self.bytes.len());
        if pos > self.offset {
            self.line += self.bytes[self.offset..pos]
                .iter()
                .filter(|b| **b == b'\n')
                .count();
            self.offset = pos;
        }
        self.line
    }
}
