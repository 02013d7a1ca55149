//! Span-preserving XML element tree.
//!
//! Only the element structure is materialised; every element records the
//! byte ranges of its start and end tags so that callers can splice edits into
//! the original text and leave everything else (whitespace, comments,
//! attribute formatting) untouched.

use once_cell::sync::Lazy;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use std::ops::Range;

static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment regex is valid"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    /// Span of the start tag, or of the whole tag when self-closing.
    pub open: Range<usize>,
    /// Span of the end tag; `None` for self-closing elements.
    pub close: Option<Range<usize>>,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    fn new(name: &str, open: Range<usize>) -> Self {
        Self {
            name: name.to_string(),
            open,
            close: None,
            children: Vec::new(),
        }
    }

    /// Full span from `<name` to the end of `</name>`.
    pub fn outer(&self) -> Range<usize> {
        let end = self.close.as_ref().map(|c| c.end).unwrap_or(self.open.end);
        self.open.start..end
    }

    /// Span between the start and end tags (empty for self-closing elements).
    pub fn inner(&self) -> Range<usize> {
        match &self.close {
            Some(close) => self.open.end..close.start,
            None => self.open.end..self.open.end,
        }
    }

    pub fn is_self_closing(&self) -> bool {
        self.close.is_none()
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Follows a path of direct children, e.g. `["parent", "artifactId"]`.
    pub fn find(&self, path: &[&str]) -> Option<&XmlElement> {
        let mut current = self;
        for segment in path {
            current = current.child(segment)?;
        }
        Some(current)
    }

    /// Trimmed, unescaped text content of a leaf element.
    pub fn text(&self, source: &str) -> Option<String> {
        if !self.children.is_empty() {
            return None;
        }
        let raw = &source[self.inner()];
        let without_comments = COMMENT.replace_all(raw, "");
        let trimmed = without_comments
            .trim()
            .trim_start_matches("<![CDATA[")
            .trim_end_matches("]]>");
        Some(unescape(trimmed))
    }

    /// Text of the direct child `name`, if present and non-empty.
    pub fn child_text(&self, source: &str, name: &str) -> Option<String> {
        self.child(name)
            .and_then(|c| c.text(source))
            .filter(|t| !t.is_empty())
    }
}

/// Parses `source` into its root element.
pub fn parse(source: &str) -> Result<XmlElement, String> {
    let mut reader = Reader::from_str(source);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let start = reader.buffer_position() as usize;
        let event = reader
            .read_event()
            .map_err(|e| format!("{} at byte {}", e, reader.error_position()))?;
        let span = start..reader.buffer_position() as usize;

        match event {
            Event::Start(tag) => stack.push(XmlElement::new(&start_name(&tag)?, span)),
            Event::Empty(tag) => attach(&mut stack, &mut root, XmlElement::new(&start_name(&tag)?, span))?,
            Event::End(tag) => {
                let name = end_name(&tag)?;
                let mut element = stack
                    .pop()
                    .ok_or_else(|| format!("unexpected closing tag </{}> at byte {}", name, span.start))?;
                if element.name != name {
                    return Err(format!(
                        "mismatched closing tag </{}> for <{}> at byte {}",
                        name, element.name, span.start
                    ));
                }
                element.close = Some(span);
                attach(&mut stack, &mut root, element)?;
            }
            Event::Eof => break,
            // text, comments, processing instructions, CDATA, doctype
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(format!("unclosed element <{}>", open.name));
    }
    root.ok_or_else(|| "document has no root element".to_string())
}

fn start_name(tag: &BytesStart) -> Result<String, String> {
    String::from_utf8(tag.name().as_ref().to_vec()).map_err(|e| format!("invalid element name: {}", e))
}

fn end_name(tag: &BytesEnd) -> Result<String, String> {
    String::from_utf8(tag.name().as_ref().to_vec()).map_err(|e| format!("invalid element name: {}", e))
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) -> Result<(), String> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(element);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(format!("multiple root elements (second is <{}>)", element.name)),
    }
}

pub fn escape(text: &str) -> String {
    quick_xml::escape::escape(text).into_owned()
}

/// Resolves entity references; text with a malformed reference is kept as is.
pub fn unescape(text: &str) -> String {
    match quick_xml::escape::unescape(text) {
        Ok(unescaped) => unescaped.into_owned(),
        Err(_) => text.to_string(),
    }
}
