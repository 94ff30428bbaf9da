//! quick-xml driven parser that fills an [`XmlDocument`] arena.
//!
//! Every event is stored together with the exact text it was read from, so
//! the writer can reproduce untouched content byte-for-byte. Start tags are
//! additionally scanned by hand to record their [`AttributeLayout`].

use crate::document::{
    Attribute, Closing, ElementData, NodeData, NodeId, NodeInfo, NodeKind, QName, XmlDocument,
};
use crate::error::{Error, Result};
use crate::preserve::{AttributeLayout, AttributeToken};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use xdt_source_map::{FileId, FileInformation};

/// Where the text being parsed sits in the file it came from.
///
/// A whole document uses zero offsets. A fragment re-parsed while cloning is
/// shifted so that its nodes report the coordinates of the template.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ParseOrigin {
    pub file_id: FileId,
    pub offset_base: usize,
    pub line_offset: usize,
    /// Applied to columns on the first line only.
    pub column_offset: usize,
    pub original: bool,
}

impl ParseOrigin {
    pub fn document(file_id: FileId, offset_base: usize) -> Self {
        ParseOrigin {
            file_id,
            offset_base,
            line_offset: 0,
            column_offset: 0,
            original: true,
        }
    }

    pub fn detached(file_id: FileId) -> Self {
        ParseOrigin {
            file_id,
            offset_base: 0,
            line_offset: 0,
            column_offset: 0,
            original: false,
        }
    }
}

/// Parse a complete document.
pub(crate) fn parse_document(content: &str, file_id: FileId) -> Result<XmlDocument> {
    let (content, bom) = match content.strip_prefix('\u{feff}') {
        Some(rest) => (rest, true),
        None => (content, false),
    };
    let offset_base = if bom { '\u{feff}'.len_utf8() } else { 0 };

    let mut doc = XmlDocument::new(file_id);
    doc.bom = bom;

    let document_node = doc.document_node();
    let mut parser = XmlParser::new(content, ParseOrigin::document(file_id, offset_base));
    let top_level = parser.parse_into(&mut doc, Some(document_node))?;

    let mut roots = top_level.into_iter().filter(|n| doc.is_element(*n));
    if roots.next().is_none() {
        return Err(Error::EmptyDocument);
    }
    if let Some(second) = roots.next() {
        let info = doc.info(second).copied();
        return Err(Error::MultipleRoots {
            line: info.map_or(0, |i| i.line),
            column: info.map_or(0, |i| i.column),
            offset: info.map_or(0, |i| i.offset),
        });
    }

    tracing::debug!(
        file_id = file_id.0,
        layouts = doc.layouts().len(),
        "Parsed XML document"
    );

    Ok(doc)
}

/// Parse a fragment into `doc` as detached nodes and return the top-level ones.
pub(crate) fn parse_fragment(
    doc: &mut XmlDocument,
    content: &str,
    origin: ParseOrigin,
) -> Result<Vec<NodeId>> {
    let mut parser = XmlParser::new(content, origin);
    parser.parse_into(doc, None)
}

/// Internal parser state.
struct XmlParser<'a> {
    /// The text being parsed.
    source: &'a str,

    /// The quick-xml reader.
    reader: Reader<&'a [u8]>,

    /// Line index of `source`.
    file_info: FileInformation,

    origin: ParseOrigin,

    /// Elements whose end tag has not been seen yet.
    stack: Vec<NodeId>,
}

impl<'a> XmlParser<'a> {
    fn new(source: &'a str, origin: ParseOrigin) -> Self {
        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;

        Self {
            source,
            reader,
            file_info: FileInformation::new(source),
            origin,
            stack: Vec::new(),
        }
    }

    fn parse_into(&mut self, doc: &mut XmlDocument, container: Option<NodeId>) -> Result<Vec<NodeId>> {
        let mut top_level = Vec::new();

        loop {
            // Events are contiguous, so the positions around each event
            // delimit its raw text exactly.
            let event_start = self.reader.buffer_position() as usize;

            let event = match self.reader.read_event() {
                Ok(event) => event,
                Err(e) => {
                    let position = self.reader.error_position() as usize;
                    return Err(self.malformed(position, e.to_string()));
                }
            };

            let event_end = self.reader.buffer_position() as usize;
            let raw = self
                .source
                .get(event_start..event_end)
                .ok_or_else(|| self.malformed(event_start, "event does not start on a character boundary"))?;

            let node = match event {
                Event::Start(e) => {
                    let id = self.start_element(doc, &e, raw, event_start, Closing::Explicit(String::new()))?;
                    self.attach(doc, container, &mut top_level, id);
                    self.stack.push(id);
                    continue;
                }
                Event::Empty(e) => self.start_element(doc, &e, raw, event_start, Closing::SelfClosing)?,
                Event::End(_) => {
                    let Some(open) = self.stack.pop() else {
                        return Err(self.malformed(event_start, "unexpected end tag"));
                    };
                    doc.set_closing(open, Closing::Explicit(raw.to_string()));
                    continue;
                }
                Event::Text(_) => self.raw_node(doc, NodeKind::Text(raw.to_string())),
                Event::CData(_) => self.raw_node(doc, NodeKind::CData(raw.to_string())),
                Event::Comment(_) => self.raw_node(doc, NodeKind::Comment(raw.to_string())),
                Event::PI(_) => self.raw_node(doc, NodeKind::ProcessingInstruction(raw.to_string())),
                Event::Decl(_) => self.raw_node(doc, NodeKind::Declaration(raw.to_string())),
                Event::DocType(_) => self.raw_node(doc, NodeKind::DocType(raw.to_string())),
                Event::Eof => break,
            };

            self.attach(doc, container, &mut top_level, node);
        }

        if let Some(open) = self.stack.last() {
            let name = doc.name(*open).map(|n| n.to_string()).unwrap_or_default();
            return Err(self.malformed(
                self.source.len(),
                format!("unexpected end of input: element <{}> is not closed", name),
            ));
        }

        Ok(top_level)
    }

    fn attach(
        &self,
        doc: &mut XmlDocument,
        container: Option<NodeId>,
        top_level: &mut Vec<NodeId>,
        node: NodeId,
    ) {
        match (self.stack.last(), container) {
            (Some(parent), _) => doc.append_child(*parent, node),
            (None, Some(container)) => {
                doc.append_child(container, node);
                top_level.push(node);
            }
            (None, None) => top_level.push(node),
        }
    }

    fn raw_node(&self, doc: &mut XmlDocument, kind: NodeKind) -> NodeId {
        doc.push_node(NodeData::new(kind, None, self.origin.original))
    }

    fn start_element(
        &self,
        doc: &mut XmlDocument,
        e: &BytesStart<'_>,
        raw: &str,
        event_start: usize,
        closing: Closing,
    ) -> Result<NodeId> {
        // Let quick-xml reject duplicate or unquoted attributes first.
        for attr in e.attributes() {
            attr.map_err(|err| self.malformed(event_start, err.to_string()))?;
        }

        let qualified = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let name_start = event_start + 1;

        let scanned = scan_start_tag(raw, qualified.len())
            .map_err(|(at, message)| self.malformed(event_start + at, message))?;

        let (tokens, positions): (Vec<AttributeToken>, Vec<usize>) = scanned.into_iter().unzip();

        let attributes = tokens
            .iter()
            .zip(&positions)
            .map(|(token, at)| Attribute {
                name: QName::parse(&token.name),
                value: token.value.clone(),
                info: Some(self.node_info(event_start + at)),
            })
            .collect();

        let layout = AttributeLayout {
            gaps: tag_gaps(raw, qualified.len(), &tokens),
            tokens,
        };

        let info = self.node_info(name_start);
        let node = doc.push_node(NodeData::new(
            NodeKind::Element(ElementData {
                name: QName::parse(&qualified),
                attributes,
                closing,
            }),
            Some(NodeInfo {
                offset: self.origin.offset_base + event_start,
                ..info
            }),
            self.origin.original,
        ));

        doc.layouts.record(node, layout);
        Ok(node)
    }

    /// Location of a byte offset of `source`, shifted by the origin.
    fn node_info(&self, offset: usize) -> NodeInfo {
        let location = self
            .file_info
            .offset_to_location(offset, self.source)
            .unwrap_or_default();
        let column_shift = if location.row == 0 {
            self.origin.column_offset
        } else {
            0
        };
        NodeInfo {
            file_id: self.origin.file_id,
            offset: self.origin.offset_base + offset,
            line: location.row + 1 + self.origin.line_offset,
            column: location.column + 1 + column_shift,
        }
    }

    fn malformed(&self, offset: usize, message: impl Into<String>) -> Error {
        let offset = offset.min(self.source.len());
        let info = self.node_info(offset);
        Error::MalformedXml {
            line: info.line,
            column: info.column,
            offset: info.offset,
            message: message.into(),
        }
    }
}

/// Body of a start tag between the name and `>` or `/>`.
fn tag_body(raw: &str, name_len: usize) -> &str {
    let inner = raw.strip_suffix('>').unwrap_or(raw);
    let inner = inner.strip_suffix('/').unwrap_or(inner);
    inner.get(1 + name_len..).unwrap_or("")
}

/// Scan the attributes of a raw start tag.
///
/// Returns every attribute token with the byte offset of its name in `raw`.
/// Errors carry the offset in `raw` where scanning stopped.
fn scan_start_tag(
    raw: &str,
    name_len: usize,
) -> std::result::Result<Vec<(AttributeToken, usize)>, (usize, String)> {
    let body = tag_body(raw, name_len);
    let body_start = 1 + name_len;
    let bytes = body.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    let skip_ws = |mut pos: usize| {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        pos
    };

    loop {
        pos = skip_ws(pos);
        if pos >= bytes.len() {
            break;
        }

        let name_start = pos;
        while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() && bytes[pos] != b'=' {
            pos += 1;
        }
        let name = &body[name_start..pos];

        pos = skip_ws(pos);
        if bytes.get(pos) != Some(&b'=') {
            return Err((body_start + pos, format!("expected `=` after attribute `{}`", name)));
        }
        pos = skip_ws(pos + 1);

        let quote = match bytes.get(pos) {
            Some(b'"') => '"',
            Some(b'\'') => '\'',
            _ => {
                return Err((
                    body_start + pos,
                    format!("expected a quoted value for attribute `{}`", name),
                ));
            }
        };
        let value_start = pos + 1;
        let Some(value_len) = body[value_start..].find(quote) else {
            return Err((
                body_start + pos,
                format!("unterminated value for attribute `{}`", name),
            ));
        };
        let value_end = value_start + value_len;
        pos = value_end + 1;

        let raw_value = &body[value_start..value_end];
        let value = quick_xml::escape::unescape(raw_value)
            .map_err(|e| (body_start + value_start, e.to_string()))?
            .into_owned();

        tokens.push((
            AttributeToken {
                name: name.to_string(),
                raw: body[name_start..pos].to_string(),
                value_start: value_start - name_start,
                quote,
                value,
            },
            body_start + name_start,
        ));
    }

    Ok(tokens)
}

/// The whitespace runs around the attribute tokens of a start tag.
fn tag_gaps(raw: &str, name_len: usize, tokens: &[AttributeToken]) -> Vec<String> {
    let body = tag_body(raw, name_len);
    let mut gaps = Vec::with_capacity(tokens.len() + 1);
    let mut rest = body;
    for token in tokens {
        let at = rest.find(token.raw.as_str()).unwrap_or(0);
        gaps.push(rest[..at].to_string());
        rest = &rest[at + token.raw.len()..];
    }
    gaps.push(rest.to_string());
    gaps
}
