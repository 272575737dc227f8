//! Generic tree parser.
//!
//! Streams XML events into a [`Document`] in a single pass. The grammar is
//! loose: an optional `response`/`result` wrapper, a module-named element,
//! `row` elements holding `FL` fields, and, inside a field's content,
//! optionally repeated group elements holding further `FL` fields. Two
//! sentinel elements, `error` and `nodata`, replace row content entirely and
//! terminate parsing the moment they are seen.
//!
//! The dialect does not declare cardinality up front, so an `FL` is
//! disambiguated by lookahead: the parser peeks at the first meaningful child
//! event through an owned-event replay buffer. A start element other than
//! `FL` opens a repeating nested group scoped to the field; character data
//! makes the field a leaf.
//!
//! Unknown elements outside the grammar are skipped whole, keeping the parser
//! forward-compatible. Abrupt end of input inside any open structure is a
//! fatal [`WireError::Malformed`]; no recovery is attempted.

use std::collections::VecDeque;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, BytesText, Event};

use crate::error::{Result, WireError};
use crate::tree::{Document, FieldLabel, GenericRow, NestedGroup, Sentinel, SentinelKind};

/// Parses a wire document from a string.
pub fn parse_document(xml: &str) -> Result<Document> {
    TreeParser::new(xml).parse()
}

/// Parses a wire document from raw response bytes.
pub fn parse_document_bytes(bytes: &[u8]) -> Result<Document> {
    let xml = std::str::from_utf8(bytes)
        .map_err(|e| WireError::Malformed(format!("invalid UTF-8: {e}")))?;
    parse_document(xml)
}

/// Pull parser over quick-xml events with a replay buffer for lookahead.
struct TreeParser<'a> {
    reader: Reader<&'a [u8]>,
    buf: Vec<u8>,
    /// Events peeked but not yet consumed.
    peeked: VecDeque<Event<'static>>,
}

impl<'a> TreeParser<'a> {
    fn new(xml: &'a str) -> Self {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);
        TreeParser {
            reader,
            buf: Vec::new(),
            peeked: VecDeque::new(),
        }
    }

    fn read_raw(&mut self) -> Result<Event<'static>> {
        self.buf.clear();
        match self.reader.read_event_into(&mut self.buf) {
            Ok(event) => Ok(event.into_owned()),
            Err(e) => Err(WireError::Malformed(format!("invalid token stream: {e}"))),
        }
    }

    /// Next event, consuming the replay buffer first.
    fn next_event(&mut self) -> Result<Event<'static>> {
        if let Some(event) = self.peeked.pop_front() {
            return Ok(event);
        }
        self.read_raw()
    }

    /// Next event without consuming it.
    fn peek_event(&mut self) -> Result<&Event<'static>> {
        if self.peeked.is_empty() {
            let event = self.read_raw()?;
            self.peeked.push_back(event);
        }
        match self.peeked.front() {
            Some(event) => Ok(event),
            None => Err(WireError::Malformed("event buffer underflow".into())),
        }
    }

    fn parse(mut self) -> Result<Document> {
        let mut rows: Vec<GenericRow> = Vec::new();
        // The module wrapper is the first unrecognized start element after
        // any response/result wrapper; its close ends the document.
        let mut module: Option<Vec<u8>> = None;

        loop {
            let event = self.next_event()?;
            match event {
                Event::Start(e) => match e.name().as_ref() {
                    b"response" | b"result" => {}
                    b"error" => {
                        return Ok(Document::Sentinel(
                            self.read_sentinel(SentinelKind::Error, b"error")?,
                        ));
                    }
                    b"nodata" => {
                        return Ok(Document::Sentinel(
                            self.read_sentinel(SentinelKind::NoData, b"nodata")?,
                        ));
                    }
                    b"row" => {
                        let row = self.read_row(rows.len() + 1)?;
                        rows.push(row);
                    }
                    name => {
                        if module.is_none() {
                            module = Some(name.to_vec());
                        } else {
                            tracing::debug!(
                                element = %String::from_utf8_lossy(name),
                                "skipping unrecognized element"
                            );
                            self.skip_subtree()?;
                        }
                    }
                },
                Event::Empty(e) => match e.name().as_ref() {
                    b"row" => rows.push(GenericRow::new(rows.len() + 1)),
                    b"error" => {
                        return Ok(Document::Sentinel(Sentinel {
                            kind: SentinelKind::Error,
                            code: 0,
                            message: String::new(),
                        }));
                    }
                    b"nodata" => {
                        return Ok(Document::Sentinel(Sentinel {
                            kind: SentinelKind::NoData,
                            code: 0,
                            message: String::new(),
                        }));
                    }
                    _ => {}
                },
                Event::End(e) => {
                    let name = e.name();
                    let name = name.as_ref();
                    if name == b"response" || name == b"result" {
                        break;
                    }
                    if module.as_deref() == Some(name) {
                        break;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(Document::Rows(rows))
    }

    fn read_row(&mut self, no: usize) -> Result<GenericRow> {
        let mut row = GenericRow::new(no);
        loop {
            let event = self.next_event()?;
            match event {
                Event::Start(e) => {
                    if e.name().as_ref() == b"FL" {
                        let field = self.read_field(&e)?;
                        merge_into_row(&mut row, field);
                    } else {
                        self.skip_subtree()?;
                    }
                }
                Event::Empty(e) => {
                    if e.name().as_ref() == b"FL" {
                        let label = attr_value(&e, b"val")?.unwrap_or_default();
                        row.push(FieldLabel::text(label, ""));
                    }
                }
                Event::End(e) if e.name().as_ref() == b"row" => return Ok(row),
                Event::End(_) => {
                    return Err(WireError::Malformed(
                        "unexpected closing tag inside a row".into(),
                    ));
                }
                Event::Eof => {
                    return Err(WireError::Malformed("document ended inside a row".into()));
                }
                _ => {}
            }
        }
    }

    /// True when the field's content opens a nested group rather than
    /// character data. Peeks without consuming; comments and processing
    /// instructions are discarded as insignificant.
    fn peeks_at_group(&mut self) -> Result<bool> {
        loop {
            match self.peek_event()? {
                Event::Start(e) | Event::Empty(e) => return Ok(e.name().as_ref() != b"FL"),
                Event::Comment(_) | Event::PI(_) => {
                    self.next_event()?;
                }
                _ => return Ok(false),
            }
        }
    }

    fn read_field(&mut self, start: &BytesStart<'_>) -> Result<FieldLabel> {
        let label = attr_value(start, b"val")?.unwrap_or_default();
        let mut field = FieldLabel::text(label, "");

        if self.peeks_at_group()? {
            // Group-bearing field: every child element is one occurrence,
            // numbered densely from 1 in wire order.
            loop {
                let event = self.next_event()?;
                match event {
                    Event::Start(child) => {
                        if child.name().as_ref() == b"FL" {
                            self.skip_subtree()?;
                            continue;
                        }
                        let name = String::from_utf8_lossy(child.name().as_ref()).into_owned();
                        let fields = self.read_group_fields(&name)?;
                        let no = field.groups.len() + 1;
                        field.groups.push(NestedGroup { name, no, fields });
                    }
                    Event::Empty(child) => {
                        if child.name().as_ref() == b"FL" {
                            continue;
                        }
                        let name = String::from_utf8_lossy(child.name().as_ref()).into_owned();
                        let no = field.groups.len() + 1;
                        field.groups.push(NestedGroup {
                            name,
                            no,
                            fields: Vec::new(),
                        });
                    }
                    Event::End(e) if e.name().as_ref() == b"FL" => return Ok(field),
                    Event::End(_) => {
                        return Err(WireError::Malformed(
                            "unexpected closing tag inside a field".into(),
                        ));
                    }
                    Event::Eof => {
                        return Err(WireError::Malformed(
                            "document ended inside a field".into(),
                        ));
                    }
                    _ => {}
                }
            }
        }

        // Leaf field: collect character data until the close.
        loop {
            let event = self.next_event()?;
            match event {
                Event::Text(t) => field.value.push_str(&decode_text(&t)?),
                Event::CData(c) => field
                    .value
                    .push_str(&String::from_utf8_lossy(&c.into_inner())),
                Event::Start(_) => self.skip_subtree()?,
                Event::End(e) if e.name().as_ref() == b"FL" => return Ok(field),
                Event::End(_) => {
                    return Err(WireError::Malformed(
                        "unexpected closing tag inside a field".into(),
                    ));
                }
                Event::Eof => {
                    return Err(WireError::Malformed("document ended inside a field".into()));
                }
                _ => {}
            }
        }
    }

    fn read_group_fields(&mut self, group: &str) -> Result<Vec<FieldLabel>> {
        let mut fields = Vec::new();
        loop {
            let event = self.next_event()?;
            match event {
                Event::Start(e) if e.name().as_ref() == b"FL" => {
                    fields.push(self.read_field(&e)?);
                }
                Event::Start(_) => self.skip_subtree()?,
                Event::Empty(e) if e.name().as_ref() == b"FL" => {
                    let label = attr_value(&e, b"val")?.unwrap_or_default();
                    fields.push(FieldLabel::text(label, ""));
                }
                Event::End(e) if e.name().as_ref() == group.as_bytes() => return Ok(fields),
                Event::End(_) => {
                    return Err(WireError::Malformed(
                        "unexpected closing tag inside a group".into(),
                    ));
                }
                Event::Eof => {
                    return Err(WireError::Malformed("document ended inside a group".into()));
                }
                _ => {}
            }
        }
    }

    /// Decodes a sentinel element fully; the caller returns immediately
    /// afterwards, discarding any rows accumulated so far.
    fn read_sentinel(&mut self, kind: SentinelKind, end: &'static [u8]) -> Result<Sentinel> {
        let mut code = 0i64;
        let mut message = String::new();
        loop {
            let event = self.next_event()?;
            match event {
                Event::Start(e) => match e.name().as_ref() {
                    b"code" => {
                        let text = self.read_element_text(b"code")?;
                        code = text.trim().parse().map_err(|_| {
                            WireError::Malformed(format!("sentinel code '{text}' is not numeric"))
                        })?;
                    }
                    b"message" => message = self.read_element_text(b"message")?,
                    _ => self.skip_subtree()?,
                },
                Event::End(e) if e.name().as_ref() == end => {
                    return Ok(Sentinel {
                        kind,
                        code,
                        message,
                    });
                }
                Event::End(_) => {
                    return Err(WireError::Malformed(
                        "unexpected closing tag inside a sentinel".into(),
                    ));
                }
                Event::Eof => {
                    return Err(WireError::Malformed(format!(
                        "document ended inside sentinel '{}'",
                        String::from_utf8_lossy(end)
                    )));
                }
                _ => {}
            }
        }
    }

    fn read_element_text(&mut self, end: &'static [u8]) -> Result<String> {
        let mut text = String::new();
        loop {
            let event = self.next_event()?;
            match event {
                Event::Text(t) => text.push_str(&decode_text(&t)?),
                Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c.into_inner())),
                Event::Start(_) => self.skip_subtree()?,
                Event::End(e) if e.name().as_ref() == end => return Ok(text),
                Event::End(_) => {
                    return Err(WireError::Malformed("unexpected closing tag".into()));
                }
                Event::Eof => {
                    return Err(WireError::Malformed(
                        "document ended inside an element".into(),
                    ));
                }
                _ => {}
            }
        }
    }

    /// Consumes the remainder of the subtree whose start event was just
    /// taken from the stream.
    fn skip_subtree(&mut self) -> Result<()> {
        let mut depth = 1usize;
        while depth > 0 {
            match self.next_event()? {
                Event::Start(_) => depth += 1,
                Event::End(_) => depth -= 1,
                Event::Eof => {
                    return Err(WireError::Malformed(
                        "document ended inside a skipped element".into(),
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// A later `FL` with the same label folds its group occurrences into the
/// field already present in the row; occurrence numbering continues densely.
fn merge_into_row(row: &mut GenericRow, field: FieldLabel) {
    if !field.groups.is_empty() {
        if let Some(existing) = row.fields.iter_mut().find(|f| f.label == field.label) {
            for mut group in field.groups {
                group.no = existing.groups.len() + 1;
                existing.groups.push(group);
            }
            return;
        }
    }
    row.push(field);
}

fn attr_value(element: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| WireError::Malformed(format!("invalid attribute: {e}")))?;
        if attr.key.as_ref() == key {
            let value = attr
                .unescape_value()
                .map_err(|e| WireError::Malformed(format!("invalid attribute value: {e}")))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn decode_text(text: &BytesText<'_>) -> Result<String> {
    text.unescape()
        .map(|cow| cow.into_owned())
        .map_err(|e| WireError::Malformed(format!("invalid character data: {e}")))
}
