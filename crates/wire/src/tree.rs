//! The generic document tree.
//!
//! Parsed responses and outbound request bodies share one loosely-schematized
//! shape: a sequence of numbered rows, each holding labeled fields, each field
//! optionally holding repeated nested groups. A document carries either rows
//! or a sentinel, never both; [`Document`] makes that mutual exclusion a
//! compile-time invariant.

use std::fmt;

/// One wire field: a `val` label, character content, and zero or more nested
/// group occurrences.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldLabel {
    /// The `val` attribute of the `FL` element.
    pub label: String,
    /// Character content of the element, entity references resolved.
    pub value: String,
    /// Nested group occurrences embedded in this field's content.
    pub groups: Vec<NestedGroup>,
}

impl FieldLabel {
    /// A field carrying only character content.
    pub fn text(label: impl Into<String>, value: impl Into<String>) -> Self {
        FieldLabel {
            label: label.into(),
            value: value.into(),
            groups: Vec::new(),
        }
    }

    /// A field carrying nested group occurrences and no character content.
    pub fn with_groups(label: impl Into<String>, groups: Vec<NestedGroup>) -> Self {
        FieldLabel {
            label: label.into(),
            value: String::new(),
            groups,
        }
    }
}

/// One occurrence of a repeated sub-record embedded in a field.
///
/// Occurrence numbers are 1-based and dense within the owning field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NestedGroup {
    /// Wire element name of the occurrence.
    pub name: String,
    /// 1-based occurrence number, scoped to the owning field.
    pub no: usize,
    /// The occurrence's own labeled fields.
    pub fields: Vec<FieldLabel>,
}

/// One record instance in the wire stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenericRow {
    /// Sequential row number, starting at 1.
    pub no: usize,
    /// Labeled fields in wire order.
    pub fields: Vec<FieldLabel>,
}

impl GenericRow {
    /// An empty row with the given sequence number.
    pub fn new(no: usize) -> Self {
        GenericRow {
            no,
            fields: Vec::new(),
        }
    }

    /// Appends a field.
    pub fn push(&mut self, field: FieldLabel) {
        self.fields.push(field);
    }

    /// First field with the given label, if any.
    pub fn field(&self, label: &str) -> Option<&FieldLabel> {
        self.fields.iter().find(|f| f.label == label)
    }

    /// Removes and returns the first field with the given label.
    pub fn take_field(&mut self, label: &str) -> Option<FieldLabel> {
        let index = self.fields.iter().position(|f| f.label == label)?;
        Some(self.fields.remove(index))
    }
}

/// Which sentinel element was decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentinelKind {
    /// The remote rejected the request (`error` element).
    Error,
    /// The remote had nothing to return (`nodata` element). Not a failure.
    NoData,
}

impl fmt::Display for SentinelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SentinelKind::Error => f.write_str("error"),
            SentinelKind::NoData => f.write_str("no-data"),
        }
    }
}

/// An out-of-band condition decoded from the wire in place of row data.
#[derive(Debug, Clone, PartialEq)]
pub struct Sentinel {
    /// Sentinel flavor.
    pub kind: SentinelKind,
    /// Numeric code from the `code` child element.
    pub code: i64,
    /// Text from the `message` child element.
    pub message: String,
}

/// A fully parsed wire document: row data or a sentinel, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    /// Ordinary row content.
    Rows(Vec<GenericRow>),
    /// A sentinel replaced row content entirely.
    Sentinel(Sentinel),
}

impl Document {
    /// The rows, if this document carries row data.
    pub fn rows(&self) -> Option<&[GenericRow]> {
        match self {
            Document::Rows(rows) => Some(rows),
            Document::Sentinel(_) => None,
        }
    }

    /// The sentinel, if one replaced row content.
    pub fn sentinel(&self) -> Option<&Sentinel> {
        match self {
            Document::Rows(_) => None,
            Document::Sentinel(sentinel) => Some(sentinel),
        }
    }
}
