//! The capability traits implemented by the derive macros.
//!
//! The upstream wire dialect is driven by per-field annotations rather than a
//! self-describing data model, so the codec walks a compile-time capability
//! table instead of runtime reflection: `#[derive(Record)]` and
//! `#[derive(UrlOptions)]` generate implementations of the traits below from
//! `#[wire("...")]` field tags, and the generic materializer / serializer /
//! query encoder consume them.

use crate::descriptor::FieldDescriptor;
use crate::error::Result;
use crate::query::QueryPairs;
use crate::tree::{FieldLabel, GenericRow};

/// A typed record that marshals to and from wire rows.
///
/// Implemented via `#[derive(Record)]`; every field carries a
/// `#[wire("...")]` annotation in the descriptor grammar
/// (see [`crate::descriptor`]).
pub trait Record: Default {
    /// Raw annotation strings, one per field, declaration order.
    fn field_tags() -> &'static [&'static str];

    /// Resolved descriptors, memoized per type.
    fn descriptors() -> &'static [FieldDescriptor];

    /// Wire element name used when occurrences of this record nest inside a
    /// field. Defaults to the lowerCamelCase type name unless overridden with
    /// `#[wire(group = "...")]`.
    fn group_name() -> &'static str;

    /// Routes one wire field into the matching record field, coercing the
    /// raw value. Unrecognized wire names are ignored.
    fn absorb(&mut self, wire_name: &str, field: &FieldLabel) -> Result<()>;

    /// Appends this record's fields to a row, declaration order.
    fn emit(&self, row: &mut GenericRow) -> Result<()>;
}

/// A request-options record that encodes to query parameters.
///
/// Implemented via `#[derive(UrlOptions)]` with the same `#[wire("...")]`
/// annotation grammar as [`Record`].
pub trait UrlOptions {
    /// Raw annotation strings, one per field, declaration order.
    fn field_tags() -> &'static [&'static str];

    /// Resolved descriptors, memoized per type.
    fn descriptors() -> &'static [FieldDescriptor];

    /// Pushes one parameter per field onto `params`, applying
    /// required/default/rename rules from the descriptors.
    fn encode(&self, params: &mut QueryPairs) -> Result<()>;
}

/// A pre-assembled wire body: the value of a structured-data parameter such
/// as `xmlData`.
///
/// Holds the module element name and the stripped row set; rendering is
/// deferred until the query encoder embeds it.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    module: String,
    rows: Vec<GenericRow>,
}

impl Payload {
    /// Assembles a payload from typed records: one row per record, numbered
    /// from 1, `strip`-flagged fields removed.
    pub fn records<T: Record>(module: impl Into<String>, records: &[T]) -> Result<Self> {
        Ok(Payload {
            module: module.into(),
            rows: crate::serialize::to_rows(records)?,
        })
    }

    /// A payload over already-assembled rows.
    pub fn rows(module: impl Into<String>, rows: Vec<GenericRow>) -> Self {
        Payload {
            module: module.into(),
            rows,
        }
    }

    /// True when the payload carries no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Renders the payload to wire bytes.
    pub fn render(&self) -> Result<String> {
        crate::serialize::render(&self.module, &self.rows)
    }
}
