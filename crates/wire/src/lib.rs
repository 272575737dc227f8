//! # crmwire
//!
//! Bidirectional marshaling between strongly-typed records and the legacy
//! CRM record-API wire dialect: a loosely-schematized XML format of numbered
//! rows, labeled `FL` fields, and nested repeated groups, plus the sibling
//! query-string encoding that shares the same field annotations.
//!
//! ## Architecture
//!
//! - **Parse layer**: a streaming pull-parser over quick-xml events with
//!   one-subtree lookahead, producing a generic [`Document`] tree and
//!   short-circuiting on the wire's `error`/`nodata` sentinels.
//! - **Record layer**: `#[derive(Record)]` / `#[derive(UrlOptions)]`
//!   generate a per-type capability table from `#[wire("...")]` annotations;
//!   the materializer, serializer, and query encoder walk it generically.
//! - **Encode layer**: rows render back to wire bytes through quick-xml
//!   events; options render to an ordered, form-encoded query string with
//!   the protocol's fixed trailing markers.
//!
//! ## Wire mapping
//!
//! | Typed value | Wire pattern |
//! |-------------|--------------|
//! | record | `<row no="1">…</row>` |
//! | `String`/`i64`/`f64`/`bool` field | `<FL val="Label">value</FL>` |
//! | `Option<NaiveDateTime>` field | `<FL val="Label">2019-03-07 04:05:09</FL>` |
//! | `Vec<T: Record>` field | `<FL val="Label"><item no="1">…</item><item no="2">…</item></FL>` |
//! | nested `T: Record` field | `<FL val="Label"><item no="1">…</item></FL>` |
//! | remote failure | `<error><code>4600</code><message>…</message></error>` |
//! | remote empty result | `<nodata><code>4422</code><message>…</message></nodata>` |
//!
//! ## Examples
//!
//! ```ignore
//! use crmwire::{Record, UrlOptions};
//!
//! #[derive(Debug, Default, Record)]
//! struct Lead {
//!     #[wire("LEADID")]
//!     id: String,
//!     #[wire("Company,required")]
//!     company: String,
//! }
//!
//! // Decode a response body.
//! let leads: Vec<Lead> = crmwire::decode_rows(&body)?;
//!
//! // Encode an outbound body and its query options.
//! let xml = crmwire::encode_records("Leads", &leads)?;
//! let query = crmwire::encode_options(&options)?;
//! ```
//!
//! Parsing, materializing, serializing, and encoding are pure synchronous
//! transformations with no shared mutable state; the only memoized state is
//! the per-type descriptor table, which is derived deterministically and is
//! safe to race. Transport, authentication, and retry policy live with the
//! caller.

pub mod descriptor;
pub mod error;
pub mod materialize;
pub mod parse;
pub mod query;
pub mod record;
pub mod serialize;
pub mod tree;

pub use descriptor::FieldDescriptor;
pub use error::{Result, WireError};
pub use parse::{parse_document, parse_document_bytes};
pub use query::{ParamValue, QueryPairs, encode_options};
pub use record::{Payload, Record, UrlOptions};
pub use serialize::encode_records;
pub use tree::{Document, FieldLabel, GenericRow, NestedGroup, Sentinel, SentinelKind};

// Derive macros implementing the capability traits above.
pub use crmwire_macro::{Record, UrlOptions};

/// Parses a response body and materializes every row, in row order. A
/// `nodata` sentinel yields an empty collection; an `error` sentinel yields
/// [`WireError::Remote`].
pub fn decode_rows<T: record::Record>(xml: &str) -> Result<Vec<T>> {
    materialize::from_document(parse::parse_document(xml)?)
}

/// Parses a response body and materializes the first row only, or `None`
/// when the document carries no rows.
pub fn decode_first<T: record::Record>(xml: &str) -> Result<Option<T>> {
    materialize::first_from_document(parse::parse_document(xml)?)
}
