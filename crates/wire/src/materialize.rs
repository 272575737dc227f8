//! Record materialization.
//!
//! Walks a parsed [`Document`] and a target type's descriptors, filling
//! records field by field. Matching is a case-sensitive exact comparison of
//! the wire label against the descriptor's wire name; the first matching
//! field wins and is consumed, later duplicates are left over. A miss leaves
//! the record field at its zero value. Leftover wire fields are reported at
//! debug level and never fail the operation.
//!
//! An `error` sentinel aborts materialization with [`WireError::Remote`];
//! `nodata` yields an empty result instead of an error.

use crate::error::{Result, WireError};
use crate::record::Record;
use crate::tree::{Document, FieldLabel, GenericRow, SentinelKind};

/// Materializes every row of a document into a collection, in row order.
pub fn from_document<T: Record>(document: Document) -> Result<Vec<T>> {
    match document {
        Document::Sentinel(sentinel) => match sentinel.kind {
            SentinelKind::NoData => Ok(Vec::new()),
            SentinelKind::Error => Err(WireError::Remote {
                kind: sentinel.kind,
                code: sentinel.code,
                message: sentinel.message,
            }),
        },
        Document::Rows(rows) => rows.into_iter().map(from_row).collect(),
    }
}

/// Materializes only the first row of a document, or `None` when the
/// document carries no rows (including the `nodata` sentinel).
pub fn first_from_document<T: Record>(document: Document) -> Result<Option<T>> {
    match document {
        Document::Sentinel(sentinel) => match sentinel.kind {
            SentinelKind::NoData => Ok(None),
            SentinelKind::Error => Err(WireError::Remote {
                kind: sentinel.kind,
                code: sentinel.code,
                message: sentinel.message,
            }),
        },
        Document::Rows(rows) => match rows.into_iter().next() {
            Some(row) => Ok(Some(from_row(row)?)),
            None => Ok(None),
        },
    }
}

/// Materializes a single row.
pub fn from_row<T: Record>(row: GenericRow) -> Result<T> {
    let mut record = T::default();
    fill_from_fields(&mut record, row.fields)?;
    Ok(record)
}

/// Fills a record from a field list, consuming matched fields.
pub fn fill_from_fields<T: Record>(record: &mut T, mut fields: Vec<FieldLabel>) -> Result<()> {
    for descriptor in T::descriptors() {
        if let Some(field) = take_first(&mut fields, descriptor.wire_name) {
            record.absorb(descriptor.wire_name, &field)?;
        }
    }
    for leftover in &fields {
        tracing::debug!(
            label = %leftover.label,
            value = %leftover.value,
            "wire field not consumed by any record field"
        );
    }
    Ok(())
}

fn take_first(fields: &mut Vec<FieldLabel>, label: &str) -> Option<FieldLabel> {
    let index = fields.iter().position(|f| f.label == label)?;
    Some(fields.remove(index))
}

/// Coercions from raw wire values into record field types.
///
/// The upstream wire format is loosely typed, so scalar parse failures are
/// substituted, not surfaced: a non-empty unparsable value becomes 1 (or
/// 1.0 / true) and an empty one becomes the zero value. Timestamps are the
/// exception: a value matching neither accepted format is a hard
/// [`WireError::TimeFormat`].
pub mod coerce {
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

    use crate::error::{Result, WireError};
    use crate::record::Record;
    use crate::tree::FieldLabel;

    /// Direct copy of the raw value.
    pub fn text(field: &FieldLabel) -> String {
        field.value.clone()
    }

    /// Base-10 integer; unparsable non-empty → 1, empty → 0.
    pub fn int(field: &FieldLabel) -> i64 {
        match field.value.parse::<i64>() {
            Ok(value) => value,
            Err(_) if field.value.is_empty() => 0,
            Err(_) => 1,
        }
    }

    /// Float; unparsable non-empty → 1.0, empty → 0.0.
    pub fn float(field: &FieldLabel) -> f64 {
        match field.value.parse::<f64>() {
            Ok(value) => value,
            Err(_) if field.value.is_empty() => 0.0,
            Err(_) => 1.0,
        }
    }

    /// Boolean literal tokens; unparsable non-empty → true, empty → false.
    pub fn boolean(field: &FieldLabel) -> bool {
        match field.value.as_str() {
            "1" | "t" | "T" | "TRUE" | "true" | "True" => true,
            "0" | "f" | "F" | "FALSE" | "false" | "False" => false,
            "" => false,
            _ => true,
        }
    }

    /// Timestamp in `YYYY-MM-DD HH:MM:SS`, falling back to date-only
    /// `YYYY-MM-DD` at midnight.
    pub fn timestamp(field: &FieldLabel) -> Result<NaiveDateTime> {
        if let Ok(value) = NaiveDateTime::parse_from_str(&field.value, "%Y-%m-%d %H:%M:%S") {
            return Ok(value);
        }
        if let Ok(date) = NaiveDate::parse_from_str(&field.value, "%Y-%m-%d") {
            return Ok(date.and_time(NaiveTime::MIN));
        }
        Err(WireError::TimeFormat {
            value: field.value.clone(),
        })
    }

    /// Nested record from the field's first group occurrence; a field
    /// without groups yields the zero record.
    pub fn nested<T: Record>(field: &FieldLabel) -> Result<T> {
        let mut record = T::default();
        if let Some(group) = field.groups.first() {
            super::fill_from_fields(&mut record, group.fields.clone())?;
        }
        Ok(record)
    }

    /// One record per group occurrence, in occurrence order.
    pub fn list<T: Record>(field: &FieldLabel) -> Result<Vec<T>> {
        let mut records = Vec::with_capacity(field.groups.len());
        for group in &field.groups {
            let mut record = T::default();
            super::fill_from_fields(&mut record, group.fields.clone())?;
            records.push(record);
        }
        Ok(records)
    }
}
