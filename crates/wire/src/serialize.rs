//! Record serialization and wire rendering.
//!
//! The inverse of materialization: a populated record emits its fields into a
//! [`GenericRow`] in declaration order, nested records and collections become
//! [`NestedGroup`] occurrences numbered from 1, and a separate stripping pass
//! then removes every `strip`-flagged field before the row set is rendered to
//! wire bytes. Assembly never fails on missing or zero fields; required
//! enforcement belongs to the query encoder.

use std::io::Write;

use chrono::NaiveDateTime;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use crate::error::{Result, WireError};
use crate::record::Record;
use crate::tree::{FieldLabel, GenericRow, NestedGroup};

/// Assembles one pre-strip row from a record. The caller supplies the
/// 1-based position index.
pub fn to_row<T: Record>(record: &T, no: usize) -> Result<GenericRow> {
    let mut row = GenericRow::new(no);
    record.emit(&mut row)?;
    Ok(row)
}

/// Removes every field the type's descriptors flag `strip`, however the row
/// was populated.
pub fn strip_row<T: Record>(row: &mut GenericRow) {
    row.fields.retain(|field| {
        !T::descriptors()
            .iter()
            .any(|d| d.strip && d.wire_name == field.label)
    });
}

/// Assembles the full row set: one stripped row per record, numbered from 1.
pub fn to_rows<T: Record>(records: &[T]) -> Result<Vec<GenericRow>> {
    let mut rows = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let mut row = to_row(record, index + 1)?;
        strip_row::<T>(&mut row);
        rows.push(row);
    }
    Ok(rows)
}

/// One group occurrence from a nested record.
pub fn group_of<T: Record>(no: usize, record: &T) -> Result<NestedGroup> {
    let row = to_row(record, no)?;
    Ok(NestedGroup {
        name: T::group_name().to_string(),
        no,
        fields: row.fields,
    })
}

/// Group occurrences from a collection, numbered from 1 in element order.
pub fn groups_of<T: Record>(records: &[T]) -> Result<Vec<NestedGroup>> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| group_of(index + 1, record))
        .collect()
}

/// Serializes records straight to wire bytes under the given module element.
pub fn encode_records<T: Record>(module: &str, records: &[T]) -> Result<String> {
    render(module, &to_rows(records)?)
}

/// Renders assembled rows to wire bytes: the module element wrapping `row`
/// elements, `FL` fields, and nested group occurrences.
pub fn render(module: &str, rows: &[GenericRow]) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Start(BytesStart::new(module)))?;
    for row in rows {
        write_row(&mut writer, row)?;
    }
    writer.write_event(Event::End(BytesEnd::new(module)))?;
    String::from_utf8(writer.into_inner()).map_err(|e| WireError::Custom(e.to_string()))
}

/// Wire timestamp form used in row fields; matches the materializer's
/// primary parse format.
pub fn format_wire_timestamp(value: &NaiveDateTime) -> String {
    value.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn write_row<W: Write>(writer: &mut Writer<W>, row: &GenericRow) -> Result<()> {
    let no = row.no.to_string();
    let mut start = BytesStart::new("row");
    start.push_attribute(("no", no.as_str()));
    writer.write_event(Event::Start(start))?;
    for field in &row.fields {
        write_field(writer, field)?;
    }
    writer.write_event(Event::End(BytesEnd::new("row")))?;
    Ok(())
}

fn write_field<W: Write>(writer: &mut Writer<W>, field: &FieldLabel) -> Result<()> {
    let mut start = BytesStart::new("FL");
    start.push_attribute(("val", field.label.as_str()));

    if field.value.is_empty() && field.groups.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    if !field.value.is_empty() {
        writer.write_event(Event::Text(BytesText::new(&field.value)))?;
    }
    for group in &field.groups {
        write_group(writer, group)?;
    }
    writer.write_event(Event::End(BytesEnd::new("FL")))?;
    Ok(())
}

fn write_group<W: Write>(writer: &mut Writer<W>, group: &NestedGroup) -> Result<()> {
    let no = group.no.to_string();
    let mut start = BytesStart::new(group.name.as_str());
    start.push_attribute(("no", no.as_str()));

    if group.fields.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for field in &group.fields {
        write_field(writer, field)?;
    }
    writer.write_event(Event::End(BytesEnd::new(group.name.as_str())))?;
    Ok(())
}
