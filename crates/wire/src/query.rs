//! URL option encoding.
//!
//! Builds the query-parameter string for an outbound call from an options
//! record and its descriptors. Parameters appear in declaration order, with
//! the fixed protocol markers `version=2` and `newFormat=1` always appended
//! last. Keys and values are form-encoded unless the descriptor says
//! `noencode`.
//!
//! Zero-value handling follows the upstream encoder exactly: a `required`
//! zero is a validation error; a zero with `default>` substitutes the
//! literal; zero timestamps and absent payloads are omitted entirely; every
//! other zero scalar is still emitted (`""`, `0`, `false`). A non-zero value
//! under a conditional-rename descriptor encodes under the alternate key.

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::descriptor::FieldDescriptor;
use crate::error::{Result, WireError};
use crate::record::{Payload, UrlOptions};

/// Protocol version marker, always the trailing-but-one parameter.
pub const VERSION_PARAM: (&str, &str) = ("version", "2");
/// Response format marker, always the trailing parameter.
pub const FORMAT_PARAM: (&str, &str) = ("newFormat", "1");

/// Encodes an options record to a full query string.
pub fn encode_options<T: UrlOptions>(options: &T) -> Result<String> {
    let mut params = QueryPairs::new();
    options.encode(&mut params)?;
    Ok(params.finish())
}

/// One field's native value, as seen by the encoder.
#[derive(Debug, Clone, Copy)]
pub enum ParamValue<'a> {
    /// Boolean scalar; zero value is `false`.
    Bool(bool),
    /// Integer scalar; zero value is `0`.
    Int(i64),
    /// Float scalar; zero value is `0.0`.
    Float(f64),
    /// Text scalar; zero value is the empty string.
    Text(&'a str),
    /// Timestamp; zero value is `None` and is never emitted.
    Timestamp(Option<&'a NaiveDateTime>),
    /// Structured wire body; zero value is `None`/empty and is never
    /// emitted.
    Payload(Option<&'a Payload>),
}

impl ParamValue<'_> {
    fn is_zero(&self) -> bool {
        match self {
            ParamValue::Bool(value) => !value,
            ParamValue::Int(value) => *value == 0,
            ParamValue::Float(value) => *value == 0.0,
            ParamValue::Text(value) => value.is_empty(),
            ParamValue::Timestamp(value) => value.is_none(),
            ParamValue::Payload(value) => value.is_none_or(|p| p.is_empty()),
        }
    }

    fn render(&self) -> Result<String> {
        Ok(match self {
            ParamValue::Bool(value) => if *value { "true" } else { "false" }.to_string(),
            ParamValue::Int(value) => value.to_string(),
            // six fractional digits, the upstream float form
            ParamValue::Float(value) => format!("{value:.6}"),
            ParamValue::Text(value) => (*value).to_string(),
            ParamValue::Timestamp(Some(value)) => format_query_timestamp(value),
            ParamValue::Timestamp(None) => String::new(),
            ParamValue::Payload(Some(payload)) => payload.render()?,
            ParamValue::Payload(None) => String::new(),
        })
    }
}

struct Pair {
    key: String,
    value: String,
    literal: bool,
}

/// Ordered query-parameter accumulator.
#[derive(Default)]
pub struct QueryPairs {
    pairs: Vec<Pair>,
}

impl QueryPairs {
    /// An empty parameter set.
    pub fn new() -> Self {
        QueryPairs::default()
    }

    /// Applies one descriptor to one native value and appends the resulting
    /// parameter, if any.
    pub fn push_field(&mut self, descriptor: &FieldDescriptor, value: ParamValue<'_>) -> Result<()> {
        let zero = value.is_zero();
        if descriptor.required && zero {
            return Err(WireError::Required {
                field: descriptor.wire_name,
            });
        }

        // conditional rename applies only when the value is non-zero
        let key = if zero {
            descriptor.wire_name
        } else {
            descriptor.rename.unwrap_or(descriptor.wire_name)
        };

        if zero {
            if let Some(default) = descriptor.default {
                self.push(key, default.to_string(), descriptor.literal);
                return Ok(());
            }
            if matches!(value, ParamValue::Timestamp(_) | ParamValue::Payload(_)) {
                return Ok(());
            }
        }

        let rendered = value.render()?;
        self.push(key, rendered, descriptor.literal);
        Ok(())
    }

    /// Appends a parameter verbatim.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>, literal: bool) {
        self.pairs.push(Pair {
            key: key.into(),
            value: value.into(),
            literal,
        });
    }

    /// Renders the query string, appending the fixed protocol markers last.
    pub fn finish(mut self) -> String {
        self.push(VERSION_PARAM.0, VERSION_PARAM.1, false);
        self.push(FORMAT_PARAM.0, FORMAT_PARAM.1, false);
        let rendered: Vec<String> = self
            .pairs
            .iter()
            .map(|pair| {
                if pair.literal {
                    format!("{}={}", pair.key, pair.value)
                } else {
                    format!("{}={}", form_encode(&pair.key), form_encode(&pair.value))
                }
            })
            .collect();
        rendered.join("&")
    }
}

fn form_encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Query-string timestamp form: no zero-padding, a preserved wire quirk.
/// Kept in one place so a corrected variant can be swapped in for new
/// integrations.
pub fn format_query_timestamp(value: &NaiveDateTime) -> String {
    format!(
        "{}-{}-{} {}:{}:{}",
        value.year(),
        value.month(),
        value.day(),
        value.hour(),
        value.minute(),
        value.second()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn timestamp(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .and_then(|date| date.and_hms_opt(h, mi, s))
            .expect("valid test timestamp")
    }

    #[test]
    fn test_query_timestamp_is_not_zero_padded() {
        let ts = timestamp(2019, 3, 7, 4, 5, 9);
        assert_eq!(format_query_timestamp(&ts), "2019-3-7 4:5:9");
    }

    #[test]
    fn test_query_timestamp_wide_components_unchanged() {
        let ts = timestamp(2019, 11, 27, 14, 55, 39);
        assert_eq!(format_query_timestamp(&ts), "2019-11-27 14:55:39");
    }

    #[test]
    fn test_fixed_markers_are_last() {
        let mut params = QueryPairs::new();
        params.push("id", "42", false);
        let query = params.finish();
        assert_eq!(query, "id=42&version=2&newFormat=1");
    }

    #[test]
    fn test_form_encoding_and_literal_bypass() {
        let mut params = QueryPairs::new();
        params.push("criteria", "(Email:contains:a b)", true);
        params.push("plain", "a b&c", false);
        let query = params.finish();
        assert!(query.starts_with("criteria=(Email:contains:a b)&plain=a+b%26c&"));
    }
}
