//! Tag descriptor resolution.
//!
//! Field annotations use a compact comma-separated grammar shared by the XML
//! and query-string paths:
//!
//! ```text
//! "selectColumns,default>All"      wire name + fallback when zero
//! "criteria,required,noencode"     mandatory, never percent-encoded
//! "Session Token,strip"            removed just before rendering
//! "id,entityId"                    renamed to entityId when non-zero
//! ```
//!
//! The first token, unless it is a recognized keyword, is the wire name.
//! `required` makes the zero value a validation error on encode. `default>V`
//! substitutes `V` when the native value is the zero value for its type. Any
//! other bare token is a conditional rename, applied only when the native
//! value is non-zero. `noencode` (alias `literal`) suppresses
//! percent-encoding. `strip` removes the field from assembled rows
//! immediately before output encoding.
//!
//! Resolution is pure and deterministic, so per-type memoization (generated
//! code caches the resolved set behind a `OnceLock`) is safe to race.

/// Resolved per-field metadata driving both encoding and decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Wire field label / query parameter key.
    pub wire_name: &'static str,
    /// Zero value is a validation error on encode.
    pub required: bool,
    /// Literal substituted when the native value is the zero value.
    pub default: Option<&'static str>,
    /// Alternate key used only when the native value is non-zero.
    pub rename: Option<&'static str>,
    /// Suppress percent-encoding for this field.
    pub literal: bool,
    /// Remove the field from assembled rows before rendering.
    pub strip: bool,
}

fn is_keyword(token: &str) -> bool {
    matches!(token, "required" | "strip" | "noencode" | "literal") || token.starts_with("default>")
}

/// Resolves one raw annotation string into a [`FieldDescriptor`].
pub fn resolve_tag(tag: &'static str) -> FieldDescriptor {
    let mut descriptor = FieldDescriptor {
        wire_name: "",
        required: false,
        default: None,
        rename: None,
        literal: false,
        strip: false,
    };

    for (index, token) in tag.split(',').map(str::trim).enumerate() {
        if index == 0 && !is_keyword(token) {
            descriptor.wire_name = token;
            continue;
        }
        if token == "required" {
            descriptor.required = true;
        } else if token == "strip" {
            descriptor.strip = true;
        } else if token == "noencode" || token == "literal" {
            descriptor.literal = true;
        } else if let Some(value) = token.strip_prefix("default>") {
            descriptor.default = Some(value);
        } else if !token.is_empty() {
            // bare token: conditional rename, last one wins
            descriptor.rename = Some(token);
        }
    }

    descriptor
}

/// Resolves a type's full annotation list, declaration order preserved.
pub fn resolve_tags(tags: &'static [&'static str]) -> Vec<FieldDescriptor> {
    tags.iter().map(|tag| resolve_tag(tag)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_name() {
        let d = resolve_tag("sortColumnString");
        assert_eq!(d.wire_name, "sortColumnString");
        assert!(!d.required);
        assert_eq!(d.default, None);
        assert_eq!(d.rename, None);
        assert!(!d.literal);
        assert!(!d.strip);
    }

    #[test]
    fn test_default_token() {
        let d = resolve_tag("selectColumns,default>All");
        assert_eq!(d.wire_name, "selectColumns");
        assert_eq!(d.default, Some("All"));
    }

    #[test]
    fn test_required_noencode() {
        let d = resolve_tag("criteria,required,noencode");
        assert_eq!(d.wire_name, "criteria");
        assert!(d.required);
        assert!(d.literal);
    }

    #[test]
    fn test_conditional_rename() {
        let d = resolve_tag("id,entityId");
        assert_eq!(d.wire_name, "id");
        assert_eq!(d.rename, Some("entityId"));
    }

    #[test]
    fn test_strip() {
        let d = resolve_tag("Session Token,strip");
        assert_eq!(d.wire_name, "Session Token");
        assert!(d.strip);
    }

    #[test]
    fn test_keyword_first_token_leaves_name_empty() {
        let d = resolve_tag("required");
        assert_eq!(d.wire_name, "");
        assert!(d.required);
    }

    #[test]
    fn test_default_value_may_contain_digits() {
        let d = resolve_tag("toIndex,default>20");
        assert_eq!(d.default, Some("20"));
    }

    #[test]
    fn test_resolve_tags_preserves_order() {
        let all = resolve_tags(&["a", "b,required", "c,default>x"]);
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].wire_name, "a");
        assert!(all[1].required);
        assert_eq!(all[2].default, Some("x"));
    }
}
