use crmwire::{Document, SentinelKind, WireError, parse_document};

const LEADS_RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<response uri="/crm/private/xml/Leads/getRecords">
  <Leads>
    <row no="7">
      <FL val="LEADID">101</FL>
      <FL val="Company">Smith &amp; Sons</FL>
    </row>
    <row no="8">
      <FL val="LEADID">102</FL>
      <FL val="Company"><![CDATA[Acme <Widgets>]]></FL>
    </row>
  </Leads>
</response>"#;

#[test]
fn test_rows_and_fields() {
    let document = parse_document(LEADS_RESPONSE).expect("parse");
    let rows = document.rows().expect("row data");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].fields.len(), 2);
    assert_eq!(rows[0].field("LEADID").unwrap().value, "101");
    assert_eq!(rows[0].field("Company").unwrap().value, "Smith & Sons");
    assert_eq!(rows[1].field("Company").unwrap().value, "Acme <Widgets>");
}

#[test]
fn test_rows_are_renumbered_sequentially() {
    // wire `no` attributes (7, 8) are not trusted
    let document = parse_document(LEADS_RESPONSE).expect("parse");
    let rows = document.rows().expect("row data");
    assert_eq!(rows[0].no, 1);
    assert_eq!(rows[1].no, 2);
}

const POTENTIALS_RESPONSE: &str = r#"<response><result><Potentials>
  <row no="1">
    <FL val="POTENTIALID">2000</FL>
    <FL val="Products">
      <product no="4"><FL val="ID">11</FL><FL val="Product Name">Anvil</FL></product>
      <product no="5"><FL val="ID">12</FL><FL val="Product Name">Rocket Skates</FL></product>
    </FL>
  </row>
</Potentials></result></response>"#;

#[test]
fn test_group_bearing_field_detected_by_lookahead() {
    let document = parse_document(POTENTIALS_RESPONSE).expect("parse");
    let rows = document.rows().expect("row data");
    let products = rows[0].field("Products").expect("compound field");
    assert!(products.value.is_empty());
    assert_eq!(products.groups.len(), 2);
    assert_eq!(products.groups[0].name, "product");
    assert_eq!(products.groups[0].fields[1].value, "Anvil");
    assert_eq!(products.groups[1].fields[1].value, "Rocket Skates");
}

#[test]
fn test_group_occurrences_renumbered_densely() {
    let document = parse_document(POTENTIALS_RESPONSE).expect("parse");
    let rows = document.rows().expect("row data");
    let products = rows[0].field("Products").expect("compound field");
    assert_eq!(products.groups[0].no, 1);
    assert_eq!(products.groups[1].no, 2);
}

#[test]
fn test_same_label_fields_merge_their_groups() {
    let xml = r#"<response><Potentials><row no="1">
      <FL val="ContactRoles"><contactRole no="1"><FL val="ID">1</FL></contactRole></FL>
      <FL val="ContactRoles"><contactRole no="9"><FL val="ID">2</FL></contactRole></FL>
    </row></Potentials></response>"#;
    let document = parse_document(xml).expect("parse");
    let rows = document.rows().expect("row data");
    assert_eq!(rows[0].fields.len(), 1);
    let roles = &rows[0].fields[0];
    assert_eq!(roles.groups.len(), 2);
    assert_eq!(roles.groups[0].no, 1);
    assert_eq!(roles.groups[1].no, 2);
    assert_eq!(roles.groups[1].fields[0].value, "2");
}

#[test]
fn test_empty_field_and_empty_row() {
    let xml = r#"<response><Leads>
      <row no="1"><FL val="Rating"/><FL val="Company"></FL></row>
      <row no="2"/>
    </Leads></response>"#;
    let document = parse_document(xml).expect("parse");
    let rows = document.rows().expect("row data");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].field("Rating").unwrap().value, "");
    assert_eq!(rows[0].field("Company").unwrap().value, "");
    assert!(rows[1].fields.is_empty());
}

#[test]
fn test_unknown_elements_are_skipped() {
    let xml = r#"<response><Leads>
      <diagnostics><timing unit="ms">3</timing></diagnostics>
      <row no="1"><FL val="Company">Acme</FL></row>
    </Leads></response>"#;
    let document = parse_document(xml).expect("parse");
    let rows = document.rows().expect("row data");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].field("Company").unwrap().value, "Acme");
}

#[test]
fn test_error_sentinel_discards_rows() {
    // sentinel wins even when row elements follow it
    let xml = r#"<response>
      <error><code>4600</code><message>Unable to process your request</message></error>
      <Leads><row no="1"><FL val="Company">Acme</FL></row></Leads>
    </response>"#;
    let document = parse_document(xml).expect("parse");
    let sentinel = document.sentinel().expect("sentinel");
    assert_eq!(sentinel.kind, SentinelKind::Error);
    assert_eq!(sentinel.code, 4600);
    assert_eq!(sentinel.message, "Unable to process your request");
    assert!(document.rows().is_none());
}

#[test]
fn test_nodata_sentinel() {
    let xml = r#"<response uri="/crm/private/xml/Leads/getRecords">
      <nodata><code>4422</code><message>There is no data to show</message></nodata>
    </response>"#;
    let document = parse_document(xml).expect("parse");
    let sentinel = document.sentinel().expect("sentinel");
    assert_eq!(sentinel.kind, SentinelKind::NoData);
    assert_eq!(sentinel.code, 4422);
}

#[test]
fn test_sentinel_inside_module_wrapper() {
    let xml = r#"<response><Leads><nodata><code>4422</code><message>none</message></nodata></Leads></response>"#;
    let document = parse_document(xml).expect("parse");
    assert_eq!(document.sentinel().expect("sentinel").kind, SentinelKind::NoData);
}

#[test]
fn test_self_closed_sentinel_decodes_empty() {
    let document = parse_document("<response><nodata/></response>").expect("parse");
    let sentinel = document.sentinel().expect("sentinel");
    assert_eq!(sentinel.kind, SentinelKind::NoData);
    assert_eq!(sentinel.code, 0);
    assert_eq!(sentinel.message, "");
}

#[test]
fn test_non_numeric_sentinel_code_is_malformed() {
    let xml = "<response><error><code>oops</code><message>m</message></error></response>";
    match parse_document(xml) {
        Err(WireError::Malformed(_)) => {}
        other => panic!("expected malformed document, got {other:?}"),
    }
}

#[test]
fn test_truncated_document_is_malformed() {
    let xml = r#"<response><Leads><row no="1"><FL val="Company">Acme"#;
    match parse_document(xml) {
        Err(WireError::Malformed(_)) => {}
        other => panic!("expected malformed document, got {other:?}"),
    }
}

#[test]
fn test_empty_module_yields_no_rows() {
    let document = parse_document("<response><Leads></Leads></response>").expect("parse");
    assert_eq!(document, Document::Rows(Vec::new()));
}
