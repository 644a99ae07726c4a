use pal_core::ast::EntityKind;
use pal_core::parse;

#[test]
fn test_parse_to_json() {
    let source = "theme:\n  primary: #336699\nref: =theme.primary\n";
    let doc = parse(source, "test.pal").unwrap();
    let json: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();

    let expected = serde_json::json!({
        "theme": { "primary": { "rgb": "#336699" } },
        "ref": "=theme.primary",
    });
    assert_eq!(json, expected);
}

#[test]
fn test_parse_to_yaml() {
    let source = "theme:\n  primary: #336699\n";
    let doc = parse(source, "test.pal").unwrap();
    let yaml = doc.to_yaml().unwrap();
    assert_eq!(yaml, "theme:\n  primary:\n    rgb: '#336699'\n");
}

#[test]
fn test_entity_round_trip_by_id() {
    let doc = parse("group:\n  color: #f00\n", "test.pal").unwrap();
    let color = doc.root().get("group").unwrap().get("color").unwrap();
    let again = doc.entity(color.id());
    assert_eq!(again.name(), "color");
}

#[test]
fn test_kind_inspection() {
    let doc = parse("group:\n  color: #f00\nref: =group\n", "test.pal").unwrap();
    let root = doc.root();
    assert!(matches!(
        root.get("group").unwrap().kind(),
        EntityKind::Palette
    ));
    assert!(matches!(
        root.get("ref").unwrap().kind(),
        EntityKind::Reference { path } if path == &["group".to_string()]
    ));
    let value = root.get("group").unwrap().get("color").unwrap().at(0).unwrap();
    assert!(matches!(
        value.kind(),
        EntityKind::ColorValue { value } if value == "#f00"
    ));
}

#[test]
fn test_kind_display() {
    let doc = parse("group:\n  color: #f00\nref: =group.color\n", "test.pal").unwrap();
    let root = doc.root();
    assert_eq!(format!("{}", root.get("group").unwrap().kind()), "palette");
    assert_eq!(
        format!("{}", root.get("ref").unwrap().kind()),
        "reference '=group.color'"
    );
}

#[test]
fn test_metadata_entries_iteration() {
    let doc = parse(
        "group:\n  oct/view: grid\n  oct/columns: 4\n  color: #f00\n",
        "test.pal",
    )
    .unwrap();
    let group = doc.root().get("group").unwrap();
    let names: Vec<&str> = group.metadata_entries().map(|m| m.name()).collect();
    assert_eq!(names, vec!["oct/view", "oct/columns"]);
    assert_eq!(group.metadata_entries().count(), 2);
}

#[test]
fn test_metadata_lines() {
    let doc = parse("group:\n  oct/view: grid\n  color: #f00\n", "test.pal").unwrap();
    let group = doc.root().get("group").unwrap();
    assert_eq!(group.metadata("oct/view").unwrap().line(), 1);
}

#[test]
fn test_document_len_counts_metadata_entities() {
    // root + group + color + colorvalue, plus the anonymous color value
    // carried by the oct/tint annotation.
    let doc = parse("group:\n  oct/tint: #0f0\n  color: #f00\n", "test.pal").unwrap();
    assert_eq!(doc.len(), 5);
    assert!(!doc.is_empty());
}

#[test]
fn test_empty_document_has_bare_root() {
    let doc = parse("", "test.pal").unwrap();
    assert!(doc.root().is_palette());
    assert_eq!(doc.root().children().count(), 0);
    assert_eq!(doc.len(), 1);
}

#[test]
fn test_empty_file_name_is_fine() {
    assert!(parse("group:\n  color: #f00\n", "").is_ok());
}
