#![allow(missing_docs)]

use std::collections::BTreeMap;

use jsonwire::{Json, JsonError, Map, OutputOptions, Value};

fn nested(levels: usize) -> Value {
    (0..levels).fold(Value::Null, |inner, _| Value::Array(vec![inner]))
}

#[test]
fn depth_budget_counts_containers() {
    let json = Json::new();
    let eleven = nested(11);
    assert!(matches!(json.to_json(&eleven), Err(JsonError::DepthLimit { max_depth: 10 })));
    assert_eq!(json.to_json_with_depth(&eleven, 11).unwrap(), "[[[[[[[[[[[null]]]]]]]]]]]");
    assert!(json.to_json(&nested(10)).is_ok());
}

#[test]
fn depth_budget_is_configurable() {
    let json = Json::new().with_options(OutputOptions {
        max_depth: 2,
        ..*Json::new().options()
    });
    let mut map = BTreeMap::new();
    map.insert("a".to_owned(), vec![1]);
    assert_eq!(json.to_json(&map).unwrap(), r#"{"a":[1]}"#);
    assert!(json.to_json(&vec![map]).is_err());
}

#[test]
fn escapes_everything_that_needs_it() {
    let s: String = ['"', '\\', '/', '\u{8}', '\u{c}', '\n', '\r', '\t', '\0', '\u{1f}', '<', '&', '\u{2028}', '\u{2029}', 'é', '>']
        .into_iter()
        .collect();
    insta::assert_snapshot!(Json::new().to_json(&s).unwrap(), @r#""\"\\\/\b\f\n\r\t\u0000\u001f\u003c\u0026\u2028\u2029é>""#);
}

#[test]
fn escaped_output_reads_back() {
    let s = "</script>&\u{2028}\u{7f}\u{1f600}".to_owned();
    let json = Json::new();
    let text = json.to_json(&s).unwrap();
    assert!(!text.contains('<') && !text.contains('&'));
    assert_eq!(json.to_type::<String>(&text).unwrap(), Some(s.clone()));
    assert_eq!(serde_json::from_str::<String>(&text).unwrap(), s);
}

#[test]
fn numbers_keep_their_kind() {
    let json = Json::new();
    assert_eq!(json.to_json(&42_i32).unwrap(), "42");
    assert_eq!(json.to_json(&42.0_f64).unwrap(), "42.0");
    assert_eq!(json.to_json(&0.1_f32).unwrap(), "0.10000000149011612");
    assert_eq!(json.to_json(&u64::MAX).unwrap(), "18446744073709551615");
    assert_eq!(json.to_json(&vec![f64::NAN, f64::INFINITY, -1.5]).unwrap(), "[null,null,-1.5]");
}

#[test]
fn pretty_output_only_changes_whitespace() {
    let v: Value = Json::new()
        .to_type(r#"{"name": "a\"b", "list": [1, [], {}, [2.5]], "empty": {}}"#)
        .unwrap()
        .unwrap();
    let pretty = Json::new().pretty().to_json(&v).unwrap();
    insta::assert_snapshot!(pretty, @r#"
    {
      "name": "a\"b",
      "list": [
        1,
        [],
        {},
        [
          2.5
        ]
      ],
      "empty": {}
    }
    "#);
    let compact: Value = Json::new().to_type(&pretty).unwrap().unwrap();
    assert_eq!(compact, v);
}

#[test]
fn raw_writer_includes_class_names_by_default() {
    assert!(OutputOptions::default().write_class_name);
    assert!(!Json::new().options().write_class_name);
}

#[test]
fn writer_rejects_misuse() {
    let json = Json::new();
    let mut buf = Vec::new();
    let mut out = json.new_output(&mut buf);
    out.begin_map().unwrap();
    assert!(matches!(out.write_null(), Err(JsonError::Structural { .. })));
    assert!(matches!(out.end_array(), Err(JsonError::Structural { .. })));
    out.name("k").unwrap();
    assert!(out.name("again").is_err());
    out.write(&Map::new()).unwrap();
    out.end_map().unwrap();
    out.finish().unwrap();
    assert_eq!(buf, br#"{"k":{}}"#);
}
