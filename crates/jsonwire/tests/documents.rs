#![allow(missing_docs)]

use std::{collections::HashMap, io::Cursor};

use jsonwire::{Capabilities, Json, JsonError, Number, PropertySetting, TokenKind, Value};
use rstest::rstest;

#[rstest]
#[case("")]
#[case("   ")]
#[case("\n\t")]
fn empty_documents_read_as_nothing(#[case] text: &str) {
    assert_eq!(Json::new().to_type::<Value>(text).unwrap(), None);
    assert_eq!(jsonwire::from_json::<HashMap<String, i32>>(text).unwrap(), None);
}

#[test]
fn integral_and_float_strings() {
    let json = Json::new();
    let n: Number = json.to_type("\"42\"").unwrap().unwrap();
    assert!(n.is_integral());
    assert_eq!(json.to_json(&n).unwrap(), "42");
    let f: Number = json.to_type("\"42.0\"").unwrap().unwrap();
    assert!(f.is_f64());
    assert_eq!(json.to_json(&f).unwrap(), "42.0");
}

#[rstest]
#[case(r#"{"a": [1, 2, {"b": null}], "c": "d"}"#)]
#[case(r#"[0, -1, 1.25, 1e-7, "é😀", true]"#)]
#[case(r#"{"nested": {"deeper": {"deepest": []}}}"#)]
fn matches_serde_json(#[case] text: &str) {
    let json = Json::new();
    let ours: Value = json.to_type(text).unwrap().unwrap();
    let theirs: serde_json::Value = serde_json::from_str(text).unwrap();
    assert_eq!(json.to_json(&ours).unwrap(), serde_json::to_string(&theirs).unwrap());
}

#[test]
fn container_mismatch_is_structural() {
    let json = Json::new();
    let mut input = json.new_input("[1, 2}");
    input.begin_array().unwrap();
    while input.peek().unwrap() == TokenKind::Number {
        input.next_number().unwrap();
        input.has_next().unwrap();
    }
    assert_eq!(input.peek().unwrap(), TokenKind::EndMap);
    assert!(matches!(input.end_map(), Err(JsonError::Structural { .. })));
    assert!(matches!(input.end_array(), Err(JsonError::Structural { .. })));
}

#[test]
fn pulls_tokens_from_a_reader() {
    let json = Json::new();
    let text = r#"{"browserName": "firefox", "acceptInsecureCerts": true, "timeouts": {"script": 30000}}"#;
    let mut input = json.new_reader_input(Cursor::new(text));
    input.begin_map().unwrap();
    let mut names = Vec::new();
    while input.has_next().unwrap() {
        names.push(input.next_name().unwrap());
        input.skip_value().unwrap();
    }
    input.end_map().unwrap();
    input.consume_trailing_whitespace().unwrap();
    assert_eq!(names, ["browserName", "acceptInsecureCerts", "timeouts"]);
}

#[test]
fn capabilities_travel_as_plain_maps() {
    let json = Json::new();
    let caps: Capabilities = json
        .to_type(r#"{"browserName": "chrome", "platformName": null, "goog:chromeOptions": {"args": ["--headless"]}}"#)
        .unwrap()
        .unwrap();
    assert_eq!(caps.browser_name(), Some("chrome"));
    assert!(caps.get("platformName").is_none());

    let mut extra = Capabilities::new();
    extra.set("acceptInsecureCerts", true).set("browserName", Value::Null);
    let merged = caps.merge(&extra);
    assert_eq!(
        json.to_json(&merged).unwrap(),
        r#"{"goog:chromeOptions":{"args":["--headless"]},"acceptInsecureCerts":true}"#
    );
}

#[test]
fn property_setting_is_reported() {
    let json = Json::new();
    let mut input = json.new_input("{}");
    assert_eq!(input.property_setting(PropertySetting::ByField), PropertySetting::ByName);
    assert_eq!(input.setting(), PropertySetting::ByField);
}

#[test]
fn trailing_data_is_rejected() {
    assert!(matches!(Json::new().to_type::<i32>("1 2"), Err(JsonError::Structural { .. })));
    assert!(matches!(Json::new().to_type::<bool>("true]"), Err(JsonError::Structural { .. })));
}

#[test]
fn nesting_limit_applies_to_every_input() {
    let json = Json::new().with_max_nesting(3);
    assert!(json.to_type::<Value>("[[[1]]]").unwrap().is_some());
    let err = json.to_type::<Value>("[[[[1]]]]").unwrap_err();
    assert!(matches!(err, JsonError::Structural { .. }), "{err}");
    assert_eq!(err.location().unwrap().column, 4);

    let deep = "[".repeat(50_000) + &"]".repeat(50_000);
    let mut input = Json::new().new_reader_input(Cursor::new(deep));
    assert!(matches!(input.read::<Value>(), Err(JsonError::Structural { .. })));
}
