use rstest::rstest;

use crate::{Json, JsonError, LexicalError, Value};

fn parse(text: &str) -> Result<Option<Value>, JsonError> {
    Json::new().to_type(text)
}

#[rstest]
#[case("[1", LexicalError::UnexpectedEndOfInput)]
#[case("\"abc", LexicalError::UnterminatedString)]
#[case("nul", LexicalError::InvalidLiteral { expected: "null" })]
#[case("nulx", LexicalError::InvalidLiteral { expected: "null" })]
#[case("trueish", LexicalError::InvalidLiteral { expected: "true or false" })]
#[case("@", LexicalError::InvalidCharacter('@'))]
#[case("[1 @]", LexicalError::InvalidCharacter('@'))]
#[case("\"\\q\"", LexicalError::InvalidEscape('q'))]
#[case("\"\\u12G4\"", LexicalError::InvalidUnicodeEscapeChar('G'))]
#[case("1-2", LexicalError::MalformedNumber("1-2".into()))]
#[case("01", LexicalError::MalformedNumber("01".into()))]
#[case("[0.]", LexicalError::MalformedNumber("0.".into()))]
#[case("1.e5", LexicalError::MalformedNumber("1.e5".into()))]
#[case("-", LexicalError::MalformedNumber("-".into()))]
#[case("+1.23e100", LexicalError::InvalidCharacter('+'))]
#[case("[.1,.23]", LexicalError::InvalidCharacter('.'))]
#[case("NaN", LexicalError::InvalidCharacter('N'))]
#[case("[Infinity,-Infinity]", LexicalError::InvalidCharacter('I'))]
#[case("\"a\u{1}b\"", LexicalError::InvalidCharacter('\u{1}'))]
#[case("\"line\nbreak\"", LexicalError::InvalidCharacter('\n'))]
#[case("[,1]", LexicalError::InvalidCharacter(','))]
#[case("[1 2]", LexicalError::InvalidCharacter('2'))]
#[case("[1,,2]", LexicalError::InvalidCharacter(','))]
#[case("[1,]", LexicalError::InvalidCharacter(']'))]
#[case("{,\"a\":1}", LexicalError::InvalidCharacter(','))]
#[case("{\"a\":1 \"b\":2}", LexicalError::InvalidCharacter('"'))]
#[case("{\"a\":1,}", LexicalError::InvalidCharacter('}'))]
fn lexical_errors(#[case] text: &str, #[case] expected: LexicalError) {
    match parse(text) {
        Err(JsonError::Lexical { kind, .. }) => assert_eq!(kind, expected),
        other => panic!("{text:?} gave {other:?}"),
    }
}

#[rstest]
#[case("[1}")]
#[case("{\"a\": 1]")]
#[case("]")]
#[case("[1,")]
#[case("{\"a\"}")]
#[case("1 2")]
#[case("0x")]
#[case("[] []")]
fn structural_errors(#[case] text: &str) {
    assert!(parse(text).is_err(), "{text:?} parsed");
}

#[test]
fn errors_report_where_they_happened() {
    let err = parse("{\n  \"a\": tru }").unwrap_err();
    let location = err.location().unwrap();
    assert_eq!(location.line, 2);
    assert!(location.recent.ends_with("tru "), "{location}");
}

#[test]
fn deep_nesting_is_rejected() {
    let depth = 100_000;
    let arrays = "[".repeat(depth) + &"]".repeat(depth);
    let err = parse(&arrays).unwrap_err();
    assert!(matches!(err, JsonError::Structural { .. }), "{err}");
    assert!(err.to_string().contains("maximum of 128"), "{err}");
    assert_eq!(err.location().unwrap().column, 129);

    let maps = "{\"a\":".repeat(depth) + &"}".repeat(depth);
    assert!(matches!(parse(&maps), Err(JsonError::Structural { .. })));
}

#[test]
fn nesting_up_to_the_limit_is_accepted() {
    let text = "[".repeat(128) + &"]".repeat(128);
    assert!(parse(&text).unwrap().is_some());
}
