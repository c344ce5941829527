//! Error taxonomy: every failure mode is a distinguishable value, classified
//! by [`ErrorKind`].

use monojson::{parse, Error, ErrorKind};
use rstest::rstest;

#[rstest]
#[case(r#"{"x0": "abc"#, ErrorKind::Lex)]
#[case("{\"n\": 1.2.3}", ErrorKind::Lex)]
#[case("{\"b\": true}", ErrorKind::Lex)]
#[case("{\"open\": [1, 2", ErrorKind::Lex)]
#[case("[1,2,3]", ErrorKind::Structure)]
#[case("5", ErrorKind::Structure)]
#[case("{]", ErrorKind::Structure)]
#[case(r#"{"a":1, 2}"#, ErrorKind::Structure)]
#[case(r#"{"a":}"#, ErrorKind::Structure)]
#[case(r#"{"a":1,"a":2}"#, ErrorKind::DuplicateKey)]
fn test_parse_failure_classification(#[case] input: &str, #[case] expected: ErrorKind) {
    let err = parse(input).unwrap_err();
    assert_eq!(err.kind(), expected, "{input:?} -> {err}");
}

#[rstest]
fn test_unterminated_string_position() {
    let err = parse(r#"{"x0": "abc"#).unwrap_err();
    assert_eq!(err, Error::UnterminatedString { at: 7 });
}

#[rstest]
fn test_duplicate_key_carries_the_key() {
    let err = parse(r#"{"seed":1, "seed":2}"#).unwrap_err();
    assert_eq!(err, Error::DuplicateKey { key: "seed".into() });
}

#[rstest]
fn test_type_mismatch_names_both_sides() {
    let doc = parse(r#"{"n": 42}"#).unwrap();
    let err = doc.get("n").unwrap().as_str().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    assert_eq!(
        err,
        Error::TypeMismatch {
            expected: "string",
            found: "integer",
        }
    );
}

#[rstest]
fn test_accessor_not_found() {
    let doc = parse(r#"{"a":[1]}"#).unwrap();

    let missing = doc.get("b").unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::NotFound);
    assert_eq!(missing, Error::KeyNotFound { key: "b".into() });

    let out_of_bounds = doc.get("a").unwrap().at(3).unwrap_err();
    assert_eq!(out_of_bounds.kind(), ErrorKind::NotFound);
    assert_eq!(out_of_bounds, Error::IndexOutOfBounds { index: 3, len: 1 });
}

#[rstest]
fn test_lookup_in_empty_object_is_not_found() {
    let doc = parse("{}").unwrap();
    let err = doc.get("anything").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[rstest]
fn test_io_error_carries_path() {
    let err = monojson::parse_file("/nonexistent/input.json").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(err.to_string().contains("/nonexistent/input.json"));
}

#[rstest]
fn test_errors_display_without_panicking() {
    for input in [r#"{"a":"#, "}", r#"{"a":1,"a":1}"#, "[", "@"] {
        let err = parse(input).unwrap_err();
        assert!(!err.to_string().is_empty());
    }
}
