//! Property-based tests using QuickCheck

use quickcheck::{QuickCheck, TestResult};

use ferrum_hl7v2::escape::{escape, unescape};
use ferrum_hl7v2::{Element, Message, MessageBuilder, Separators};

/// Property: unescape is the left inverse of escape for any input.
#[test]
fn prop_escape_round_trip() {
    fn prop(input: String) -> bool {
        let separators = Separators::default();
        unescape(&separators, &escape(&separators, &input)) == input
    }
    QuickCheck::new()
        .tests(500)
        .quickcheck(prop as fn(String) -> bool);
}

/// Property: escaped output never contains a bare delimiter.
#[test]
fn prop_escaped_output_is_delimiter_free() {
    fn prop(input: String) -> bool {
        let separators = Separators::default();
        let escaped = escape(&separators, &input);
        // Every escape character belongs to an ESC X ESC triple.
        let chars: Vec<char> = escaped.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            match chars[i] {
                '|' | '^' | '~' | '&' => return false,
                '\\' => {
                    if i + 2 >= chars.len() || chars[i + 2] != '\\' {
                        return false;
                    }
                    i += 3;
                }
                _ => i += 1,
            }
        }
        true
    }
    QuickCheck::new()
        .tests(500)
        .quickcheck(prop as fn(String) -> bool);
}

fn clean_token(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '.')
}

/// Property: any message assembled from delimiter-free tokens parses
/// back to itself.
#[test]
fn prop_parse_round_trip() {
    fn prop(fields: Vec<String>) -> TestResult {
        if fields.is_empty() || fields.len() > 30 {
            return TestResult::discard();
        }
        if !fields.iter().all(|f| clean_token(f)) {
            return TestResult::discard();
        }
        let mut text = String::from("MSH|^~\\&");
        for field in &fields {
            text.push('|');
            text.push_str(field);
        }
        let message = Message::parse(&text);
        TestResult::from_bool(message.value().as_deref() == Some(text.as_str()))
    }
    QuickCheck::new()
        .tests(300)
        .quickcheck(prop as fn(Vec<String>) -> TestResult);
}

/// Property: a field written at index k reads back at index k, on both
/// backends, and `index()` reports k.
#[test]
fn prop_index_identity_both_backends() {
    fn prop(index: usize, token: String) -> TestResult {
        let index = index % 64;
        if index < 3 || !clean_token(&token) {
            return TestResult::discard();
        }

        let message = Message::parse("MSH|^~\\&");
        let segment = message.segment(1).unwrap();
        let field = segment.field(index).unwrap();
        field.set_value(&token).unwrap();
        if field.index() != index
            || segment.field(index).unwrap().value().as_deref() != Some(token.as_str())
        {
            return TestResult::failed();
        }

        let builder = MessageBuilder::new();
        builder.set_field(1, index, &token).unwrap();
        let built = builder.segment(1).unwrap().field(index).unwrap();
        if built.index() != index || built.value().as_deref() != Some(token.as_str()) {
            return TestResult::failed();
        }

        // Both serialized forms agree on the header segment.
        TestResult::from_bool(
            message.value() == builder.value()
        )
    }
    QuickCheck::new()
        .tests(200)
        .quickcheck(prop as fn(usize, String) -> TestResult);
}

/// Property: deleting field i shifts i+1 into its place and drops the
/// count by one (parser backend, ordinary segment).
#[test]
fn prop_delete_shift() {
    fn prop(fields: Vec<String>, at: usize) -> TestResult {
        if fields.len() < 2 || fields.len() > 20 {
            return TestResult::discard();
        }
        if !fields.iter().all(|f| clean_token(f)) {
            return TestResult::discard();
        }
        let at = 1 + at % (fields.len() - 1);
        let text = format!("MSH|^~\\&|x\rZZZ|{}", fields.join("|"));
        let message = Message::parse(&text);
        let segment = message.segment(2).unwrap();
        let count = segment.count();
        let successor = segment.field(at + 1).unwrap().value();

        segment.delete(at).unwrap();
        TestResult::from_bool(
            segment.field(at).unwrap().value() == successor && segment.count() == count - 1,
        )
    }
    QuickCheck::new()
        .tests(200)
        .quickcheck(prop as fn(Vec<String>, usize) -> TestResult);
}
