//! Integration tests for the cursor (parser) backend.

use ferrum_hl7v2::{Element, Error, Message};

const ADT: &str = "MSH|^~\\&|SENDER|SFAC|RECEIVER|RFAC|20230506||ADT^A01|1234|P|2.5\rPID|1||555-44-3333||SMITH^JOHN^Q|||M\rNK1|1|SMITH^JANE|SPO";

#[test]
fn test_header_round_trip() {
    let input = "MSH|^~\\&|A|B|C|D|E";
    let message = Message::parse(input);
    let header = message.segment(1).unwrap();

    assert_eq!(header.type_code().as_deref(), Some("MSH"));
    assert_eq!(header.field(1).unwrap().value().as_deref(), Some("|"));
    assert_eq!(header.field(2).unwrap().value().as_deref(), Some("^~\\&"));
    assert_eq!(header.field(3).unwrap().value().as_deref(), Some("A"));
    assert_eq!(message.value().as_deref(), Some(input));
}

#[test]
fn test_crlf_normalizes_and_lf_does_not() {
    let message = Message::parse("MSH|^~\\&|A\r\nPID|1");
    assert_eq!(message.value().as_deref(), Some("MSH|^~\\&|A\rPID|1"));
    assert_eq!(message.count(), 2);

    let lf_only = Message::parse("MSH|^~\\&|A\nPID|1");
    assert_eq!(lf_only.count(), 1);
}

#[test]
fn test_navigation_to_subcomponent() {
    let message = Message::parse(ADT);
    let pid = message.segment(2).unwrap();
    assert_eq!(pid.type_code().as_deref(), Some("PID"));

    let name = pid.field(5).unwrap();
    let family = name.repetition(1).unwrap().component(1).unwrap();
    assert_eq!(family.value().as_deref(), Some("SMITH"));
    assert_eq!(
        family.subcomponent(1).unwrap().value().as_deref(),
        Some("SMITH")
    );
}

#[test]
fn test_index_identity_and_delimiters() {
    let message = Message::parse(ADT);
    for index in [1, 2, 3, 17] {
        assert_eq!(message.segment(index).unwrap().index(), index);
    }
    let segment = message.segment(2).unwrap();
    assert_eq!(segment.delimiter(), Some('|'));
    assert_eq!(segment.field(5).unwrap().delimiter(), Some('~'));
    let repetition = segment.field(5).unwrap().repetition(1).unwrap();
    assert_eq!(repetition.delimiter(), Some('^'));
    assert_eq!(repetition.component(1).unwrap().delimiter(), Some('&'));
    assert_eq!(
        repetition
            .component(1)
            .unwrap()
            .subcomponent(1)
            .unwrap()
            .delimiter(),
        None
    );
}

#[test]
fn test_zero_and_negative_shaped_indices_are_rejected() {
    let message = Message::parse(ADT);
    assert!(matches!(message.segment(0), Err(Error::InvalidIndex(_))));
    let segment = message.segment(2).unwrap();
    assert!(segment.field(0).is_ok());
    assert!(matches!(
        segment.field(3).unwrap().repetition(0),
        Err(Error::InvalidIndex(_))
    ));
}

#[test]
fn test_delete_middle_field_shifts_once() {
    let message = Message::parse("MSH|^~\\&|1|2|3|4|5");
    let header = message.segment(1).unwrap();

    header.delete(4).unwrap();
    assert_eq!(message.value().as_deref(), Some("MSH|^~\\&|1|3|4|5"));

    // Field 5 now holds "4", the only even value at or past index 3.
    header.delete(5).unwrap();
    assert_eq!(message.value().as_deref(), Some("MSH|^~\\&|1|3|5"));
}

#[test]
fn test_delete_shift_property() {
    let message = Message::parse("MSH|^~\\&|a|b|c|d");
    let header = message.segment(1).unwrap();
    let before = header.field(5).unwrap().value();
    let count = header.count();

    header.delete(4).unwrap();
    assert_eq!(header.field(4).unwrap().value(), before);
    assert_eq!(header.count(), count - 1);
}

#[test]
fn test_delete_of_absent_field_is_noop() {
    let message = Message::parse("MSH|^~\\&|a||c");
    let header = message.segment(1).unwrap();
    header.delete(4).unwrap();
    header.delete(40).unwrap();
    assert_eq!(message.value().as_deref(), Some("MSH|^~\\&|a||c"));
}

#[test]
fn test_header_delimiter_fields_are_guarded() {
    let message = Message::parse("MSH|^~\\&|a|b");
    let header = message.segment(1).unwrap();
    assert!(matches!(
        header.delete(1),
        Err(Error::InvalidOperation(_))
    ));
    assert!(matches!(
        header.delete(2),
        Err(Error::InvalidOperation(_))
    ));
    assert!(matches!(
        header.insert(2, "x"),
        Err(Error::InvalidOperation(_))
    ));
}

#[test]
fn test_sparse_repetition_writes() {
    let message = Message::parse("MSH|^~\\&|\rPID|");
    let field = message.segment(2).unwrap().field(1).unwrap();

    field.repetition(3).unwrap().set_value("A").unwrap();
    field.repetition(1).unwrap().set_value("B").unwrap();

    assert_eq!(field.value().as_deref(), Some("B~~A"));
    assert_eq!(field.repetition(2).unwrap().value(), None);
    assert_eq!(field.count(), 3);
}

#[test]
fn test_sparse_gap_renders_delimiters_only() {
    let message = Message::parse("MSH|^~\\&");
    let segment = message.segment(3).unwrap();
    segment.field(4).unwrap().set_value("X").unwrap();

    assert_eq!(
        message.value().as_deref(),
        Some("MSH|^~\\&\r\r||||X")
    );
    assert_eq!(segment.field(2).unwrap().value(), None);
    assert_eq!(message.segment(2).unwrap().value(), None);
}

#[test]
fn test_mutation_locality() {
    let message = Message::parse(ADT);
    let before = message.value().unwrap();
    let name = message.segment(2).unwrap().field(5).unwrap();
    name.repetition(1)
        .unwrap()
        .component(2)
        .unwrap()
        .set_value("ROBERT")
        .unwrap();

    let after = message.value().unwrap();
    assert_eq!(after, before.replace("SMITH^JOHN^Q", "SMITH^ROBERT^Q"));
    // Siblings and ancestors read the same as before.
    assert_eq!(
        message.segment(3).unwrap().value().as_deref(),
        Some("NK1|1|SMITH^JANE|SPO")
    );
    assert_eq!(
        message
            .segment(2)
            .unwrap()
            .field(3)
            .unwrap()
            .value()
            .as_deref(),
        Some("555-44-3333")
    );
}

#[test]
fn test_cache_coherence_after_ancestor_write() {
    let message = Message::parse(ADT);
    let component = message
        .segment(2)
        .unwrap()
        .field(5)
        .unwrap()
        .repetition(1)
        .unwrap()
        .component(2)
        .unwrap();
    assert_eq!(component.value().as_deref(), Some("JOHN"));

    // Rewrite the whole segment above the cursor.
    message
        .segment(2)
        .unwrap()
        .set_value("PID|1||99||DOE^JANE")
        .unwrap();
    assert_eq!(component.value().as_deref(), Some("JANE"));

    // Rewrite the whole message above everything.
    message
        .set_value("MSH|^~\\&|A\rPID|||||X^Y")
        .unwrap();
    assert_eq!(component.value().as_deref(), Some("Y"));
}

#[test]
fn test_descendants_observe_header_delimiter_change() {
    let message = Message::parse("MSH|^~\\&|a^b");
    let repetition = message
        .segment(1)
        .unwrap()
        .field(3)
        .unwrap()
        .repetition(1)
        .unwrap();
    assert_eq!(repetition.component(1).unwrap().value().as_deref(), Some("a"));

    // Swap the component delimiter; the same cursor re-splits.
    message
        .segment(1)
        .unwrap()
        .field(2)
        .unwrap()
        .set_value("$~\\&")
        .unwrap();
    assert_eq!(message.separators().component, '$');
    assert_eq!(
        repetition.component(1).unwrap().value().as_deref(),
        Some("a^b")
    );
}

#[test]
fn test_setting_invalid_delimiters_is_rejected() {
    let message = Message::parse("MSH|^~\\&|a");
    let header = message.segment(1).unwrap();
    assert!(matches!(
        header.field(1).unwrap().set_value("^"),
        Err(Error::InvalidDelimiter(_))
    ));
    assert!(matches!(
        header.field(1).unwrap().set_value("||"),
        Err(Error::InvalidDelimiter(_))
    ));
    assert!(matches!(
        header.field(2).unwrap().set_value("^^\\&"),
        Err(Error::InvalidDelimiter(_))
    ));
    // State unchanged on failure.
    assert_eq!(message.value().as_deref(), Some("MSH|^~\\&|a"));
}

#[test]
fn test_type_code_change_guard() {
    let message = Message::parse("MSH|^~\\&|a\rPID|1");
    assert!(matches!(
        message.segment(1).unwrap().set_type_code("PID"),
        Err(Error::InvalidOperation(_))
    ));
    assert!(matches!(
        message.segment(2).unwrap().set_type_code("MSH"),
        Err(Error::InvalidOperation(_))
    ));
    message.segment(2).unwrap().set_type_code("NK1").unwrap();
    assert_eq!(
        message.segment(2).unwrap().type_code().as_deref(),
        Some("NK1")
    );
}

#[test]
fn test_detached_clone_independence() {
    let message = Message::parse(ADT);
    let segment = message.segment(2).unwrap();
    let clone = segment.detached();
    let original_field = clone.field(3).unwrap().value();

    segment.field(3).unwrap().set_value("CHANGED").unwrap();
    assert_eq!(clone.field(3).unwrap().value(), original_field);

    clone.field(7).unwrap().set_value("CLONE-ONLY").unwrap();
    assert_eq!(segment.field(7).unwrap().value(), None);
}

#[test]
fn test_detached_clone_keeps_custom_separators() {
    let message = Message::parse("MSH#$%*+#one$two#three");
    let segment = message.segment(1).unwrap();
    let clone = segment.detached();
    assert_eq!(clone.field(3).unwrap().value().as_deref(), Some("one$two"));
    assert_eq!(
        clone
            .field(3)
            .unwrap()
            .repetition(1)
            .unwrap()
            .component(2)
            .unwrap()
            .value()
            .as_deref(),
        Some("two")
    );
}

#[test]
fn test_values_iterator_is_lazy() {
    let message = Message::parse("MSH|^~\\&|a|b|c");
    let header = message.segment(1).unwrap();
    let mut values = header.values();
    assert_eq!(values.next(), Some(Some("|".to_string())));
    assert_eq!(values.next(), Some(Some("^~\\&".to_string())));

    // An edit made mid-iteration is observed by later steps.
    header.field(4).unwrap().set_value("B").unwrap();
    assert_eq!(values.next(), Some(Some("a".to_string())));
    assert_eq!(values.next(), Some(Some("B".to_string())));
    assert_eq!(values.next(), Some(Some("c".to_string())));
    assert_eq!(values.next(), None);
}

#[test]
fn test_set_values_joins_with_child_delimiter() {
    let message = Message::parse("MSH|^~\\&|\rPID|x");
    let field = message.segment(2).unwrap().field(1).unwrap();
    field.set_values(&["A", "", "C"]).unwrap();

    assert_eq!(field.value().as_deref(), Some("A~~C"));
    assert_eq!(message.value().as_deref(), Some("MSH|^~\\&|\rPID|A~~C"));
    assert_eq!(field.repetition(1).unwrap().value().as_deref(), Some("A"));
    assert_eq!(field.repetition(2).unwrap().value(), None);
    assert_eq!(field.repetition(3).unwrap().value().as_deref(), Some("C"));

    let values: Vec<_> = field.values().collect();
    assert_eq!(
        values,
        vec![Some("A".to_string()), None, Some("C".to_string())]
    );
}

#[test]
fn test_segments_named() {
    let message = Message::parse("MSH|^~\\&|A\rOBX|1|x\rNTE|1\rOBX|2|y");
    let ids: Vec<_> = message
        .segments_named("OBX")
        .filter_map(|s| s.field(1).unwrap().value())
        .collect();
    assert_eq!(ids, vec!["1", "2"]);
}

#[test]
fn test_check_header() {
    assert!(Message::parse(ADT).check_header().is_ok());
    assert!(matches!(
        Message::parse("PID|1").check_header(),
        Err(Error::MalformedHeader(_))
    ));
    assert!(matches!(
        Message::parse("MSH|^").check_header(),
        Err(Error::MalformedHeader(_))
    ));
    assert!(matches!(
        Message::parse("MSH|^|\\&|x").check_header(),
        Err(Error::MalformedHeader(_))
    ));
}

#[test]
fn test_escape_via_element() {
    let message = Message::parse("MSH|^~\\&|a");
    assert_eq!(message.escape("a|b^c"), "a\\F\\b\\S\\c");
    assert_eq!(message.unescape("a\\F\\b\\S\\c"), "a|b^c");
}

#[test]
fn test_empty_segments_preserve_index() {
    let message = Message::parse("MSH|^~\\&|A\r\rPID|1");
    assert_eq!(message.segment(2).unwrap().value(), None);
    assert_eq!(
        message.segment(3).unwrap().type_code().as_deref(),
        Some("PID")
    );
    assert_eq!(message.count(), 3);
}

#[test]
fn test_has_significant_descendants() {
    let message = Message::parse("MSH|^~\\&|plain|a^b");
    let header = message.segment(1).unwrap();
    assert!(header.has_significant_descendants());
    assert!(!header.field(3).unwrap().has_significant_descendants());
    assert!(header.field(4).unwrap().has_significant_descendants());
    assert!(!header.field(2).unwrap().has_significant_descendants());
}

#[test]
fn test_high_index_access_is_exact() {
    let message = Message::parse("MSH|^~\\&");
    let segment = message.segment(1).unwrap();
    segment.field(10_000).unwrap().set_value("far").unwrap();

    assert_eq!(segment.field(10_000).unwrap().value().as_deref(), Some("far"));
    assert_eq!(segment.field(9_999).unwrap().value(), None);
    assert_eq!(segment.count(), 10_000);
    // 3 header characters + delimiter + encoding + 9 998 padding
    // delimiters + payload.
    let value = message.value().unwrap();
    assert_eq!(value.len(), "MSH|^~\\&".len() + 9_998 + 3);
}

#[test]
fn test_typed_converter_round_trip() {
    let message = Message::parse("MSH|^~\\&|42|3.14|20230506|20230506083045|Y|hello");
    let header = message.segment(1).unwrap();

    assert_eq!(header.field(3).unwrap().codec().int(), 42);
    assert_eq!(
        header.field(4).unwrap().codec().decimal(),
        "3.14".parse().unwrap()
    );
    let date = header.field(5).unwrap().codec().date().unwrap();
    assert_eq!(date, chrono::NaiveDate::from_ymd_opt(2023, 5, 6).unwrap());
    let datetime = header.field(6).unwrap().codec().datetime().unwrap();
    assert_eq!(datetime.format("%H%M%S").to_string(), "083045");
    assert_eq!(header.field(7).unwrap().codec().flag(), Some(true));

    // Lax numeric getters read as zero on junk or absence, the
    // optional ones as None; strict ones report the text.
    let not_a_number = header.field(8).unwrap();
    assert_eq!(not_a_number.codec().int(), 0);
    assert_eq!(not_a_number.codec().decimal(), rust_decimal::Decimal::ZERO);
    assert_eq!(not_a_number.codec().date(), None);
    assert_eq!(header.field(20).unwrap().codec().int(), 0);
    assert!(matches!(
        not_a_number.codec().try_int(),
        Err(Error::ConversionFailure(_))
    ));

    // Setters write canonical lexical forms.
    let field = header.field(9).unwrap();
    field
        .codec()
        .set_date(chrono::NaiveDate::from_ymd_opt(1987, 6, 12).unwrap())
        .unwrap();
    assert_eq!(field.value().as_deref(), Some("19870612"));
    field.codec().set_text("a|b").unwrap();
    assert_eq!(field.value().as_deref(), Some("a\\F\\b"));
    assert_eq!(field.codec().text().as_deref(), Some("a|b"));
}

#[test]
fn test_value_equality_is_ordinal() {
    let message = Message::parse("MSH|^~\\&|x|x|y");
    let header = message.segment(1).unwrap();
    assert_eq!(header.field(3).unwrap(), header.field(4).unwrap());
    assert_ne!(header.field(3).unwrap(), header.field(5).unwrap());
    assert!(header.field(3).unwrap() < header.field(5).unwrap());
}
