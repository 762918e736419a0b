use triplecore::parse_ntriples_line;

#[test]
fn parses_a_well_formed_line_with_a_uri_object() {
    let triple = parse_ntriples_line("<http://example.org/a> <http://example.org/knows> <http://example.org/b> .").unwrap();
    assert_eq!(triple.subject, "<http://example.org/a>");
    assert_eq!(triple.predicate, "<http://example.org/knows>");
    assert_eq!(triple.object, "<http://example.org/b>");
}

#[test]
fn rejects_each_malformed_line_with_a_distinct_bad_input_message() {
    let bad_subject = parse_ntriples_line("notauri <http://p> <http://o> .").unwrap_err();
    let bad_object = parse_ntriples_line(r#"<http://a> <http://p> "unterminated ."#).unwrap_err();
    let missing_space = parse_ntriples_line("<http://a> <http://p> <http://o>.").unwrap_err();

    let messages = [bad_subject, bad_object, missing_space]
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    assert_eq!(messages.len(), 3);
    assert!(messages.iter().all(|m| !m.is_empty()));
    // all three are distinct failure modes, not the same message repeated.
    assert_ne!(messages[0], messages[1]);
    assert_ne!(messages[1], messages[2]);
}
