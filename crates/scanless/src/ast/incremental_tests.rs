use crate::build::GrammarBuilder;
use crate::grammar::Parser;
use crate::test_utils::{ch, num, r, sep_by, tok};

use super::incremental::diff_change;
use super::TextChange;

fn list_parser() -> Parser {
    GrammarBuilder::new()
        .token("num", num())
        .rule("list", sep_by(r("num"), tok(ch('+')), 1))
        .main_rule("list")
        .skip_whitespaces()
        .build()
        .unwrap()
}

#[test]
fn diff_finds_the_single_change_window() {
    assert_eq!(diff_change("abc", "abc"), None);
    assert_eq!(
        diff_change("1 + 2 + 3", "1 + 25 + 3"),
        Some(TextChange {
            start: 5,
            old_length: 0,
            new_length: 1,
        })
    );
    assert_eq!(
        diff_change("abcdef", "abXYef"),
        Some(TextChange {
            start: 2,
            old_length: 2,
            new_length: 2,
        })
    );
    assert_eq!(
        diff_change("abc", "ab"),
        Some(TextChange {
            start: 2,
            old_length: 1,
            new_length: 0,
        })
    );
}

#[test]
fn reparse_replaces_only_the_edited_subtree() {
    let parser = list_parser();
    let old = parser.parse("1 + 2 + 3").unwrap();
    assert_eq!(old.version(), 1);

    let new = old.reparsed("1 + 25 + 3").unwrap();
    assert_eq!(new.version(), 2);
    assert_eq!(new.text(), "1 + 25 + 3");

    let versions: Vec<u32> = new.root().children().map(|c| c.version()).collect();
    // Only the edited element was rebuilt; its siblings kept their version.
    assert_eq!(versions, vec![1, 2, 1]);

    let starts: Vec<usize> = new.root().children().map(|c| c.start()).collect();
    assert_eq!(starts, vec![0, 4, 9]);
}

#[test]
fn reparse_matches_a_fresh_parse() {
    let parser = list_parser();
    let cases = [
        ("1 + 2 + 3", "1 + 25 + 3"),
        ("1 + 2 + 3", "1 + 3"),
        ("10 + 20", "10 + 20 + 30"),
        ("5", "50"),
    ];
    for (old_input, new_input) in cases {
        let old = parser.parse(old_input).unwrap();
        let incremental = old.reparsed(new_input).unwrap();
        let fresh = parser.parse(new_input).unwrap();
        assert_eq!(incremental.text(), fresh.text(), "{old_input} -> {new_input}");
        assert_eq!(
            incremental.value(),
            fresh.value(),
            "{old_input} -> {new_input}"
        );
    }
}

#[test]
fn unchanged_input_shares_the_whole_tree() {
    let parser = list_parser();
    let old = parser.parse("1 + 2").unwrap();
    let same = old.reparsed("1 + 2").unwrap();
    assert_eq!(same.version(), old.version());
    assert_eq!(same.root().parsed(), old.root().parsed());
}

#[test]
fn straddling_edits_reparse_the_parent() {
    let parser = list_parser();
    let old = parser.parse("1 + 2 + 3").unwrap();

    // The separator changed: no single child encloses the edit, so the
    // parent re-parses and the list ends early, exactly as a fresh parse.
    let edited = old.reparsed("1 * 2 + 3").unwrap();
    let fresh = parser.parse("1 * 2 + 3").unwrap();
    assert_eq!(edited.text(), fresh.text());
    assert_eq!(edited.text(), "1");

    let widened = old.reparsed("12 + 34 + 3").unwrap();
    let fresh = parser.parse("12 + 34 + 3").unwrap();
    assert_eq!(widened.value(), fresh.value());
}

#[test]
fn reparse_with_caching_reuses_the_memo() {
    let parser = GrammarBuilder::new()
        .token("num", num())
        .rule("list", sep_by(r("num"), tok(ch('+')), 1))
        .main_rule("list")
        .skip_whitespaces()
        .use_caching(true)
        .build()
        .unwrap();

    let old = parser.parse("1 + 2 + 3").unwrap();
    let new = old.reparsed("1 + 25 + 3").unwrap();
    let fresh = parser.parse("1 + 25 + 3").unwrap();
    assert_eq!(new.value(), fresh.value());
}
