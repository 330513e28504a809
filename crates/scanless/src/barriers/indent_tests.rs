use indoc::indoc;

use super::indent::{IndentMode, IndentTokenizer, DEDENT, INDENT, NEWLINE};
use super::BarrierTokenizer;

fn aliases_of(tokenizer: &IndentTokenizer, input: &str) -> Vec<String> {
    tokenizer
        .tokenize(input)
        .expect("tokenizes")
        .into_iter()
        .map(|t| t.alias)
        .collect()
}

#[test]
fn hybrid_emits_runs_per_level_delta() {
    let input = indoc! {"
        def a():
            b = c;
        a = p;
        if c:
            h = i;
            if b:
                a = aa;
    "};
    let tokenizer = IndentTokenizer::new(IndentMode::Hybrid, 4);
    let aliases = aliases_of(&tokenizer, input);
    assert_eq!(
        aliases,
        vec![INDENT, DEDENT, INDENT, INDENT, DEDENT, DEDENT]
    );
}

#[test]
fn hybrid_double_indent_in_one_step() {
    let input = "a:\n        b\n";
    let tokenizer = IndentTokenizer::new(IndentMode::Hybrid, 4);
    let aliases = aliases_of(&tokenizer, input);
    assert_eq!(aliases, vec![INDENT, INDENT, DEDENT, DEDENT]);
}

#[test]
fn barrier_positions_sit_at_first_content_char() {
    let input = "a:\n    b\n";
    let tokenizer = IndentTokenizer::new(IndentMode::Hybrid, 4);
    let tokens = tokenizer.tokenize(input).expect("tokenizes");
    assert_eq!(tokens[0].alias, INDENT);
    assert_eq!(tokens[0].position, input.find('b').unwrap());
    assert_eq!(tokens[0].length, 0);
    // The closing dedent flushes at end of input.
    assert_eq!(tokens[1].position, input.len());
}

#[test]
fn blank_lines_do_not_change_state() {
    let input = "a:\n    b\n\n   \n    c\nd\n";
    let tokenizer = IndentTokenizer::new(IndentMode::Hybrid, 4);
    let aliases = aliases_of(&tokenizer, input);
    assert_eq!(aliases, vec![INDENT, DEDENT]);
}

#[test]
fn tabs_advance_to_the_next_stop() {
    // One tab is a full indent level of 4 columns.
    let input = "a:\n\tb\n";
    let tokenizer = IndentTokenizer::new(IndentMode::Hybrid, 4);
    let aliases = aliases_of(&tokenizer, input);
    assert_eq!(aliases, vec![INDENT, DEDENT]);
}

#[test]
fn soft_mode_tracks_a_column_stack() {
    let input = "a\n  b\n     c\n  d\ne\n";
    let tokenizer = IndentTokenizer::new(IndentMode::Soft, 4);
    let aliases = aliases_of(&tokenizer, input);
    // Columns 0, 2, 5, 2, 0: two pushes, then one pop per drop.
    assert_eq!(aliases, vec![INDENT, INDENT, DEDENT, DEDENT]);
}

#[test]
fn strict_mode_rejects_misaligned_columns() {
    let input = "a:\n   b\n";
    let tokenizer = IndentTokenizer::new(IndentMode::Strict, 4);
    let error = tokenizer.tokenize(input).expect_err("3 columns misaligned");
    assert_eq!(error.position, input.find('b').unwrap());
    assert!(error.message.contains("not a multiple of 4"));
}

#[test]
fn strict_mode_accepts_aligned_columns() {
    let input = "a:\n    b\n        c\n";
    let tokenizer = IndentTokenizer::new(IndentMode::Strict, 4);
    let aliases = aliases_of(&tokenizer, input);
    assert_eq!(aliases, vec![INDENT, INDENT, DEDENT, DEDENT]);
}

#[test]
fn newline_emission_is_opt_in() {
    let input = "a\nb\n";
    let plain = IndentTokenizer::new(IndentMode::Hybrid, 4);
    assert!(aliases_of(&plain, input).is_empty());

    let with_newlines = IndentTokenizer::new(IndentMode::Hybrid, 4).with_newlines();
    let aliases = aliases_of(&with_newlines, input);
    assert_eq!(aliases, vec![NEWLINE, NEWLINE]);
    assert_eq!(
        with_newlines.aliases(),
        vec![INDENT.to_string(), DEDENT.to_string(), NEWLINE.to_string()]
    );
}
