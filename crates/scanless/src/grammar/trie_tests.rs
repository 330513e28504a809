use super::trie::LiteralTrie;

fn alts(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn longest_alternative_wins() {
    let trie = LiteralTrie::new(&alts(&["<", "<=", "<<"]), false);
    assert_eq!(trie.longest_match("<= 1"), Some((2, 1)));
    assert_eq!(trie.longest_match("<< 1"), Some((2, 2)));
    assert_eq!(trie.longest_match("< 1"), Some((1, 0)));
    assert_eq!(trie.longest_match("> 1"), None);
}

#[test]
fn first_declaration_wins_on_duplicates() {
    let trie = LiteralTrie::new(&alts(&["if", "if"]), false);
    assert_eq!(trie.longest_match("if"), Some((2, 0)));
}

#[test]
fn case_insensitive_folding() {
    let trie = LiteralTrie::new(&alts(&["SELECT", "FROM"]), true);
    assert_eq!(trie.longest_match("select *"), Some((6, 0)));
    assert_eq!(trie.longest_match("From t"), Some((4, 1)));
}

#[test]
fn first_chars_cover_both_cases_when_folding() {
    let trie = LiteralTrie::new(&alts(&["select"]), true);
    let chars: Vec<char> = trie.first_chars().collect();
    assert!(chars.contains(&'s'));
    assert!(chars.contains(&'S'));
}

#[test]
fn prefix_of_longer_alternative_matches() {
    let trie = LiteralTrie::new(&alts(&["for", "foreach"]), false);
    assert_eq!(trie.longest_match("foreach x"), Some((7, 1)));
    assert_eq!(trie.longest_match("form"), Some((3, 0)));
}
