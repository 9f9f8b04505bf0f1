use super::*;

fn absorb_all(lines: &[&str]) -> String {
    let mut acc = TranscriptAccumulator::new();
    for line in lines {
        acc.absorb(line);
    }
    acc.finalize().content
}

// =============================================================
// Normalization rules
// =============================================================

#[test]
fn words_are_space_joined() {
    assert_eq!(absorb_all(&["Hello", "world"]), "Hello world");
}

#[test]
fn first_text_gets_no_prefix() {
    assert_eq!(absorb_all(&["# Plan"]), "# Plan");
}

#[test]
fn heading_gets_paragraph_break_then_text_space_joins() {
    assert_eq!(absorb_all(&["Intro", "# Heading", "more text"]), "Intro\n\n# Heading more text");
}

#[test]
fn heading_levels_one_through_six_break() {
    for level in 1..=6 {
        let heading = format!("{} Title", "#".repeat(level));
        assert_eq!(absorb_all(&["a", &heading]), format!("a\n\n{heading}"));
    }
}

#[test]
fn seven_hashes_is_not_a_heading() {
    assert_eq!(absorb_all(&["a", "####### nope"]), "a ####### nope");
}

#[test]
fn hash_without_space_is_not_a_heading() {
    assert_eq!(absorb_all(&["a", "#tag"]), "a #tag");
}

#[test]
fn bullets_and_numbered_items_break() {
    assert_eq!(
        absorb_all(&["Try:", "* Squats", "1. Warm up", "12. Stretch"]),
        "Try:\n\n* Squats\n\n1. Warm up\n\n12. Stretch"
    );
}

#[test]
fn whole_line_emphasis_breaks() {
    assert_eq!(absorb_all(&["a", "**Day 1**"]), "a\n\n**Day 1**");
    assert_eq!(absorb_all(&["a", "*rest*"]), "a\n\n*rest*");
    assert_eq!(absorb_all(&["a", "__Tip__"]), "a\n\n__Tip__");
}

#[test]
fn partial_emphasis_space_joins() {
    assert_eq!(absorb_all(&["a", "**bold** start"]), "a **bold** start");
}

#[test]
fn bare_markers_are_not_emphasis() {
    assert_eq!(absorb_all(&["a", "**"]), "a **");
}

#[test]
fn empty_text_appends_nothing() {
    assert_eq!(absorb_all(&["a", "", "b"]), "a b");
}

#[test]
fn text_after_newline_is_not_space_joined() {
    assert_eq!(absorb_all(&["a\n", "b"]), "a\nb");
}

// =============================================================
// Snapshots and lifecycle
// =============================================================

#[test]
fn absorb_returns_independent_snapshots() {
    let mut acc = TranscriptAccumulator::new();
    let first = acc.absorb("one");
    let second = acc.absorb("two");
    assert_eq!(first.content, "one");
    assert_eq!(second.content, "one two");
    assert!(second.open);
}

#[test]
fn finalize_closes_and_next_absorb_starts_fresh() {
    let mut acc = TranscriptAccumulator::new();
    acc.absorb("first");
    let last = acc.finalize();
    assert_eq!(last, MessageSnapshot { content: "first".to_owned(), open: false });
    assert!(!acc.has_open_message());
    assert_eq!(acc.absorb("second").content, "second");
}

#[test]
fn finalize_without_text_is_empty() {
    let mut acc = TranscriptAccumulator::new();
    assert_eq!(acc.finalize(), MessageSnapshot { content: String::new(), open: false });
}

#[test]
fn reset_discards_open_message() {
    let mut acc = TranscriptAccumulator::new();
    acc.absorb("stale");
    acc.reset();
    assert!(acc.snapshot().is_none());
    assert_eq!(acc.absorb("fresh").content, "fresh");
}
