use super::*;

const PUSHUP_JSON: &str = r#"[{"exercise":"pushup","difficulty":"easy","video_url":"A","short_url":"B"}]"#;

fn pushup() -> VideoLink {
    VideoLink {
        exercise: "pushup".to_owned(),
        difficulty: "easy".to_owned(),
        video_url: "A".to_owned(),
        short_url: "B".to_owned(),
    }
}

/// Final content and every emitted record for a chunk sequence.
fn run(chunks: &[&str]) -> (String, Vec<Vec<VideoLink>>) {
    let mut assembler = ResponseAssembler::new();
    let mut blocks = Vec::new();
    for chunk in chunks {
        if let Some(links) = assembler.push_chunk(chunk).video_links {
            blocks.push(links);
        }
    }
    (assembler.finish().content, blocks)
}

fn run_bytes(chunks: &[&[u8]]) -> (String, Vec<VideoLink>) {
    let mut assembler = ResponseAssembler::new();
    let mut links = Vec::new();
    for chunk in chunks {
        if let Some(block) = assembler.push_bytes(chunk).video_links {
            links.extend(block);
        }
    }
    (assembler.finish().content, links)
}

fn sample_stream() -> String {
    format!(
        "data: VIDEO_LINKS_START\n\ndata: {PUSHUP_JSON}\n\ndata: VIDEO_LINKS_END\n\n\
         data: Here is a plan\n\ndata: # Day 1\n\ndata: * 10 push-ups\n\n\
         data: then rest\n\ndata: **Caf\u{e9} break**\n\ndata: done\n\n"
    )
}

// =============================================================
// Scenarios
// =============================================================

#[test]
fn scenario_a_space_joins_split_record() {
    let (content, blocks) = run(&["data: Hello", "\n\n", "data: world\n\n"]);
    assert_eq!(content, "Hello world");
    assert!(blocks.is_empty());
}

#[test]
fn scenario_b_sideband_only_stream() {
    let second = format!("data: {PUSHUP_JSON}\n\n");
    let (content, blocks) =
        run(&["data: VIDEO_LINKS_START\n\n", &second, "data: VIDEO_LINKS_END\n\n"]);
    assert_eq!(content, "");
    assert_eq!(blocks, vec![vec![pushup()]]);
}

#[test]
fn scenario_c_unterminated_block_never_emits() {
    let (content, blocks) = run(&["data: VIDEO_LINKS_START\n\ndata: not-json\n\n"]);
    assert_eq!(content, "");
    assert!(blocks.is_empty());
}

#[test]
fn scenario_d_heading_then_text() {
    let (content, _) = run(&["data: Plan\n\n", "data: # Heading\n\n", "data: more text\n\n"]);
    assert_eq!(content, "Plan\n\n# Heading more text");
}

#[test]
fn scenario_d_heading_as_first_line_has_no_break() {
    let (content, _) = run(&["data: # Heading\n\n", "data: more text\n\n"]);
    assert_eq!(content, "# Heading more text");
}

// =============================================================
// Outcome shape
// =============================================================

#[test]
fn chunk_without_complete_record_changes_nothing() {
    let mut assembler = ResponseAssembler::new();
    assert!(assembler.push_chunk("data: partial").is_empty());
}

#[test]
fn outcome_carries_latest_snapshot_of_chunk() {
    let mut assembler = ResponseAssembler::new();
    let outcome = assembler.push_chunk("data: a\n\ndata: b\n\n");
    assert_eq!(outcome.message.unwrap().content, "a b");
}

#[test]
fn push_payload_skips_framing() {
    let mut assembler = ResponseAssembler::new();
    let outcome = assembler.push_payload("plain answer");
    assert_eq!(outcome.message.unwrap().content, "plain answer");
}

#[test]
fn reset_discards_partial_state() {
    let mut assembler = ResponseAssembler::new();
    assembler.push_chunk("data: stale\n\ndata: VIDEO_LINKS_START\n\ndata: [");
    assembler.reset();
    let outcome = assembler.push_chunk("data: fresh\n\n");
    assert_eq!(outcome.message.unwrap().content, "fresh");
    assert_eq!(assembler.finish().content, "fresh");
}

// =============================================================
// Chunk-boundary invariance
// =============================================================

#[test]
fn every_two_way_split_matches_single_chunk() {
    let stream = sample_stream();
    let expected = run(&[&stream]);
    assert_eq!(expected.1, vec![vec![pushup()]]);

    for (at, _) in stream.char_indices().skip(1) {
        let (head, tail) = stream.split_at(at);
        assert_eq!(run(&[head, tail]), expected, "split at {at}");
    }
}

#[test]
fn every_three_way_split_matches_single_chunk() {
    let stream = sample_stream();
    let expected = run(&[&stream]);
    let bounds: Vec<usize> = stream.char_indices().map(|(i, _)| i).skip(1).collect();

    for (n, &first) in bounds.iter().enumerate() {
        for &second in bounds.iter().skip(n + 1).step_by(7) {
            let chunks = [&stream[..first], &stream[first..second], &stream[second..]];
            assert_eq!(run(&chunks), expected, "split at {first}/{second}");
        }
    }
}

#[test]
fn byte_at_a_time_matches_single_chunk() {
    let stream = sample_stream();
    let (content, blocks) = run(&[&stream]);
    let chunks: Vec<&[u8]> = stream.as_bytes().chunks(1).collect();
    let (byte_content, links) = run_bytes(&chunks);
    assert_eq!(byte_content, content);
    assert_eq!(links, blocks.concat());
}

// =============================================================
// Direct answers
// =============================================================

#[test]
fn answer_lines_join_like_streamed_payloads() {
    let mut assembler = ResponseAssembler::new();
    let outcome = assembler.push_answer("Warm up\n# Day 1\nSquats", &[pushup()]);
    assert_eq!(outcome.video_links, Some(vec![pushup()]));
    assert_eq!(assembler.finish().content, "Warm up\n\n# Day 1 Squats");
}

#[test]
fn answer_without_links_reports_none() {
    let mut assembler = ResponseAssembler::new();
    let outcome = assembler.push_answer("ok", &[]);
    assert_eq!(outcome.video_links, None);
    assert_eq!(outcome.message.map(|m| m.content), Some("ok".to_owned()));
}
