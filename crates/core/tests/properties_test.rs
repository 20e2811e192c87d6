//! Property tests over generated transcripts.

use std::io::Cursor;

use agent_tally_core::{parse_reader, ParseOptions, ParsedTranscript, Usage};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Kind {
    User,
    Assistant,
    Result,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UsagePlacement {
    TopLevel,
    Nested,
}

fn kind_strategy() -> impl Strategy<Value = Kind> {
    prop_oneof![
        Just(Kind::User),
        Just(Kind::Assistant),
        Just(Kind::Result),
        Just(Kind::Other),
    ]
}

fn usage_strategy() -> impl Strategy<Value = Option<Usage>> {
    proptest::option::of(
        (0u64..50_000, 0u64..50_000, 0u64..50_000, 0u64..50_000)
            .prop_map(|(i, o, cr, cw)| Usage::new(i, o, cr, cw)),
    )
}

fn usage_json(u: &Usage) -> String {
    format!(
        r#"{{"input_tokens":{},"output_tokens":{},"cache_read_input_tokens":{},"cache_creation_input_tokens":{}}}"#,
        u.input_tokens, u.output_tokens, u.cache_read_tokens, u.cache_write_tokens
    )
}

fn render(kind: Kind, usage: Option<&Usage>, placement: UsagePlacement) -> String {
    let type_name = match kind {
        Kind::User => "user",
        Kind::Assistant => "assistant",
        Kind::Result => "result",
        Kind::Other => "progress",
    };
    let (top, nested) = match (usage, placement) {
        (Some(u), UsagePlacement::TopLevel) => (format!(r#","usage":{}"#, usage_json(u)), String::new()),
        (Some(u), UsagePlacement::Nested) => (String::new(), format!(r#","usage":{}"#, usage_json(u))),
        (None, _) => (String::new(), String::new()),
    };
    format!(
        r#"{{"type":"{type_name}","message":{{"role":"{type_name}","content":"text"{nested}}}{top}}}"#
    )
}

fn parse(lines: &[String]) -> ParsedTranscript {
    let input = lines.join("\n");
    parse_reader(Cursor::new(input), "generated.jsonl", &ParseOptions::default()).unwrap()
}

fn records() -> impl Strategy<Value = Vec<(Kind, Option<Usage>)>> {
    proptest::collection::vec((kind_strategy(), usage_strategy()), 0..40)
}

proptest! {
    #[test]
    fn turn_count_is_min_of_message_counts(recs in records()) {
        let lines: Vec<String> = recs
            .iter()
            .map(|(k, u)| render(*k, u.as_ref(), UsagePlacement::Nested))
            .collect();
        let parsed = parse(&lines);
        let m = &parsed.metrics;
        prop_assert_eq!(m.turn_count, m.user_messages.min(m.assistant_messages));

        let users = recs.iter().filter(|(k, _)| matches!(k, Kind::User)).count() as u32;
        let assistants = recs.iter().filter(|(k, _)| matches!(k, Kind::Assistant)).count() as u32;
        prop_assert_eq!(m.user_messages, users);
        prop_assert_eq!(m.assistant_messages, assistants);
    }

    #[test]
    fn usage_totals_ignore_nesting(recs in records(), flips in proptest::collection::vec(any::<bool>(), 40)) {
        let top: Vec<String> = recs
            .iter()
            .map(|(k, u)| render(*k, u.as_ref(), UsagePlacement::TopLevel))
            .collect();
        let mixed: Vec<String> = recs
            .iter()
            .zip(flips.iter())
            .map(|((k, u), flip)| {
                let placement = if *flip { UsagePlacement::Nested } else { UsagePlacement::TopLevel };
                render(*k, u.as_ref(), placement)
            })
            .collect();

        let mut expected = Usage::default();
        for (_, u) in &recs {
            if let Some(u) = u {
                expected.add(u);
            }
        }

        prop_assert_eq!(parse(&top).metrics.usage, expected);
        prop_assert_eq!(parse(&mixed).metrics.usage, expected);
    }

    #[test]
    fn garbage_line_does_not_change_metrics(
        recs in records(),
        position in any::<prop::sample::Index>(),
        garbage in "garbage[a-z{}\\[\\]:,\" ]{0,30}",
    ) {
        let clean: Vec<String> = recs
            .iter()
            .map(|(k, u)| render(*k, u.as_ref(), UsagePlacement::Nested))
            .collect();
        let mut dirty = clean.clone();
        dirty.insert(position.index(clean.len() + 1), garbage);

        let clean_parsed = parse(&clean);
        let dirty_parsed = parse(&dirty);
        prop_assert_eq!(&dirty_parsed.metrics, &clean_parsed.metrics);
        prop_assert_eq!(&dirty_parsed.tools, &clean_parsed.tools);
        prop_assert_eq!(dirty_parsed.stats.lines_skipped, clean_parsed.stats.lines_skipped + 1);
    }
}
