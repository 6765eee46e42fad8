use jakbeat_core::{
    Beat, compile_document,
    fixtures::demo_document,
    document::{DocumentError, MAX_NESTING},
    model::{format_beats, parse_beats},
    parse_document,
};
use proptest::prelude::*;

fn beat() -> impl Strategy<Value = Beat> {
    prop::sample::select(Beat::ALL.to_vec())
}

fn no_panic_compile(source: &str) -> bool {
    std::panic::catch_unwind(|| {
        let _ = compile_document(source);
    })
    .is_ok()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn glyphs_round_trip_ignoring_whitespace(
        beats in prop::collection::vec(beat(), 0..64),
        gaps in prop::collection::vec(prop::sample::select(vec!["", " ", "\t", "  "]), 64),
    ) {
        let spaced: String = format_beats(&beats)
            .chars()
            .zip(gaps.iter().cycle())
            .map(|(glyph, gap)| format!("{glyph}{gap}"))
            .collect();
        prop_assert_eq!(parse_beats(&spaced), Ok(beats));
    }

    #[test]
    fn alternate_glyphs_parse_to_the_same_beats(beats in prop::collection::vec(beat(), 0..64)) {
        let alternate: String = beats
            .iter()
            .map(|beat| match beat {
                Beat::Half => '/',
                Beat::Stop => '_',
                other => other.glyph(),
            })
            .collect();
        prop_assert_eq!(parse_beats(&alternate), Ok(beats));
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn random_documents_do_not_panic(raw in "[\\[\\]()=\" \nA-Za-z0-9!.:_/-]{0,256}") {
        prop_assert!(no_panic_compile(&raw));
        if let Ok(sections) = parse_document(&raw) {
            prop_assert!(sections.iter().all(|section| !section.name.is_empty() || raw.contains("\"\"")));
        }
    }

    #[test]
    fn truncated_documents_do_not_panic(prefix_len in 0usize..1024usize) {
        let source = demo_document();
        let cut = (0..=prefix_len.min(source.len()))
            .rev()
            .find(|index| source.is_char_boundary(*index))
            .unwrap_or_default();
        prop_assert!(no_panic_compile(&source[..cut]));
    }

    #[test]
    fn mutated_documents_do_not_panic(index in 0usize..1024usize, replacement in "[\\[\\]()=\" ]") {
        let mut source = demo_document().to_string();
        let target = index % source.len();
        if source.is_char_boundary(target) && source.is_char_boundary(target + 1) {
            source.replace_range(target..=target, &replacement);
        }
        prop_assert!(no_panic_compile(&source));
    }

    #[test]
    fn nesting_is_accepted_up_to_the_cap(depth in 1usize..4096usize) {
        let source = format!("[A]\nx = {}{}", "(".repeat(depth), ")".repeat(depth));
        let parsed = parse_document(&source);
        if depth <= MAX_NESTING {
            prop_assert!(parsed.is_ok());
        } else {
            prop_assert_eq!(parsed, Err(DocumentError::TooDeep { line: 2 }));
        }
    }
}
