use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use xeger_core::{CharSet, FALLBACK_CHAR, PRINTABLE_MAX};
use xeger_generate::Xeger;

const UUID: &str = "^[0-9a-f]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12}$";

fn rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

#[test]
fn uuid_shaped_pattern_yields_distinct_matches() {
    let xeger = Xeger::new(UUID).expect("uuid pattern");
    let uuids = xeger.emit_set(5, &mut rng(42), 5).expect("five uuids");
    assert_eq!(uuids.len(), 5);
    for uuid in &uuids {
        assert!(xeger.matches(uuid), "{uuid}");
        let segments: Vec<usize> = uuid.split('-').map(str::len).collect();
        assert_eq!(segments, [8, 4, 4, 4, 12]);
        assert!(
            uuid.chars()
                .all(|c| c == '-' || c.is_ascii_digit() || ('a'..='f').contains(&c))
        );
    }
}

#[test]
fn alternation_of_literals_confounds_by_reversal() {
    let xeger = Xeger::new("ab|cd").expect("pattern");
    let mut rng = rng(7);
    for _ in 0..50 {
        let text = xeger.emit(&mut rng);
        assert!(text == "ab" || text == "cd", "{text}");
    }

    let confounded = xeger.confound().expect("reversible literals");
    for _ in 0..50 {
        let text = confounded.emit(&mut rng);
        assert!(text == "ba" || text == "dc", "{text}");
        assert!(confounded.matches(&text));
        assert!(!xeger.matches(&text));
    }
}

#[test]
fn exact_repetition_and_its_confounded_form() {
    let xeger = Xeger::new("a{3}").expect("pattern");
    let confounded = xeger.confound().expect("bounds confound");
    let mut rng = rng(3);
    for _ in 0..50 {
        assert_eq!(xeger.emit(&mut rng), "aaa");
        let text = confounded.emit(&mut rng);
        assert!(text.len() < 3, "{text}");
        assert!(text.chars().all(|c| c == 'a'));
    }
    let rejected = confounded.emit_checked(&mut rng).expect("short run");
    assert_ne!(rejected, "aaa");
}

#[test]
fn backreference_replays_its_capture() {
    let xeger = Xeger::new("(foo)\\1").expect("pattern");
    let mut rng = rng(9);
    assert_eq!(xeger.emit(&mut rng), "foofoo");
    assert_eq!(
        xeger.emit_checked_with(&mut rng, 1).as_deref(),
        Some("foofoo")
    );
}

#[test]
fn full_printable_class_confounds_to_an_empty_pick() {
    let mut everything = CharSet::printable();
    everything.widen(PRINTABLE_MAX);
    let outside = everything.complement().intersection(&CharSet::printable());
    assert_eq!(outside.pick(&mut rng(1)), None);

    for pattern in ["[ -~]", "[ -~\\t]+"] {
        let xeger = Xeger::new(pattern).expect("pattern");
        let confounded = xeger.confound().expect("class confounds");
        let text = confounded.emit(&mut rng(1));
        assert!(!text.is_empty());
        assert!(
            text.chars().all(|c| c == FALLBACK_CHAR),
            "{pattern}: {text:?}"
        );
        assert!(!xeger.matches(&text));
    }
}

#[test]
fn unbounded_repetition_stays_in_the_working_window() {
    let xeger = Xeger::new("a{5,}").expect("pattern");
    let mut rng = rng(5);
    for _ in 0..300 {
        let text = xeger.emit(&mut rng);
        assert!((5..=17).contains(&text.len()), "{}", text.len());
    }
}

#[test]
fn emission_does_not_change_the_tree() {
    let xeger = Xeger::new("(a|b)[x-z]{2,4}\\d+\\1").expect("pattern");
    let before = xeger.tree().to_string();
    let nodes = xeger.tree().node_count();
    let mut rng = rng(12);
    let first = xeger.emit(&mut rng);
    let mut last = String::new();
    for _ in 0..100 {
        last = xeger.emit(&mut rng);
        assert!(xeger.matches(&last), "{last}");
    }
    assert_eq!(xeger.tree().to_string(), before);
    assert_eq!(xeger.tree().node_count(), nodes);
    let _ = xeger.confound().expect("confoundable");
    assert_eq!(xeger.tree().to_string(), before);
    assert!(!first.is_empty() && !last.is_empty());
}

#[test]
fn confounded_kinds_are_rejected_by_the_pattern() {
    let mut rng = rng(99);
    for pattern in ["[0-9]{4}", "\\d+", "[a-f]{2,}", "[[:upper:]]{3}", "x\\s+y"] {
        let xeger = Xeger::new(pattern).expect("pattern");
        let confounded = xeger.confound().expect("confoundable");
        let mut accepted = 0;
        for _ in 0..40 {
            let text = confounded.emit(&mut rng);
            if !xeger.matches(&text) {
                accepted += 1;
            }
        }
        assert!(accepted >= 36, "{pattern}: only {accepted}/40 rejected");
    }
}

#[test]
fn partially_supported_patterns_emit_from_remaining_branches() {
    let xeger = Xeger::new("id-\\d{3}|(?=x)xyz").expect("partial pattern");
    assert_eq!(xeger.skipped().len(), 1);
    let mut rng = rng(14);
    for _ in 0..20 {
        let text = xeger.emit_checked(&mut rng).expect("supported branch");
        assert!(text.starts_with("id-"), "{text}");
    }
}

#[test]
fn unsupported_and_invalid_patterns_are_distinguished() {
    let unsupported = Xeger::new("(?i)abc").expect_err("flags are unsupported");
    assert!(unsupported.is_unsupported());
    let invalid = Xeger::new("(abc").expect_err("unclosed group");
    assert!(!invalid.is_unsupported());
}
