use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use xeger_generate::{SampleRequest, Xeger, sample_pattern};

/// Field constraints of the kind found in schemas and form validators.
const CORPUS: &[&str] = &[
    "[a-z0-9._%+-]+@[a-z0-9.-]+\\.[a-z]{2,4}",
    "\\d{4}-\\d{2}-\\d{2}",
    "(19|20)\\d\\d-(0[1-9]|1[0-2])-(0[1-9]|[12]\\d|3[01])",
    "[0-9a-fA-F]{6}",
    "#?([0-9a-f]{3}){1,2}",
    "[A-Z]{3}-\\d{4}",
    "\\+?\\d{1,3}[ -]?\\(?\\d{3}\\)?[ -]?\\d{3}[ -]?\\d{4}",
    "(https?|ftp)://[a-z0-9-]+(\\.[a-z0-9-]+)+(/[a-z0-9_-]*)*",
    "[[:alpha:]][[:alnum:]_]{2,15}",
    "\\p{Lu}\\p{Ll}+",
    "v\\d+\\.\\d+\\.\\d+(-(alpha|beta|rc)\\.\\d+)?",
    "(?P<word>[a-z]+)-\\k<word>",
    "([a-z])\\1",
    "\\x41\\u0042[\\t ]C",
    "[^\\s]{3,8}",
    "(?:yes|no|maybe)",
    "[01]{8}",
    "\\w+\\s\\w+",
    "SKU-[A-Z0-9]{2}(-[A-Z0-9]{2})*",
    "\\d+(\\.\\d{1,2})?",
];

#[test]
fn checked_emissions_always_match() {
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    for pattern in CORPUS {
        let xeger = Xeger::new(pattern).expect(pattern);
        assert!(xeger.skipped().is_empty(), "{pattern}: {:?}", xeger.skipped());
        let mut emitted = 0;
        for _ in 0..25 {
            if let Some(text) = xeger.emit_checked(&mut rng) {
                assert!(xeger.matches(&text), "{pattern}: {text:?}");
                emitted += 1;
            }
        }
        assert!(emitted > 0, "{pattern} produced no checked emission");
    }
}

#[test]
fn confounded_emissions_are_rejected_when_checked() {
    let mut rng = ChaCha8Rng::seed_from_u64(77);
    for pattern in CORPUS {
        let xeger = Xeger::new(pattern).expect(pattern);
        let confounded = xeger
            .confound()
            .unwrap_or_else(|| panic!("{pattern} should confound"));
        for _ in 0..10 {
            if let Some(text) = confounded.emit_checked(&mut rng) {
                assert!(!xeger.matches(&text), "{pattern}: {text:?}");
            }
        }
    }
}

#[test]
fn palindromes_and_anchors_do_not_confound() {
    for pattern in ["abba", "^$", "(?:noon)+"] {
        let xeger = Xeger::new(pattern).expect(pattern);
        assert!(xeger.confound().is_none(), "{pattern}");
    }
}

#[test]
fn samples_serialize_for_downstream_tools() {
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let request = SampleRequest {
        valid: 3,
        invalid: 2,
        ..SampleRequest::default()
    };
    let samples = sample_pattern("[A-Z]{3}-\\d{4}", &request, &mut rng).expect("pattern");
    assert_eq!(samples.valid.len(), 3);
    assert!(samples.confoundable);

    let json = serde_json::to_value(&samples).expect("serialize");
    assert_eq!(json["pattern"], "[A-Z]{3}-\\d{4}");
    assert_eq!(json["valid"].as_array().map(Vec::len), Some(3));
    let back: xeger_generate::PatternSamples =
        serde_json::from_value(json).expect("deserialize");
    assert_eq!(back, samples);
}

#[test]
fn sample_requests_read_partial_json() {
    let request: SampleRequest =
        serde_json::from_str(r#"{"valid": 2, "distinct": true}"#).expect("request");
    assert_eq!(request.valid, 2);
    assert!(request.distinct);
    assert_eq!(request.invalid, SampleRequest::default().invalid);
}
