//! Tests for label canonicalisation.

use rstest::rstest;

use super::{MAX_LABEL_LEN, canonicalize};

const MESSY: &str = "_mycoollabel25';./__----=][[this,label,is,really[good]and]long[wow+that'scrazy[]what[a\\good!labelname.";

#[test]
fn canonicalizes_known_example() {
    assert_eq!(
        canonicalize(MESSY),
        "mycoollabel25._-thislabelisreallygoodandlongwowthatscrazywhatago"
    );
}

#[rstest]
#[case("web-1", "web-1")]
#[case("my host.example.com", "myhost.example.com")]
#[case("a--b__c..d", "a-b_c.d")]
#[case("--edge--", "edge")]
#[case("émoji🚀box", "mojibox")]
#[case("___", "")]
fn canonicalizes_samples(#[case] raw: &str, #[case] expected: &str) {
    assert_eq!(canonicalize(raw), expected);
}

#[rstest]
#[case(MESSY)]
#[case("web-1")]
#[case("a--b__c..d")]
#[case("x._-._-._-y")]
#[case("--edge--")]
#[case("")]
#[case("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa-bcdef")]
#[case("long_label_with_many_segments.and.dots-and-dashes_everywhere_until_it_overflows")]
fn canonicalize_is_idempotent(#[case] raw: &str) {
    let once = canonicalize(raw);
    assert_eq!(canonicalize(&once), once, "not idempotent for {raw:?}");
}

#[rstest]
#[case(MESSY)]
#[case("Ünïcödé / spaces \t and\nnewlines")]
#[case("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa-bcdef")]
fn canonical_labels_use_allowed_characters(#[case] raw: &str) {
    let label = canonicalize(raw);
    assert!(label.len() <= MAX_LABEL_LEN);
    assert!(
        label
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_')),
        "unexpected character in {label:?}"
    );
    assert!(label.chars().next().is_none_or(|ch| ch.is_ascii_alphanumeric()));
    assert!(label.chars().last().is_none_or(|ch| ch.is_ascii_alphanumeric()));
}

#[test]
fn truncation_drops_dangling_punctuation() {
    let raw = format!("{}-tail", "a".repeat(MAX_LABEL_LEN - 1));
    let label = canonicalize(&raw);
    assert_eq!(label, "a".repeat(MAX_LABEL_LEN - 1));
}
