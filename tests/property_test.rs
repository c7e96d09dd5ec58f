//! Property-based tests using proptest.
//!
//! These tests verify invariants that should hold for any valid input.

use chrono::Utc;
use proptest::prelude::*;

use fir_vault::infra::content_id_for;
use fir_vault::{
    decrypt, encrypt, is_valid_content_id, ComplaintForm, ComplaintRecord, ComplaintType,
    ContentId, Priority, Secret,
};

// ============================================================================
// Custom Strategies
// ============================================================================

const BASE58: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

fn arb_cid_v0() -> impl Strategy<Value = String> {
    let alphabet: Vec<char> = BASE58.chars().collect();
    prop::collection::vec(prop::sample::select(alphabet), 44)
        .prop_map(|chars| format!("Qm{}", chars.into_iter().collect::<String>()))
}

fn arb_cid_v1() -> impl Strategy<Value = String> {
    "[a-z2-7]{47,117}".prop_map(|tail| format!("baf{tail}"))
}

fn arb_content_id() -> impl Strategy<Value = String> {
    prop_oneof![arb_cid_v0(), arb_cid_v1()]
}

fn arb_complaint_type() -> impl Strategy<Value = ComplaintType> {
    prop::sample::select(ComplaintType::ALL.to_vec())
}

// ============================================================================
// Content identifiers
// ============================================================================

proptest! {
    #[test]
    fn prop_generated_ids_are_valid(id in arb_content_id()) {
        prop_assert!(is_valid_content_id(&id));
        let parsed = ContentId::parse(&id).unwrap();
        prop_assert_eq!(parsed.as_str(), id.as_str());
    }

    #[test]
    fn prop_v0_rejects_non_base58(id in arb_cid_v0(), pos in 2usize..46, bad in prop::sample::select(vec!['0', 'O', 'I', 'l', '-', '/'])) {
        let mut chars: Vec<char> = id.chars().collect();
        chars[pos] = bad;
        let tampered: String = chars.into_iter().collect();
        prop_assert!(!is_valid_content_id(&tampered));
    }

    #[test]
    fn prop_uppercase_v1_rejected(id in arb_cid_v1()) {
        let upper = id.to_uppercase();
        prop_assert!(!is_valid_content_id(&upper));
    }

    #[test]
    fn prop_text_without_known_prefix_rejected(text in "[^Qb].{0,80}") {
        prop_assert!(!is_valid_content_id(&text));
    }

    #[test]
    fn prop_content_id_for_is_valid_and_deterministic(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let a = content_id_for(&data);
        let b = content_id_for(&data);
        prop_assert_eq!(&a, &b);
        prop_assert!(is_valid_content_id(a.as_str()));
    }
}

// ============================================================================
// Pointer sealing
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_pointer_round_trip_for_ids(id in arb_content_id()) {
        let secret = Secret::generate();
        let pointer = encrypt(&id, &secret).unwrap();
        prop_assert_eq!(decrypt(&pointer, &secret).unwrap(), id);
    }

    #[test]
    fn prop_foreign_secret_never_recovers_id(id in arb_content_id(), other in "[A-Za-z0-9_-]{1,64}") {
        let secret = Secret::generate();
        let pointer = encrypt(&id, &secret).unwrap();
        let opened = decrypt(&pointer, &Secret::new(other));
        prop_assert!(opened.map(|s| s != id).unwrap_or(true));
    }
}

// ============================================================================
// Records
// ============================================================================

proptest! {
    #[test]
    fn prop_empty_query_matches_everything(kind in arb_complaint_type(), description in "[a-zA-Z ]{1,60}", location in "[a-zA-Z ]{0,30}") {
        let record = ComplaintRecord::from_form(ComplaintForm::new(kind, description, location), Vec::new(), Utc::now());
        prop_assert!(record.matches(""));
        prop_assert!(record.matches(kind.label()));
    }

    #[test]
    fn prop_description_substring_matches(prefix in "[a-z ]{0,20}", word in "[a-z]{3,10}", suffix in "[a-z ]{0,20}") {
        let description = format!("{prefix}{word}{suffix}");
        let record = ComplaintRecord::from_form(
            ComplaintForm::new(ComplaintType::Other, description, ""),
            Vec::new(),
            Utc::now(),
        );
        prop_assert!(record.matches(&word.to_uppercase()));
    }

    #[test]
    fn prop_critical_keyword_dominates(prefix in "[a-z ]{0,30}", keyword in prop::sample::select(vec!["murder", "Death", "ACCIDENT"]), extra in prop::sample::select(vec!["", " robbery", " fight"])) {
        let text = format!("{prefix}{keyword}{extra}");
        prop_assert_eq!(Priority::classify(&text), Priority::Critical);
    }

    #[test]
    fn prop_record_json_preserves_type(kind in arb_complaint_type(), description in "[ -~]{1,80}") {
        let record = ComplaintRecord::from_form(ComplaintForm::new(kind, description, "x"), Vec::new(), Utc::now());
        let bytes = record.to_json_bytes().unwrap();
        let parsed: ComplaintRecord = serde_json::from_slice(&bytes).unwrap();
        prop_assert_eq!(parsed, record);
    }
}
