use super::*;

fn vocabulary() -> KeyMap {
    let mut map = KeyMap::new();
    map.insert(
        "현장명",
        vec!["현장".to_string(), "공사현장".to_string()],
    );
    map.insert("일자", vec!["날짜".to_string(), "date".to_string()]);
    map
}

#[test]
fn insert_includes_master_in_its_own_synonyms() {
    let map = vocabulary();
    let entry = &map.entries()[0];
    assert_eq!(entry.master, "현장명");
    assert!(entry.synonyms.iter().any(|s| s == "현장명"));
    assert_eq!(map.len(), 2);
}

#[test]
fn synonyms_resolve_to_the_master_key() {
    let normalizer = KeyNormalizer::new(vocabulary());
    assert_eq!(normalizer.normalize("현장"), "현장명");
    assert_eq!(normalizer.normalize("공사현장"), "현장명");
    assert_eq!(normalizer.normalize("현장명"), "현장명");
    assert_eq!(normalizer.normalize("날짜"), "일자");
}

#[test]
fn unknown_names_pass_through_unchanged() {
    let normalizer = KeyNormalizer::new(vocabulary());
    assert_eq!(normalizer.normalize("미등록필드"), "미등록필드");
    assert_eq!(normalizer.normalize("  미등록필드  "), "  미등록필드  ");
}

#[test]
fn matching_trims_and_ignores_case() {
    let normalizer = KeyNormalizer::new(vocabulary());
    assert_eq!(normalizer.normalize(" DATE "), "일자");
    assert_eq!(normalizer.normalize("Date"), "일자");
    assert_eq!(normalizer.normalize("  현장  "), "현장명");
}

#[test]
fn overlapping_synonyms_resolve_to_the_earliest_master() {
    let mut map = KeyMap::new();
    map.insert("현장명", vec!["위치".to_string()]);
    map.insert("장소", vec!["위치".to_string()]);
    let normalizer = KeyNormalizer::new(map);
    assert_eq!(normalizer.normalize("위치"), "현장명");
    assert_eq!(normalizer.normalize("장소"), "장소");
}

#[test]
fn normalize_pairs_keeps_order_and_values() {
    let normalizer = KeyNormalizer::new(vocabulary());
    let pairs = vec![
        ("날짜".to_string(), "2024-01-15".to_string()),
        ("현장".to_string(), "양주신도시".to_string()),
        ("비고".to_string(), "없음".to_string()),
    ];
    assert_eq!(
        normalizer.normalize_pairs(&pairs),
        vec![
            ("일자".to_string(), "2024-01-15".to_string()),
            ("현장명".to_string(), "양주신도시".to_string()),
            ("비고".to_string(), "없음".to_string()),
        ]
    );
}

#[test]
fn key_map_round_trips_through_json_as_a_bare_list() {
    let map = vocabulary();
    let json = serde_json::to_string(&map).unwrap();
    assert!(json.starts_with('['));
    let back: KeyMap = serde_json::from_str(&json).unwrap();
    assert_eq!(back, map);
}
