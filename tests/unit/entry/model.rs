use super::*;

fn sample() -> EntryList {
    EntryList::new(vec![
        Entry::new("일자", "2024-01-15"),
        Entry::new("현장명", "양주신도시"),
        Entry::new("공종", "토공"),
    ])
}

#[test]
fn from_fields_seeds_blank_values() {
    let list = EntryList::from_fields(&["현장명", "공종"]);
    assert_eq!(list.len(), 2);
    assert_eq!(list.value_of("현장명"), Some(""));
    assert_eq!(list.value_of("공종"), Some(""));
}

#[test]
fn from_fields_autofills_date_fields_with_today() {
    let list = EntryList::from_fields(&["일자", "현장명", "Date"]);
    let today = chrono::Local::now().format("%Y-%m-%d").to_string();
    assert_eq!(list.value_of("일자"), Some(today.as_str()));
    assert_eq!(list.value_of("Date"), Some(today.as_str()));
    assert_eq!(list.value_of("현장명"), Some(""));
}

#[test]
fn validate_rejects_empty_list_and_blank_values() {
    assert!(EntryList::default().validate().is_err());

    let mut list = sample();
    assert!(list.validate().is_ok());
    list.set_value("공종", "   ");
    let err = list.validate().unwrap_err();
    assert!(err.to_string().contains("공종"));
}

#[test]
fn set_value_reports_unknown_fields() {
    let mut list = sample();
    assert!(list.set_value("현장명", "서울역"));
    assert_eq!(list.value_of("현장명"), Some("서울역"));
    assert!(!list.set_value("없는필드", "x"));
}

#[test]
fn cache_key_tracks_content_and_order() {
    let a = sample();
    let b = sample();
    assert_eq!(a.cache_key(), b.cache_key());

    let mut changed = sample();
    changed.set_value("공종", "철근");
    assert_ne!(a.cache_key(), changed.cache_key());

    let swapped = EntryList::new(vec![
        Entry::new("현장명", "양주신도시"),
        Entry::new("일자", "2024-01-15"),
        Entry::new("공종", "토공"),
    ]);
    assert_ne!(a.cache_key(), swapped.cache_key());
}

#[test]
fn cache_key_separates_field_and_value_boundaries() {
    let a = EntryList::new(vec![Entry::new("ab", "c")]);
    let b = EntryList::new(vec![Entry::new("a", "bc")]);
    assert_ne!(a.cache_key(), b.cache_key());
}

#[test]
fn joined_values_skips_blanks_and_keeps_order() {
    let list = EntryList::new(vec![
        Entry::new("일자", "2024-01-15"),
        Entry::new("비고", "  "),
        Entry::new("현장명", "양주신도시"),
    ]);
    assert_eq!(list.joined_values("_"), "2024-01-15_양주신도시");
}

#[test]
fn merged_map_preserves_entry_order() {
    let map = sample().merged_map();
    assert_eq!(
        map,
        vec![
            ("일자".to_string(), "2024-01-15".to_string()),
            ("현장명".to_string(), "양주신도시".to_string()),
            ("공종".to_string(), "토공".to_string()),
        ]
    );
}

#[test]
fn rotation_accepts_only_quarter_turns() {
    assert_eq!(Rotation::from_degrees(0).unwrap(), Rotation::None);
    assert_eq!(Rotation::from_degrees(90).unwrap(), Rotation::Cw90);
    assert_eq!(Rotation::from_degrees(180).unwrap(), Rotation::Cw180);
    assert_eq!(Rotation::from_degrees(270).unwrap(), Rotation::Cw270);
    assert!(Rotation::from_degrees(45).is_err());
    assert!(Rotation::from_degrees(360).is_err());
}

#[test]
fn rotation_axis_swap_matches_quarter_turns() {
    assert!(!Rotation::None.swaps_axes());
    assert!(Rotation::Cw90.swaps_axes());
    assert!(!Rotation::Cw180.swaps_axes());
    assert!(Rotation::Cw270.swaps_axes());
}

#[test]
fn archive_target_field_lookup() {
    let target = ArchiveTarget {
        endpoint: String::new(),
        form_name: "F".to_string(),
        folder_structure: Vec::new(),
        field_data: vec![("현장명".to_string(), "양주신도시".to_string())],
    };
    assert_eq!(target.field_value("현장명"), Some("양주신도시"));
    assert_eq!(target.field_value("공종"), None);
}
