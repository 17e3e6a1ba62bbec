use super::*;
use crate::test_support::entry_at;

#[test]
fn records_within_a_minute_of_the_first_share_a_group() {
    let entries = vec![
        entry_at("a", 100, &[("statement", "I can do hard things")]),
        entry_at("b", 130, &[("statement", "This will pass")]),
        entry_at("c", 200, &[("statement", "Breathe")]),
    ];

    let groups = group_entries(&entries, DEFAULT_BUCKET_SECS);

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].bucket, 180);
    assert_eq!(groups[0].entry_ids(), vec![EntryId::from("c")]);
    assert_eq!(groups[1].bucket, 60);
    assert_eq!(groups[1].len(), 2);
    assert_eq!(
        groups[1].values(),
        vec!["I can do hard things", "This will pass"]
    );
}

#[test]
fn grouping_ignores_input_order() {
    let entries = vec![
        entry_at("late", 130, &[("s", "second")]),
        entry_at("early", 100, &[("s", "first")]),
    ];
    let groups = group_entries(&entries, 60);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].values(), vec!["first", "second"]);
    assert_eq!(groups[0].id(), GroupId(60));
}

#[test]
fn window_is_anchored_on_the_first_record_not_chained() {
    let entries = vec![
        entry_at("a", 100, &[("s", "one")]),
        entry_at("b", 150, &[("s", "two")]),
        entry_at("c", 170, &[("s", "three")]),
        entry_at("d", 220, &[("s", "four")]),
    ];

    let groups = group_entries(&entries, 60);

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].id(), GroupId(120));
    assert_eq!(
        groups[0].entry_ids(),
        vec![EntryId::from("c"), EntryId::from("d")]
    );
    assert_eq!(groups[1].id(), GroupId(60));
    assert_eq!(groups[1].values(), vec!["one", "two"]);
}

#[test]
fn records_straddling_a_minute_boundary_stay_together() {
    // 59 and 61 straddle a minute boundary but were saved together.
    let entries = vec![
        entry_at("x", 59, &[]),
        entry_at("y", 61, &[]),
        entry_at("z", 119, &[]),
        entry_at("w", 121, &[]),
    ];

    let groups = group_entries(&entries, 60);

    let keys: Vec<GroupId> = groups.iter().map(EntryGroup::id).collect();
    assert_eq!(keys, vec![GroupId(60), GroupId(0)]);
    assert_eq!(
        groups[1].entry_ids(),
        vec![EntryId::from("x"), EntryId::from("y")]
    );
    assert_eq!(
        groups[0].entry_ids(),
        vec![EntryId::from("z"), EntryId::from("w")]
    );
}

#[test]
fn bucket_start_floors_negative_timestamps() {
    assert_eq!(bucket_start(119, 60), 60);
    assert_eq!(bucket_start(120, 60), 120);
    assert_eq!(bucket_start(-1, 60), -60);
    assert_eq!(bucket_start(7, 0), 7);
}

#[test]
fn newest_first_keeps_store_order_for_ties() {
    let mut entries = vec![
        entry_at("old", 10, &[]),
        entry_at("tie-1", 50, &[]),
        entry_at("tie-2", 50, &[]),
        entry_at("mid", 30, &[]),
    ];
    sort_newest_first(&mut entries);
    let ids: Vec<&str> = entries.iter().map(|entry| entry.id.as_ref()).collect();
    assert_eq!(ids, vec!["tie-1", "tie-2", "mid", "old"]);
}

#[test]
fn empty_input_yields_no_groups() {
    assert!(group_entries(&[], 60).is_empty());
}
