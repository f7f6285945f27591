mod common;

use common::{d, release_edges, release_items};
use timeline_blueprint::{
    BusinessCalendar, CaptureError, CaptureOptions, ItemKind, ParentRef, StorageLocation,
    TEMPLATE_VERSION, WorkItem, WorkItemKind, capture_template, validate_template,
};

#[test]
fn capture_records_offsets_durations_and_structure() {
    let cal = BusinessCalendar::default();
    let template = capture_template(
        "epic-1",
        &release_items(),
        &release_edges(),
        &cal,
        &CaptureOptions::named("Release checklist"),
    )
    .unwrap();

    assert_eq!(template.name, "Release checklist");
    assert_eq!(template.version, TEMPLATE_VERSION);
    assert_eq!(template.root.title, "Release 1.0");
    assert_eq!(template.root.description.as_deref(), Some("Ship it"));
    assert_eq!(template.root.workdays, Some(10));
    validate_template(&template).unwrap();

    let titles: Vec<&str> = template.items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, vec!["Design", "Write RFC", "Build"]);

    let design = &template.items[0];
    assert_eq!(design.kind, ItemKind::Parent);
    assert_eq!(design.parent_ref, ParentRef::Root);
    assert_eq!(design.start_offset, Some(0));
    assert_eq!(design.workdays, Some(3));
    assert_eq!(design.labels, vec!["design"]);
    assert_eq!(design.assignees, vec!["alice"]);

    let rfc = &template.items[1];
    assert_eq!(rfc.kind, ItemKind::Leaf);
    assert_eq!(rfc.parent_ref, ParentRef::Item(design.local_id.clone()));
    assert_eq!(rfc.start_offset, Some(3));
    assert_eq!(rfc.workdays, Some(2));
    assert_eq!(rfc.weight, Some(3));

    let build = &template.items[2];
    assert_eq!(build.start_offset, Some(5));
    assert_eq!(build.workdays, Some(5));
}

#[test]
fn capture_keeps_only_blocking_edges_inside_subtree() {
    let cal = BusinessCalendar::default();
    let template = capture_template(
        "epic-1",
        &release_items(),
        &release_edges(),
        &cal,
        &CaptureOptions::default(),
    )
    .unwrap();

    let design = &template.items[0];
    let rfc = &template.items[1];
    let build = &template.items[2];
    // the edge to other-1 is dropped and relates_to is ignored
    assert_eq!(design.blocks, vec![build.local_id.clone()]);
    // is_blocked_by is normalised into the blocker's list
    assert_eq!(rfc.blocks, vec![build.local_id.clone()]);
    assert!(build.blocks.is_empty());
    assert_eq!(template.blocking_edges().len(), 2);
}

#[test]
fn capture_defaults_name_to_root_title() {
    let cal = BusinessCalendar::default();
    let options = CaptureOptions {
        name: None,
        storage_location: StorageLocation::Group,
    };
    let template =
        capture_template("epic-1", &release_items(), &[], &cal, &options).unwrap();
    assert_eq!(template.name, "Release 1.0");
    assert_eq!(template.storage_location, StorageLocation::Group);
    assert!(template.items.iter().all(|item| item.blocks.is_empty()));
}

#[test]
fn capture_anchors_on_earliest_descendant_when_root_has_no_start() {
    let cal = BusinessCalendar::default();
    let mut items = release_items();
    items[0].start = None;
    // move the design issue a week later so the task is the earliest
    items[1].start = Some(d(2024, 1, 15));
    items[1].end = Some(d(2024, 1, 16));

    let template =
        capture_template("epic-1", &items, &[], &cal, &CaptureOptions::default()).unwrap();
    let offsets: Vec<Option<i64>> = template.items.iter().map(|i| i.start_offset).collect();
    // anchor is 2024-01-11 (Write RFC)
    assert_eq!(offsets, vec![Some(2), Some(0), Some(2)]);
    // root span measured from the anchor to the root end
    assert_eq!(template.root.workdays, Some(7));
}

#[test]
fn capture_of_dateless_subtree_has_no_offsets() {
    let cal = BusinessCalendar::default();
    let items = vec![
        WorkItem::new("g", WorkItemKind::Group, "Checklist"),
        WorkItem::new("a", WorkItemKind::Issue, "Step one").with_parent("g"),
        WorkItem::new("b", WorkItemKind::Task, "Step two").with_parent("a"),
    ];
    let template =
        capture_template("g", &items, &[], &cal, &CaptureOptions::default()).unwrap();
    assert_eq!(template.root.workdays, None);
    assert_eq!(template.items.len(), 2);
    assert!(
        template
            .items
            .iter()
            .all(|item| item.start_offset.is_none() && item.workdays.is_none())
    );
}

#[test]
fn capture_item_without_end_has_offset_but_no_duration() {
    let cal = BusinessCalendar::default();
    let mut items = release_items();
    items[3].end = None;
    let template =
        capture_template("epic-1", &items, &[], &cal, &CaptureOptions::default()).unwrap();
    assert_eq!(template.items[2].start_offset, Some(5));
    assert_eq!(template.items[2].workdays, None);
}

#[test]
fn capture_rejects_unknown_root_and_duplicate_ids() {
    let cal = BusinessCalendar::default();
    let err = capture_template("missing", &release_items(), &[], &cal, &CaptureOptions::default())
        .unwrap_err();
    assert_eq!(err, CaptureError::RootNotFound("missing".into()));

    let mut items = release_items();
    items.push(WorkItem::new("task-1", WorkItemKind::Task, "Copy"));
    let err =
        capture_template("epic-1", &items, &[], &cal, &CaptureOptions::default()).unwrap_err();
    assert_eq!(err, CaptureError::DuplicateItemId("task-1".into()));

    let err = capture_template(
        "epic-1",
        &release_items(),
        &[],
        &cal,
        &CaptureOptions::named("   "),
    )
    .unwrap_err();
    assert_eq!(err, CaptureError::EmptyName);
}

#[test]
fn capture_survives_parent_cycles() {
    let cal = BusinessCalendar::default();
    let items = vec![
        WorkItem::new("g", WorkItemKind::Group, "Root").with_parent("b"),
        WorkItem::new("a", WorkItemKind::Issue, "A").with_parent("g"),
        WorkItem::new("b", WorkItemKind::Issue, "B").with_parent("a"),
    ];
    let template =
        capture_template("g", &items, &[], &cal, &CaptureOptions::default()).unwrap();
    let titles: Vec<&str> = template.items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, vec!["A", "B"]);
}
