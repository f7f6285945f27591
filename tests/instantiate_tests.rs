mod common;

use common::{Call, ScriptedApi, d, release_edges, release_items};
use timeline_blueprint::instantiate::{PARENT_NOT_CREATED, PlannedCall};
use timeline_blueprint::{
    BusinessCalendar, CaptureOptions, InstantiationError, InstantiationOptions,
    InstantiationResult, ItemKind, ItemNaming, MAX_WORKDAY_SPAN, ParentRef, RootNaming,
    StorageLocation, Template, TemplateItem, TemplateRoot, TemplateValidationError,
    capture_template, instantiate, instantiate_into, preview_instantiation,
};

fn release_template(cal: &BusinessCalendar) -> Template {
    capture_template(
        "epic-1",
        &release_items(),
        &release_edges(),
        cal,
        &CaptureOptions::named("Release checklist"),
    )
    .unwrap()
}

#[tokio::test]
async fn replay_at_original_anchor_reproduces_dates() {
    let cal = BusinessCalendar::default();
    let template = release_template(&cal);
    let api = ScriptedApi::new();

    let result = instantiate(
        &template,
        &InstantiationOptions::new(d(2024, 1, 8)),
        &api,
        &cal,
    )
    .await
    .unwrap();

    assert!(result.success);
    assert_eq!(result.created.len(), 3);
    assert!(result.failed.is_empty());
    assert_eq!(result.links_created, 2);

    let root = result.root.as_ref().unwrap();
    assert_eq!(root.id, "remote-1");
    assert_eq!(root.title, "Release 1.0");
    assert!(root.url.is_some());

    match &api.calls()[0] {
        Call::Root(fields) => {
            assert_eq!(fields.start, Some(d(2024, 1, 8)));
            assert_eq!(fields.end, Some(d(2024, 1, 19)));
            assert_eq!(fields.description.as_deref(), Some("Ship it"));
        }
        other => panic!("expected root call first, got {other:?}"),
    }

    let items = api.item_calls();
    let dates: Vec<_> = items.iter().map(|f| (f.title.as_str(), f.start, f.end)).collect();
    assert_eq!(
        dates,
        vec![
            ("Design", Some(d(2024, 1, 8)), Some(d(2024, 1, 10))),
            ("Write RFC", Some(d(2024, 1, 11)), Some(d(2024, 1, 12))),
            ("Build", Some(d(2024, 1, 15)), Some(d(2024, 1, 19))),
        ]
    );
    assert_eq!(items[0].parent_id.as_deref(), Some("remote-1"));
    assert_eq!(items[1].parent_id.as_deref(), Some("remote-2"));
    assert_eq!(items[2].parent_id.as_deref(), Some("remote-1"));
    assert_eq!(items[0].labels, vec!["design"]);
    assert_eq!(items[0].assignees, vec!["alice"]);
    assert_eq!(items[1].weight, Some(3));
}

#[tokio::test]
async fn replay_at_new_date_shifts_by_workdays() {
    let cal = BusinessCalendar::default();
    let template = release_template(&cal);
    let api = ScriptedApi::new();

    // 2024-03-01 is a Friday
    instantiate(
        &template,
        &InstantiationOptions::new(d(2024, 3, 1)),
        &api,
        &cal,
    )
    .await
    .unwrap();

    let dates: Vec<_> = api.item_calls().iter().map(|f| (f.start, f.end)).collect();
    assert_eq!(
        dates,
        vec![
            (Some(d(2024, 3, 1)), Some(d(2024, 3, 5))),
            (Some(d(2024, 3, 6)), Some(d(2024, 3, 7))),
            (Some(d(2024, 3, 8)), Some(d(2024, 3, 14))),
        ]
    );
}

#[tokio::test]
async fn links_are_created_between_new_ids() {
    let cal = BusinessCalendar::default();
    let template = release_template(&cal);
    let api = ScriptedApi::new();

    let result = instantiate(
        &template,
        &InstantiationOptions::new(d(2024, 1, 8)),
        &api,
        &cal,
    )
    .await
    .unwrap();

    let design = result.new_id_for(&template.items[0].local_id).unwrap();
    let rfc = result.new_id_for(&template.items[1].local_id).unwrap();
    let build = result.new_id_for(&template.items[2].local_id).unwrap();
    assert_eq!(
        api.link_calls(),
        vec![
            (design.to_string(), build.to_string()),
            (rfc.to_string(), build.to_string()),
        ]
    );
}

#[tokio::test]
async fn failed_parent_skips_descendants_without_remote_calls() {
    let cal = BusinessCalendar::default();
    let template = release_template(&cal);
    let api = ScriptedApi::failing_on(&["Design"]);

    let result = instantiate(
        &template,
        &InstantiationOptions::new(d(2024, 1, 8)),
        &api,
        &cal,
    )
    .await
    .unwrap();

    assert!(!result.success);
    let item_calls = api.item_calls();
    let titles: Vec<&str> = item_calls.iter().map(|f| f.title.as_str()).collect();
    assert_eq!(titles, vec!["Design", "Build"]);

    let design = result.failure_for(&template.items[0].local_id).unwrap();
    assert!(design.error.contains("remote refused Design"));
    let rfc = result.failure_for(&template.items[1].local_id).unwrap();
    assert_eq!(rfc.title, "Write RFC");
    assert_eq!(rfc.error, PARENT_NOT_CREATED);

    assert_eq!(result.created.len(), 1);
    assert_eq!(result.created[0].title, "Build");
    // both links touch a failed item
    assert_eq!(result.links_created, 0);
    assert_eq!(result.links_failed, 0);
    assert!(api.link_calls().is_empty());
}

#[tokio::test]
async fn root_failure_aborts_before_any_item() {
    let cal = BusinessCalendar::default();
    let template = release_template(&cal);
    let api = ScriptedApi {
        fail_root: true,
        ..ScriptedApi::default()
    };

    let mut result = InstantiationResult::default();
    let err = instantiate_into(
        &template,
        &InstantiationOptions::new(d(2024, 1, 8)),
        &api,
        &cal,
        &mut result,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, InstantiationError::RootCreation(_)));
    assert!(err.to_string().contains("remote refused root"));
    assert_eq!(api.calls().len(), 1);
    assert!(result.root.is_none());
    assert!(result.created.is_empty());
    assert!(!result.success);
}

#[tokio::test]
async fn link_failures_are_counted_and_clear_success() {
    let cal = BusinessCalendar::default();
    let template = release_template(&cal);
    let api = ScriptedApi {
        fail_links: true,
        ..ScriptedApi::default()
    };

    let result = instantiate(
        &template,
        &InstantiationOptions::new(d(2024, 1, 8)),
        &api,
        &cal,
    )
    .await
    .unwrap();

    assert_eq!(result.created.len(), 3);
    assert!(result.failed.is_empty());
    assert_eq!(result.links_created, 0);
    assert_eq!(result.links_failed, 2);
    assert!(!result.success);
    assert!(result.to_cli_summary().contains("links_failed=2"));
}

#[tokio::test]
async fn naming_and_field_options_apply() {
    let cal = BusinessCalendar::default();
    let template = release_template(&cal);
    let api = ScriptedApi::new();

    let mut options = InstantiationOptions::new(d(2024, 1, 8));
    options.root_naming = RootNaming::prefixed("[Q2]");
    options.item_naming = ItemNaming {
        add_issue_prefix: true,
        add_task_prefix: false,
        prefix: Some("[Q2]".into()),
    };
    options.apply_labels = false;
    options.apply_assignees = false;

    let result = instantiate(&template, &options, &api, &cal).await.unwrap();
    assert_eq!(result.root.as_ref().unwrap().title, "[Q2] Release 1.0");

    let items = api.item_calls();
    let titles: Vec<&str> = items.iter().map(|f| f.title.as_str()).collect();
    assert_eq!(titles, vec!["[Q2] Design", "Write RFC", "[Q2] Build"]);
    assert!(items.iter().all(|f| f.labels.is_empty() && f.assignees.is_empty()));
    assert_eq!(result.created[0].title, "[Q2] Design");
}

#[tokio::test]
async fn custom_root_title_wins() {
    let cal = BusinessCalendar::default();
    let template = release_template(&cal);
    let api = ScriptedApi::new();
    let mut options = InstantiationOptions::new(d(2024, 1, 8));
    options.root_naming = RootNaming::custom("Release 2.0");

    let result = instantiate(&template, &options, &api, &cal).await.unwrap();
    assert_eq!(result.root.unwrap().title, "Release 2.0");
}

#[tokio::test]
async fn missing_offsets_and_dangling_parents_are_handled() {
    let cal = BusinessCalendar::default();
    let mut floating = TemplateItem::new("floating", ItemKind::Leaf, "No dates");
    floating.workdays = Some(2);
    let mut orphan = TemplateItem::new("orphan", ItemKind::Leaf, "Orphan");
    orphan.parent_ref = ParentRef::Item("ghost".into());
    let template = Template::new(
        "Loose",
        StorageLocation::Local,
        TemplateRoot {
            title: "Loose root".into(),
            description: None,
            workdays: None,
        },
        vec![floating, orphan],
    );
    let api = ScriptedApi::new();

    // Saturday start snaps to Monday
    let result = instantiate(
        &template,
        &InstantiationOptions::new(d(2024, 1, 6)),
        &api,
        &cal,
    )
    .await
    .unwrap();

    match &api.calls()[0] {
        Call::Root(fields) => {
            assert_eq!(fields.start, Some(d(2024, 1, 8)));
            assert_eq!(fields.end, None);
        }
        other => panic!("expected root call first, got {other:?}"),
    }
    let items = api.item_calls();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].start, Some(d(2024, 1, 8)));
    assert_eq!(items[0].end, Some(d(2024, 1, 9)));
    assert_eq!(result.failure_for("orphan").unwrap().error, PARENT_NOT_CREATED);
}

#[tokio::test]
async fn invalid_template_makes_no_remote_calls() {
    let cal = BusinessCalendar::default();
    let mut template = release_template(&cal);
    template.items[1].local_id = template.items[0].local_id.clone();
    let api = ScriptedApi::new();

    let err = instantiate(
        &template,
        &InstantiationOptions::new(d(2024, 1, 8)),
        &api,
        &cal,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, InstantiationError::InvalidTemplate(_)));
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn out_of_range_spans_are_rejected_before_replay() {
    let cal = BusinessCalendar::default();
    let options = InstantiationOptions::new(d(2024, 1, 8));

    let mut template = release_template(&cal);
    template.items[0].start_offset = Some(i64::MIN);
    let api = ScriptedApi::new();
    let err = instantiate(&template, &options, &api, &cal)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        InstantiationError::InvalidTemplate(TemplateValidationError::SpanOutOfRange {
            field: "start_offset",
            value: i64::MIN,
            ..
        })
    ));
    assert!(api.calls().is_empty());

    let mut template = release_template(&cal);
    template.items[2].workdays = Some(MAX_WORKDAY_SPAN + 1);
    let api = ScriptedApi::new();
    let err = instantiate(&template, &options, &api, &cal)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        InstantiationError::InvalidTemplate(TemplateValidationError::SpanOutOfRange {
            field: "workdays",
            ..
        })
    ));
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn offsets_at_the_limit_still_replay() {
    let cal = BusinessCalendar::default();
    let mut template = release_template(&cal);
    template.items[0].start_offset = Some(-MAX_WORKDAY_SPAN);
    template.items[2].start_offset = Some(MAX_WORKDAY_SPAN);
    let api = ScriptedApi::new();

    let result = instantiate(
        &template,
        &InstantiationOptions::new(d(2024, 1, 8)),
        &api,
        &cal,
    )
    .await
    .unwrap();

    assert!(result.success);
    // 3660 workdays is exactly 732 five-day weeks
    let items = api.item_calls();
    assert_eq!(items[0].start, Some(d(2009, 12, 28)));
    assert_eq!(items[2].start, Some(d(2038, 1, 18)));
}

#[tokio::test]
async fn preview_records_planned_calls() {
    let cal = BusinessCalendar::default();
    let template = release_template(&cal);

    let report = preview_instantiation(&template, &InstantiationOptions::new(d(2024, 1, 8)), &cal)
        .await
        .unwrap();

    assert!(report.result.success);
    assert_eq!(report.calls.len(), 6);
    assert!(matches!(&report.calls[0], PlannedCall::CreateRoot { id, .. } if id == "dry-run-1"));
    let links = report
        .calls
        .iter()
        .filter(|call| matches!(call, PlannedCall::CreateLink { .. }))
        .count();
    assert_eq!(links, 2);
}
