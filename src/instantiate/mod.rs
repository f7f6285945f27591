pub mod dry_run;
pub mod naming;
pub mod order;
pub mod remote;

pub use dry_run::{DryRunApi, DryRunReport, PlannedCall, preview_instantiation};
pub use naming::{ItemNaming, RootNaming, RootNamingMode};
pub use order::creation_order;
pub use remote::{CreatedItem, CreatedRoot, ItemFields, RemoteApi, RootFields};

use crate::calendar::BusinessCalendar;
use crate::template::{ItemKind, ParentRef, Template, TemplateItem};
use crate::template_validation::{TemplateValidationError, validate_template};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Failure reason recorded for items whose parent has no new id.
pub const PARENT_NOT_CREATED: &str = "parent not created";

#[derive(Debug, Error)]
pub enum InstantiationError {
    #[error("template is invalid: {0}")]
    InvalidTemplate(#[from] TemplateValidationError),
    /// Creating the root failed; nothing else was attempted.
    #[error(transparent)]
    RootCreation(anyhow::Error),
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstantiationOptions {
    pub start_date: NaiveDate,
    #[serde(default)]
    pub root_naming: RootNaming,
    #[serde(default)]
    pub item_naming: ItemNaming,
    #[serde(default = "default_true")]
    pub apply_labels: bool,
    #[serde(default = "default_true")]
    pub apply_assignees: bool,
}

impl InstantiationOptions {
    pub fn new(start_date: NaiveDate) -> Self {
        Self {
            start_date,
            root_naming: RootNaming::default(),
            item_naming: ItemNaming::default(),
            apply_labels: true,
            apply_assignees: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedRootRecord {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedItemRecord {
    pub original_id: String,
    pub new_id: String,
    pub title: String,
    pub kind: ItemKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedItemRecord {
    pub original_id: String,
    pub title: String,
    pub error: String,
}

/// Outcome of one instantiation run. Partial results stay valid even when the
/// run was abandoned midway.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InstantiationResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<CreatedRootRecord>,
    #[serde(default)]
    pub created: Vec<CreatedItemRecord>,
    #[serde(default)]
    pub failed: Vec<FailedItemRecord>,
    #[serde(default)]
    pub links_created: usize,
    #[serde(default)]
    pub links_failed: usize,
}

impl InstantiationResult {
    pub fn new_id_for(&self, local_id: &str) -> Option<&str> {
        self.created
            .iter()
            .find(|record| record.original_id == local_id)
            .map(|record| record.new_id.as_str())
    }

    pub fn failure_for(&self, local_id: &str) -> Option<&FailedItemRecord> {
        self.failed
            .iter()
            .find(|record| record.original_id == local_id)
    }

    pub fn to_cli_summary(&self) -> String {
        let mut parts = Vec::new();
        parts.push(format!("success={}", self.success));
        if let Some(root) = &self.root {
            parts.push(format!("root={}", root.id));
        }
        parts.push(format!("created={}", self.created.len()));
        parts.push(format!("failed={}", self.failed.len()));
        parts.push(format!("links={}", self.links_created));
        if self.links_failed > 0 {
            parts.push(format!("links_failed={}", self.links_failed));
        }
        parts.join(", ")
    }
}

/// Absolute start for an item replayed at `start_date`.
pub fn item_start(
    item: &TemplateItem,
    start_date: NaiveDate,
    calendar: &BusinessCalendar,
) -> NaiveDate {
    match item.start_offset {
        Some(offset) => calendar.shift_by_workdays(start_date, offset),
        None => calendar.get_next_workday(start_date),
    }
}

fn item_fields(
    item: &TemplateItem,
    options: &InstantiationOptions,
    calendar: &BusinessCalendar,
    parent_id: String,
) -> ItemFields {
    let start = item_start(item, options.start_date, calendar);
    let end = item
        .workdays
        .map(|workdays| calendar.calculate_end_date_by_workdays(start, workdays));
    ItemFields {
        kind: item.kind,
        title: options.item_naming.resolve(item.kind, &item.title),
        description: item.description.clone(),
        start: Some(start),
        end,
        parent_id: Some(parent_id),
        labels: if options.apply_labels {
            item.labels.clone()
        } else {
            Vec::new()
        },
        assignees: if options.apply_assignees {
            item.assignees.clone()
        } else {
            Vec::new()
        },
        weight: item.weight,
    }
}

/// Replay `template` at `options.start_date` through `api`.
///
/// Only a failure to create the root is returned as an error. Item and link
/// failures are recorded in the result and the run carries on.
pub async fn instantiate<A>(
    template: &Template,
    options: &InstantiationOptions,
    api: &A,
    calendar: &BusinessCalendar,
) -> Result<InstantiationResult, InstantiationError>
where
    A: RemoteApi + ?Sized,
{
    let mut result = InstantiationResult::default();
    instantiate_into(template, options, api, calendar, &mut result).await?;
    Ok(result)
}

/// Same as [`instantiate`], accumulating into a caller-owned result so that
/// whatever was created before the future is dropped remains visible.
pub async fn instantiate_into<A>(
    template: &Template,
    options: &InstantiationOptions,
    api: &A,
    calendar: &BusinessCalendar,
    result: &mut InstantiationResult,
) -> Result<(), InstantiationError>
where
    A: RemoteApi + ?Sized,
{
    validate_template(template)?;

    let root_title = options.root_naming.resolve(&template.root.title);
    let root_fields = RootFields {
        title: root_title.clone(),
        description: template.root.description.clone(),
        start: Some(calendar.get_next_workday(options.start_date)),
        end: template
            .root
            .workdays
            .map(|workdays| calendar.calculate_end_date_by_workdays(options.start_date, workdays)),
    };
    let root = api
        .create_root(&root_fields)
        .await
        .map_err(InstantiationError::RootCreation)?;
    debug!(root_id = %root.id, title = %root_title, "created template root");
    result.root = Some(CreatedRootRecord {
        id: root.id.clone(),
        title: root_title,
        url: root.url.clone(),
    });

    let mut id_map: HashMap<&str, String> = HashMap::with_capacity(template.items.len());

    for idx in creation_order(&template.items) {
        let item = &template.items[idx];
        let parent_id = match &item.parent_ref {
            ParentRef::Root => root.id.clone(),
            ParentRef::Item(parent) => match id_map.get(parent.as_str()) {
                Some(new_id) => new_id.clone(),
                None => {
                    warn!(item = %item.local_id, parent = %parent, "skipping item whose parent was not created");
                    result.failed.push(FailedItemRecord {
                        original_id: item.local_id.clone(),
                        title: item.title.clone(),
                        error: PARENT_NOT_CREATED.to_string(),
                    });
                    continue;
                }
            },
        };

        let fields = item_fields(item, options, calendar, parent_id);
        match api.create_item(&fields).await {
            Ok(created) => {
                debug!(item = %item.local_id, new_id = %created.id, "created template item");
                id_map.insert(item.local_id.as_str(), created.id.clone());
                result.created.push(CreatedItemRecord {
                    original_id: item.local_id.clone(),
                    new_id: created.id,
                    title: fields.title,
                    kind: item.kind,
                });
            }
            Err(err) => {
                warn!(item = %item.local_id, error = %err, "failed to create template item");
                result.failed.push(FailedItemRecord {
                    original_id: item.local_id.clone(),
                    title: item.title.clone(),
                    error: format!("{err:#}"),
                });
            }
        }
    }

    for (blocker, blocked) in template.blocking_edges() {
        let (Some(source_id), Some(target_id)) = (id_map.get(blocker), id_map.get(blocked)) else {
            continue;
        };
        match api.create_dependency_link(source_id, target_id).await {
            Ok(()) => result.links_created += 1,
            Err(err) => {
                warn!(source = blocker, target = blocked, error = %err, "failed to create dependency link");
                result.links_failed += 1;
            }
        }
    }

    result.success = result.failed.is_empty() && result.links_failed == 0;
    info!(
        template_id = %template.id,
        summary = %result.to_cli_summary(),
        "instantiated template"
    );
    Ok(())
}
