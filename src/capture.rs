use crate::calendar::BusinessCalendar;
use crate::graph::HierarchyGraph;
use crate::item::{DependencyEdge, WorkItem};
use crate::template::{
    ItemKind, ParentRef, StorageLocation, Template, TemplateItem, TemplateRoot,
};
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("root item {0} is not part of the item set")]
    RootNotFound(String),
    #[error("duplicate work item id {0}")]
    DuplicateItemId(String),
    #[error("template name must not be blank")]
    EmptyName,
}

#[derive(Debug, Clone, Default)]
pub struct CaptureOptions {
    /// Template name; the root's title when unset.
    pub name: Option<String>,
    pub storage_location: StorageLocation,
}

impl CaptureOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            storage_location: StorageLocation::default(),
        }
    }
}

/// Date every offset in a capture is measured from: the root's own start,
/// else the earliest descendant start.
pub fn effective_anchor(root: &WorkItem, descendants: &[&WorkItem]) -> Option<NaiveDate> {
    root.start
        .or_else(|| descendants.iter().filter_map(|item| item.start).min())
}

/// Snapshot `root_id` and everything below it as a date-relative template.
///
/// Dependency edges with an endpoint outside the captured subtree are dropped,
/// since the partner would not exist after replay.
pub fn capture_template(
    root_id: &str,
    items: &[WorkItem],
    edges: &[DependencyEdge],
    calendar: &BusinessCalendar,
    options: &CaptureOptions,
) -> Result<Template, CaptureError> {
    let mut seen_ids = HashSet::with_capacity(items.len());
    for item in items {
        if !seen_ids.insert(item.id.as_str()) {
            return Err(CaptureError::DuplicateItemId(item.id.clone()));
        }
    }

    let root = items
        .iter()
        .find(|item| item.id == root_id)
        .ok_or_else(|| CaptureError::RootNotFound(root_id.to_string()))?;

    let name = options
        .name
        .clone()
        .unwrap_or_else(|| root.title.clone());
    if name.trim().is_empty() {
        return Err(CaptureError::EmptyName);
    }

    let graph = HierarchyGraph::build(items);
    let descendant_ids = graph.descendant_set(root_id);
    let captured: Vec<&WorkItem> = items
        .iter()
        .filter(|item| descendant_ids.contains(&item.id))
        .collect();

    let anchor = effective_anchor(root, &captured);

    let local_ids: HashMap<&str, String> = captured
        .iter()
        .enumerate()
        .map(|(idx, item)| (item.id.as_str(), format!("item-{}", idx + 1)))
        .collect();

    let mut blocks: HashMap<&str, Vec<String>> = HashMap::new();
    for edge in edges {
        let Some((blocker, blocked)) = edge.blocking_pair() else {
            continue;
        };
        match (local_ids.get(blocker), local_ids.get(blocked)) {
            (Some(_), Some(target)) if blocker != blocked => {
                let targets = blocks.entry(blocker).or_default();
                if !targets.contains(target) {
                    targets.push(target.clone());
                }
            }
            _ => debug!(
                source = %edge.source,
                target = %edge.target,
                "dropping dependency edge outside captured subtree"
            ),
        }
    }

    let template_items: Vec<TemplateItem> = captured
        .iter()
        .map(|item| {
            let parent_ref = item
                .parent_id
                .as_deref()
                .and_then(|parent| local_ids.get(parent))
                .map(|local| ParentRef::Item(local.clone()))
                .unwrap_or(ParentRef::Root);
            let start_offset = match (anchor, item.start) {
                (Some(anchor), Some(start)) => {
                    Some(calendar.signed_workday_distance(anchor, start))
                }
                _ => None,
            };
            let workdays = match (item.start, item.end) {
                (Some(start), Some(end)) => Some(calendar.count_workdays(start, end)),
                _ => None,
            };
            TemplateItem {
                local_id: local_ids[item.id.as_str()].clone(),
                kind: ItemKind::from(item.kind),
                title: item.title.clone(),
                description: item.description.clone(),
                start_offset,
                workdays,
                labels: item.labels.clone(),
                assignees: item.assignees.clone(),
                weight: item.weight,
                parent_ref,
                blocks: blocks.remove(item.id.as_str()).unwrap_or_default(),
            }
        })
        .collect();

    let root_workdays = match (anchor, root.end) {
        (Some(anchor), Some(end)) => Some(calendar.count_workdays(anchor, end)),
        _ => None,
    };

    let template = Template::new(
        name,
        options.storage_location,
        TemplateRoot {
            title: root.title.clone(),
            description: root.description.clone(),
            workdays: root_workdays,
        },
        template_items,
    );
    info!(
        template_id = %template.id,
        root = root_id,
        items = template.items.len(),
        anchor = ?anchor,
        "captured template"
    );
    Ok(template)
}
