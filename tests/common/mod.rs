#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use anyhow::bail;
use async_trait::async_trait;
use chrono::NaiveDate;
use timeline_blueprint::instantiate::{CreatedItem, CreatedRoot, ItemFields, RootFields};
use timeline_blueprint::{DependencyEdge, DependencyKind, RemoteApi, WorkItem, WorkItemKind};

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Release epic with two issues, a task under the first issue, and one
/// unrelated item that only shows up as a dependency partner.
pub fn release_items() -> Vec<WorkItem> {
    vec![
        WorkItem::new("epic-1", WorkItemKind::Group, "Release 1.0")
            .with_dates(Some(d(2024, 1, 8)), Some(d(2024, 1, 19)))
            .with_description("Ship it"),
        WorkItem::new("issue-1", WorkItemKind::Issue, "Design")
            .with_parent("epic-1")
            .with_dates(Some(d(2024, 1, 8)), Some(d(2024, 1, 10)))
            .with_labels(["design"])
            .with_assignees(["alice"]),
        WorkItem::new("task-1", WorkItemKind::Task, "Write RFC")
            .with_parent("issue-1")
            .with_dates(Some(d(2024, 1, 11)), Some(d(2024, 1, 12)))
            .with_weight(3),
        WorkItem::new("issue-2", WorkItemKind::Issue, "Build")
            .with_parent("epic-1")
            .with_dates(Some(d(2024, 1, 15)), Some(d(2024, 1, 19))),
        WorkItem::new("other-1", WorkItemKind::Issue, "Unrelated")
            .with_dates(Some(d(2024, 2, 1)), Some(d(2024, 2, 2))),
    ]
}

pub fn release_edges() -> Vec<DependencyEdge> {
    vec![
        DependencyEdge::blocks("issue-1", "issue-2"),
        DependencyEdge::new("issue-2", "task-1", DependencyKind::IsBlockedBy),
        DependencyEdge::blocks("issue-1", "other-1"),
        DependencyEdge::new("issue-1", "issue-2", DependencyKind::RelatesTo),
    ]
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Root(RootFields),
    Item(ItemFields),
    Link(String, String),
}

/// Scripted remote that fails on chosen titles and records every call.
#[derive(Default)]
pub struct ScriptedApi {
    pub fail_root: bool,
    pub fail_titles: HashSet<String>,
    pub fail_links: bool,
    pub calls: Mutex<Vec<Call>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(titles: &[&str]) -> Self {
        Self {
            fail_titles: titles.iter().map(|t| t.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn item_calls(&self) -> Vec<ItemFields> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Item(fields) => Some(fields),
                _ => None,
            })
            .collect()
    }

    pub fn link_calls(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Link(source, target) => Some((source, target)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, call: Call) -> usize {
        let mut calls = self.calls.lock().unwrap();
        calls.push(call);
        calls.len()
    }
}

#[async_trait]
impl RemoteApi for ScriptedApi {
    async fn create_root(&self, fields: &RootFields) -> anyhow::Result<CreatedRoot> {
        let n = self.push(Call::Root(fields.clone()));
        if self.fail_root {
            bail!("remote refused root");
        }
        Ok(CreatedRoot {
            id: format!("remote-{n}"),
            url: Some(format!("https://tracker.test/epics/{n}")),
        })
    }

    async fn create_item(&self, fields: &ItemFields) -> anyhow::Result<CreatedItem> {
        let n = self.push(Call::Item(fields.clone()));
        if self.fail_titles.iter().any(|t| fields.title.ends_with(t.as_str())) {
            bail!("remote refused {}", fields.title);
        }
        Ok(CreatedItem {
            id: format!("remote-{n}"),
        })
    }

    async fn create_dependency_link(&self, source_id: &str, target_id: &str) -> anyhow::Result<()> {
        self.push(Call::Link(source_id.to_string(), target_id.to_string()));
        if self.fail_links {
            bail!("link rejected");
        }
        Ok(())
    }
}
