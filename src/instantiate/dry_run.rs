use super::remote::{CreatedItem, CreatedRoot, ItemFields, RemoteApi, RootFields};
use super::{InstantiationError, InstantiationOptions, InstantiationResult, instantiate};
use crate::calendar::BusinessCalendar;
use crate::template::Template;
use anyhow::anyhow;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One remote call a run would make.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum PlannedCall {
    CreateRoot { id: String, fields: RootFields },
    CreateItem { id: String, fields: ItemFields },
    CreateLink { source_id: String, target_id: String },
}

/// In-memory `RemoteApi` that hands out placeholder ids and records every call.
#[derive(Debug, Default)]
pub struct DryRunApi {
    next_id: AtomicUsize,
    calls: Mutex<Vec<PlannedCall>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DryRunReport {
    pub result: InstantiationResult,
    pub calls: Vec<PlannedCall>,
}

impl DryRunApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<PlannedCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn allocate_id(&self) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        format!("dry-run-{n}")
    }

    fn record(&self, call: PlannedCall) -> anyhow::Result<()> {
        let mut calls = self
            .calls
            .lock()
            .map_err(|_| anyhow!("dry-run call log poisoned"))?;
        calls.push(call);
        Ok(())
    }
}

#[async_trait]
impl RemoteApi for DryRunApi {
    async fn create_root(&self, fields: &RootFields) -> anyhow::Result<CreatedRoot> {
        let id = self.allocate_id();
        self.record(PlannedCall::CreateRoot {
            id: id.clone(),
            fields: fields.clone(),
        })?;
        Ok(CreatedRoot { id, url: None })
    }

    async fn create_item(&self, fields: &ItemFields) -> anyhow::Result<CreatedItem> {
        let id = self.allocate_id();
        self.record(PlannedCall::CreateItem {
            id: id.clone(),
            fields: fields.clone(),
        })?;
        Ok(CreatedItem { id })
    }

    async fn create_dependency_link(
        &self,
        source_id: &str,
        target_id: &str,
    ) -> anyhow::Result<()> {
        self.record(PlannedCall::CreateLink {
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
        })
    }
}

/// Run an instantiation against a `DryRunApi` to show what would be created.
pub async fn preview_instantiation(
    template: &Template,
    options: &InstantiationOptions,
    calendar: &BusinessCalendar,
) -> Result<DryRunReport, InstantiationError> {
    let api = DryRunApi::new();
    let result = instantiate(template, options, &api, calendar).await?;
    Ok(DryRunReport {
        result,
        calls: api.calls(),
    })
}
