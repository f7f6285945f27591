use crate::item::WorkItemKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Current on-disk template format.
pub const TEMPLATE_VERSION: u32 = 1;

/// Marker used for `ParentRef::Root` in the persisted form.
pub const ROOT_REF: &str = "ROOT";

/// Where a template is shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageLocation {
    #[default]
    Local,
    Project,
    Group,
}

impl StorageLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageLocation::Local => "local",
            StorageLocation::Project => "project",
            StorageLocation::Group => "group",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" => Some(StorageLocation::Local),
            "project" => Some(StorageLocation::Project),
            "group" => Some(StorageLocation::Group),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Task-level item.
    Leaf,
    /// Issue-level item that may own children.
    Parent,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Leaf => "leaf",
            ItemKind::Parent => "parent",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim() {
            "leaf" => Some(ItemKind::Leaf),
            "parent" => Some(ItemKind::Parent),
            _ => None,
        }
    }
}

impl From<WorkItemKind> for ItemKind {
    fn from(kind: WorkItemKind) -> Self {
        match kind {
            WorkItemKind::Task => ItemKind::Leaf,
            WorkItemKind::Issue | WorkItemKind::Group => ItemKind::Parent,
        }
    }
}

/// Structural parent of a template item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ParentRef {
    Root,
    Item(String),
}

impl ParentRef {
    pub fn local_id(&self) -> Option<&str> {
        match self {
            ParentRef::Root => None,
            ParentRef::Item(id) => Some(id),
        }
    }
}

impl From<String> for ParentRef {
    fn from(value: String) -> Self {
        if value == ROOT_REF || value.is_empty() {
            ParentRef::Root
        } else {
            ParentRef::Item(value)
        }
    }
}

impl From<ParentRef> for String {
    fn from(value: ParentRef) -> Self {
        match value {
            ParentRef::Root => ROOT_REF.to_string(),
            ParentRef::Item(id) => id,
        }
    }
}

impl fmt::Display for ParentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParentRef::Root => write!(f, "{ROOT_REF}"),
            ParentRef::Item(id) => write!(f, "{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateRoot {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workdays: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateItem {
    pub local_id: String,
    pub kind: ItemKind,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Signed workdays from the template's effective anchor to this item's start.
    /// The anchor is snapped to a workday first, and the value is the inclusive
    /// workday count minus one: 0 on the anchor, 1 on the next workday, -1 on
    /// the previous one.
    #[serde(default)]
    pub start_offset: Option<i64>,
    #[serde(default)]
    pub workdays: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assignees: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
    pub parent_ref: ParentRef,
    /// Local ids of items this one blocks.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<String>,
}

impl TemplateItem {
    pub fn new(local_id: impl Into<String>, kind: ItemKind, title: impl Into<String>) -> Self {
        Self {
            local_id: local_id.into(),
            kind,
            title: title.into(),
            description: None,
            start_offset: None,
            workdays: None,
            labels: Vec::new(),
            assignees: Vec::new(),
            weight: None,
            parent_ref: ParentRef::Root,
            blocks: Vec::new(),
        }
    }
}

/// A date-relative snapshot of a grouping item and its descendants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Missing in records written before versioning; read as 0 and migrated on load.
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub storage_location: StorageLocation,
    pub root: TemplateRoot,
    #[serde(default)]
    pub items: Vec<TemplateItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSummary {
    pub id: String,
    pub name: String,
    pub root_title: String,
    pub item_count: usize,
    pub storage_location: StorageLocation,
    pub version: u32,
    pub updated_at: DateTime<Utc>,
}

impl Template {
    pub fn new(
        name: impl Into<String>,
        storage_location: StorageLocation,
        root: TemplateRoot,
        items: Vec<TemplateItem>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            created_at: now,
            updated_at: now,
            version: TEMPLATE_VERSION,
            storage_location,
            root,
            items,
        }
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.updated_at = Utc::now();
    }

    pub fn item(&self, local_id: &str) -> Option<&TemplateItem> {
        self.items.iter().find(|item| item.local_id == local_id)
    }

    /// `(blocker, blocked)` local id pairs in item order.
    pub fn blocking_edges(&self) -> Vec<(&str, &str)> {
        self.items
            .iter()
            .flat_map(|item| {
                item.blocks
                    .iter()
                    .map(move |target| (item.local_id.as_str(), target.as_str()))
            })
            .collect()
    }

    pub fn summary(&self) -> TemplateSummary {
        TemplateSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            root_title: self.root.title.clone(),
            item_count: self.items.len(),
            storage_location: self.storage_location,
            version: self.version,
            updated_at: self.updated_at,
        }
    }
}
