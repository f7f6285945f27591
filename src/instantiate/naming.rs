use crate::template::ItemKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootNamingMode {
    #[default]
    Original,
    Prefix,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RootNaming {
    #[serde(default)]
    pub mode: RootNamingMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_title: Option<String>,
}

impl RootNaming {
    pub fn prefixed(prefix: impl Into<String>) -> Self {
        Self {
            mode: RootNamingMode::Prefix,
            prefix: Some(prefix.into()),
            custom_title: None,
        }
    }

    pub fn custom(title: impl Into<String>) -> Self {
        Self {
            mode: RootNamingMode::Custom,
            prefix: None,
            custom_title: Some(title.into()),
        }
    }

    /// A non-blank custom title wins; otherwise the prefix (if any) is put in
    /// front of the original title.
    pub fn resolve(&self, original: &str) -> String {
        if self.mode == RootNamingMode::Custom {
            if let Some(custom) = non_blank(self.custom_title.as_deref()) {
                return custom.to_string();
            }
        }
        if self.mode != RootNamingMode::Original {
            if let Some(prefix) = non_blank(self.prefix.as_deref()) {
                return with_prefix(prefix, original);
            }
        }
        original.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ItemNaming {
    /// Prefix issue-level (`parent`) items.
    #[serde(default)]
    pub add_issue_prefix: bool,
    /// Prefix task-level (`leaf`) items.
    #[serde(default)]
    pub add_task_prefix: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

impl ItemNaming {
    pub fn resolve(&self, kind: ItemKind, original: &str) -> String {
        let enabled = match kind {
            ItemKind::Parent => self.add_issue_prefix,
            ItemKind::Leaf => self.add_task_prefix,
        };
        match non_blank(self.prefix.as_deref()) {
            Some(prefix) if enabled => with_prefix(prefix, original),
            _ => original.to_string(),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn with_prefix(prefix: &str, title: &str) -> String {
    format!("{prefix} {title}")
}
