use crate::template::{TEMPLATE_VERSION, Template, TemplateSummary};
use crate::template_validation::{TemplateValidationError, validate_template};
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid template: {0}")]
    Validation(#[from] TemplateValidationError),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("template {0} not found")]
    NotFound(String),
    #[error("template store lock poisoned")]
    LockPoisoned,
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Durable home for captured templates. Items are never edited in place; the
/// only mutations after capture are rename and delete.
pub trait TemplateStore: Send + Sync {
    fn save_template(&self, template: &Template) -> PersistenceResult<()>;
    fn load_template(&self, id: &str) -> PersistenceResult<Option<Template>>;
    fn list_templates(&self) -> PersistenceResult<Vec<TemplateSummary>>;
    fn delete_template(&self, id: &str) -> PersistenceResult<bool>;

    fn rename_template(&self, id: &str, name: &str) -> PersistenceResult<Template> {
        let mut template = self
            .load_template(id)?
            .ok_or_else(|| PersistenceError::NotFound(id.to_string()))?;
        template.rename(name);
        self.save_template(&template)?;
        Ok(template)
    }
}

/// Bring a stored record up to `TEMPLATE_VERSION` and validate it.
pub fn migrate_template(mut template: Template) -> PersistenceResult<Template> {
    if template.version > TEMPLATE_VERSION {
        return Err(TemplateValidationError::UnsupportedVersion {
            found: template.version,
            supported: TEMPLATE_VERSION,
        }
        .into());
    }
    // Version 0 records predate the version field; their shape is otherwise identical.
    if template.version == 0 {
        template.version = TEMPLATE_VERSION;
    }
    validate_template(&template)?;
    Ok(template)
}

/// Newest first, then by name.
pub(crate) fn sort_summaries(summaries: &mut [TemplateSummary]) {
    summaries.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| a.name.cmp(&b.name))
    });
}

pub mod file;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::{
    JsonDirTemplateStore, load_template_from_csv, load_template_from_json, save_template_to_csv,
    save_template_to_json,
};
pub use memory::MemoryTemplateStore;
