use super::{PersistenceError, PersistenceResult, TemplateStore};
use crate::template::{Template, TemplateSummary};
use crate::template_validation::validate_template;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryTemplateStore {
    templates: Mutex<HashMap<String, Template>>,
}

impl MemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TemplateStore for MemoryTemplateStore {
    fn save_template(&self, template: &Template) -> PersistenceResult<()> {
        validate_template(template)?;
        let mut templates = self
            .templates
            .lock()
            .map_err(|_| PersistenceError::LockPoisoned)?;
        templates.insert(template.id.clone(), template.clone());
        Ok(())
    }

    fn load_template(&self, id: &str) -> PersistenceResult<Option<Template>> {
        let templates = self
            .templates
            .lock()
            .map_err(|_| PersistenceError::LockPoisoned)?;
        Ok(templates.get(id).cloned())
    }

    fn list_templates(&self) -> PersistenceResult<Vec<TemplateSummary>> {
        let templates = self
            .templates
            .lock()
            .map_err(|_| PersistenceError::LockPoisoned)?;
        let mut summaries: Vec<TemplateSummary> =
            templates.values().map(Template::summary).collect();
        super::sort_summaries(&mut summaries);
        Ok(summaries)
    }

    fn delete_template(&self, id: &str) -> PersistenceResult<bool> {
        let mut templates = self
            .templates
            .lock()
            .map_err(|_| PersistenceError::LockPoisoned)?;
        Ok(templates.remove(id).is_some())
    }
}
