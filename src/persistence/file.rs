use super::{PersistenceError, PersistenceResult, TemplateStore, migrate_template};
use crate::template::{ItemKind, ParentRef, Template, TemplateItem, TemplateSummary};
use crate::template_validation::validate_template;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::warn;

pub fn save_template_to_json<P: AsRef<Path>>(
    template: &Template,
    path: P,
) -> PersistenceResult<()> {
    validate_template(template)?;
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, template)?;
    Ok(())
}

pub fn load_template_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<Template> {
    let file = File::open(path)?;
    let template: Template = serde_json::from_reader(file)?;
    migrate_template(template)
}

/// One `<id>.json` file per template inside a directory.
#[derive(Debug, Clone)]
pub struct JsonDirTemplateStore {
    dir: PathBuf,
}

impl JsonDirTemplateStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> PersistenceResult<Self> {
        fs::create_dir_all(dir.as_ref())?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> PersistenceResult<PathBuf> {
        let safe = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !safe {
            return Err(PersistenceError::InvalidData(format!(
                "template id '{id}' is not usable as a file name"
            )));
        }
        Ok(self.dir.join(format!("{id}.json")))
    }
}

impl TemplateStore for JsonDirTemplateStore {
    fn save_template(&self, template: &Template) -> PersistenceResult<()> {
        let path = self.path_for(&template.id)?;
        save_template_to_json(template, path)
    }

    fn load_template(&self, id: &str) -> PersistenceResult<Option<Template>> {
        let path = self.path_for(id)?;
        match File::open(&path) {
            Ok(file) => {
                let template: Template = serde_json::from_reader(file)?;
                migrate_template(template).map(Some)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn list_templates(&self) -> PersistenceResult<Vec<TemplateSummary>> {
        let mut summaries = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match load_template_from_json(&path) {
                Ok(template) => summaries.push(template.summary()),
                Err(err) => warn!(path = %path.display(), error = %err, "skipping unreadable template"),
            }
        }
        super::sort_summaries(&mut summaries);
        Ok(summaries)
    }

    fn delete_template(&self, id: &str) -> PersistenceResult<bool> {
        let path = self.path_for(id)?;
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

#[derive(Default, Serialize, Deserialize)]
struct TemplateCsvRecord {
    local_id: String,
    kind: String,
    title: String,
    description: String,
    start_offset: String,
    workdays: String,
    labels: String,
    assignees: String,
    weight: String,
    parent_ref: String,
    blocks: String,
    #[serde(default)]
    template_json: String,
}

impl From<&TemplateItem> for TemplateCsvRecord {
    fn from(item: &TemplateItem) -> Self {
        TemplateCsvRecord {
            local_id: item.local_id.clone(),
            kind: item.kind.as_str().to_string(),
            title: item.title.clone(),
            description: item.description.clone().unwrap_or_default(),
            start_offset: format_option_i64(item.start_offset),
            workdays: format_option_i64(item.workdays),
            labels: join_strings(&item.labels),
            assignees: join_strings(&item.assignees),
            weight: item.weight.map(|w| w.to_string()).unwrap_or_default(),
            parent_ref: item.parent_ref.to_string(),
            blocks: item.blocks.join(","),
            template_json: String::new(),
        }
    }
}

impl TemplateCsvRecord {
    /// Header row carrying everything but the items.
    fn metadata_row(template: &Template) -> PersistenceResult<Self> {
        let mut header = template.clone();
        header.items.clear();
        Ok(TemplateCsvRecord {
            template_json: serde_json::to_string(&header)?,
            ..TemplateCsvRecord::default()
        })
    }

    fn is_metadata_row(&self) -> bool {
        !self.template_json.trim().is_empty()
    }

    fn into_item(self) -> PersistenceResult<TemplateItem> {
        if self.is_metadata_row() {
            return Err(PersistenceError::InvalidData(
                "metadata row cannot be converted to template item".into(),
            ));
        }
        let kind = ItemKind::from_str(&self.kind).ok_or_else(|| {
            PersistenceError::InvalidData(format!("invalid item kind '{}'", self.kind))
        })?;
        let weight = if self.weight.trim().is_empty() {
            None
        } else {
            Some(self.weight.trim().parse::<u32>().map_err(|e| {
                PersistenceError::InvalidData(format!("invalid weight '{}': {e}", self.weight))
            })?)
        };
        Ok(TemplateItem {
            local_id: self.local_id,
            kind,
            title: self.title,
            description: parse_string_option(self.description),
            start_offset: parse_i64(&self.start_offset)?,
            workdays: parse_i64(&self.workdays)?,
            labels: split_strings(&self.labels, ';'),
            assignees: split_strings(&self.assignees, ';'),
            weight,
            parent_ref: ParentRef::from(self.parent_ref.trim().to_string()),
            blocks: split_strings(&self.blocks, ','),
        })
    }
}

pub fn save_template_to_csv<P: AsRef<Path>>(template: &Template, path: P) -> PersistenceResult<()> {
    validate_template(template)?;
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    writer.serialize(TemplateCsvRecord::metadata_row(template)?)?;
    for item in &template.items {
        writer.serialize(TemplateCsvRecord::from(item))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_template_from_csv<P: AsRef<Path>>(path: P) -> PersistenceResult<Template> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);
    let mut header: Option<Template> = None;
    let mut items = Vec::new();
    for record in reader.deserialize::<TemplateCsvRecord>() {
        let record = record?;
        if record.is_metadata_row() {
            if header.is_some() {
                return Err(PersistenceError::InvalidData(
                    "CSV file contained multiple metadata rows".into(),
                ));
            }
            header = Some(serde_json::from_str(&record.template_json).map_err(|err| {
                PersistenceError::InvalidData(format!("invalid template json: {err}"))
            })?);
            continue;
        }
        items.push(record.into_item()?);
    }

    let mut template = header.ok_or_else(|| {
        PersistenceError::InvalidData("CSV file contained no metadata row".into())
    })?;
    template.items = items;
    migrate_template(template)
}

fn format_option_i64(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn parse_i64(input: &str) -> PersistenceResult<Option<i64>> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    input
        .trim()
        .parse::<i64>()
        .map(Some)
        .map_err(|e| PersistenceError::InvalidData(format!("invalid integer '{input}': {e}")))
}

fn join_strings(values: &[String]) -> String {
    values.join(";")
}

fn split_strings(input: &str, separator: char) -> Vec<String> {
    if input.trim().is_empty() {
        return Vec::new();
    }
    input
        .split(separator)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_string_option(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
