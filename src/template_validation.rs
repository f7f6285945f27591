use crate::calendar::MAX_WORKDAY_SPAN;
use crate::template::{TEMPLATE_VERSION, Template, TemplateItem};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateValidationError {
    #[error("template name must not be blank")]
    BlankName,
    #[error("template version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
    #[error("duplicate template item id {0}")]
    DuplicateLocalId(String),
    #[error("template item {0} has a blank title")]
    BlankItemTitle(String),
    #[error("{owner} has negative workdays {workdays}")]
    NegativeWorkdays { owner: String, workdays: i64 },
    #[error("{owner} has {field} {value} outside +/-{limit} workdays")]
    SpanOutOfRange {
        owner: String,
        field: &'static str,
        value: i64,
        limit: i64,
    },
}

fn check_span(
    owner: impl Fn() -> String,
    field: &'static str,
    value: Option<i64>,
) -> Result<(), TemplateValidationError> {
    match value {
        Some(value) if value.unsigned_abs() > MAX_WORKDAY_SPAN.unsigned_abs() => {
            Err(TemplateValidationError::SpanOutOfRange {
                owner: owner(),
                field,
                value,
                limit: MAX_WORKDAY_SPAN,
            })
        }
        _ => Ok(()),
    }
}

fn validate_item(item: &TemplateItem) -> Result<(), TemplateValidationError> {
    if item.title.trim().is_empty() {
        return Err(TemplateValidationError::BlankItemTitle(
            item.local_id.clone(),
        ));
    }
    if let Some(workdays) = item.workdays {
        if workdays < 0 {
            return Err(TemplateValidationError::NegativeWorkdays {
                owner: format!("template item {}", item.local_id),
                workdays,
            });
        }
    }
    let owner = || format!("template item {}", item.local_id);
    check_span(owner, "start_offset", item.start_offset)?;
    check_span(owner, "workdays", item.workdays)?;
    Ok(())
}

/// Structural checks run before a template is stored or replayed. Dangling
/// parent references and blocks targets are tolerated: replay records or
/// skips them instead.
pub fn validate_template(template: &Template) -> Result<(), TemplateValidationError> {
    if template.name.trim().is_empty() {
        return Err(TemplateValidationError::BlankName);
    }
    if template.version > TEMPLATE_VERSION {
        return Err(TemplateValidationError::UnsupportedVersion {
            found: template.version,
            supported: TEMPLATE_VERSION,
        });
    }
    if let Some(workdays) = template.root.workdays {
        if workdays < 0 {
            return Err(TemplateValidationError::NegativeWorkdays {
                owner: "template root".to_string(),
                workdays,
            });
        }
    }
    check_span(|| "template root".to_string(), "workdays", template.root.workdays)?;

    let mut seen_ids = HashSet::with_capacity(template.items.len());
    for item in &template.items {
        if !seen_ids.insert(item.local_id.as_str()) {
            return Err(TemplateValidationError::DuplicateLocalId(
                item.local_id.clone(),
            ));
        }
        validate_item(item)?;
    }
    Ok(())
}
