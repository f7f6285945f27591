pub mod calendar;
pub mod capture;
pub mod graph;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod instantiate;
pub mod item;
pub mod persistence;
pub mod template;
pub mod template_validation;

pub use calendar::{
    BusinessCalendar, BusinessCalendarConfig, CalendarError, MAX_SCAN_DAYS, MAX_WORKDAY_SPAN,
    WeeklyPattern, normalize_date_key, parse_loose_date,
};
pub use capture::{CaptureError, CaptureOptions, capture_template};
pub use instantiate::{
    DryRunApi, InstantiationError, InstantiationOptions, InstantiationResult, ItemNaming,
    RemoteApi, RootNaming, instantiate, instantiate_into, preview_instantiation,
};
pub use item::{DependencyEdge, DependencyKind, WorkItem, WorkItemKind, WorkItemSnapshot};
#[cfg(feature = "sqlite")]
pub use persistence::sqlite::SqliteTemplateStore;
pub use persistence::{
    JsonDirTemplateStore, MemoryTemplateStore, PersistenceError, PersistenceResult, TemplateStore,
    load_template_from_csv, load_template_from_json, save_template_to_csv, save_template_to_json,
};
pub use template::{
    ItemKind, ParentRef, StorageLocation, TEMPLATE_VERSION, Template, TemplateItem, TemplateRoot,
    TemplateSummary,
};
pub use template_validation::{TemplateValidationError, validate_template};
