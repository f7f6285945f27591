use super::{PersistenceError, PersistenceResult, TemplateStore, migrate_template};
use crate::template::{Template, TemplateSummary};
use crate::template_validation::validate_template;
use rusqlite::{Connection, OptionalExtension, params};
use std::sync::{Mutex, MutexGuard};

pub struct SqliteTemplateStore {
    connection: Mutex<Connection>,
}

impl SqliteTemplateStore {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> PersistenceResult<Self> {
        let connection = Connection::open(path)?;
        Self::from_connection(connection)
    }

    pub fn in_memory() -> PersistenceResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(connection: Connection) -> PersistenceResult<Self> {
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> PersistenceResult<()> {
        let ddl = r#"
            CREATE TABLE IF NOT EXISTS templates (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                template_json TEXT NOT NULL
            );
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    fn lock(&self) -> PersistenceResult<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|_| PersistenceError::LockPoisoned)
    }
}

impl TemplateStore for SqliteTemplateStore {
    fn save_template(&self, template: &Template) -> PersistenceResult<()> {
        validate_template(template)?;
        let json = serde_json::to_string(template)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO templates (id, name, updated_at, template_json) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                updated_at = excluded.updated_at,
                template_json = excluded.template_json",
            params![
                template.id,
                template.name,
                template.updated_at.to_rfc3339(),
                json
            ],
        )?;
        Ok(())
    }

    fn load_template(&self, id: &str) -> PersistenceResult<Option<Template>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT template_json FROM templates WHERE id = ?1")?;
        let json: Option<String> = stmt
            .query_row(params![id], |row| row.get(0))
            .optional()?;

        let Some(json) = json else {
            return Ok(None);
        };
        let template: Template = serde_json::from_str(&json)?;
        migrate_template(template).map(Some)
    }

    fn list_templates(&self) -> PersistenceResult<Vec<TemplateSummary>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT template_json FROM templates")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut summaries = Vec::new();
        for json in rows {
            let template: Template = serde_json::from_str(&json?)?;
            summaries.push(migrate_template(template)?.summary());
        }
        super::sort_summaries(&mut summaries);
        Ok(summaries)
    }

    fn delete_template(&self, id: &str) -> PersistenceResult<bool> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM templates WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }
}
