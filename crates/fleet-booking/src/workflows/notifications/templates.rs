use serde::{Deserialize, Deserializer};
use std::io::Read;
use std::path::Path;

use super::domain::{NotificationTemplate, NotifyRole, NotifyType, TemplateId};

#[derive(Debug, thiserror::Error)]
pub enum TemplateImportError {
    #[error("failed to read template export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid template CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("template {id}: unknown notify type '{value}'")]
    UnknownNotifyType { id: String, value: String },
    #[error("template {id}: unknown notify role '{value}'")]
    UnknownNotifyRole { id: String, value: String },
    #[error("template {id}: status code is empty")]
    MissingStatusCode { id: String },
}

/// Loads notification templates from a reference-data CSV export.
pub struct TemplateImporter;

impl TemplateImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
    ) -> Result<Vec<NotificationTemplate>, TemplateImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(
        reader: R,
    ) -> Result<Vec<NotificationTemplate>, TemplateImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut templates = Vec::new();

        for record in csv_reader.deserialize::<TemplateRow>() {
            templates.push(record?.into_template()?);
        }

        Ok(templates)
    }
}

#[derive(Debug, Deserialize)]
struct TemplateRow {
    id: String,
    status_code: String,
    notify_type: String,
    notify_role: String,
    #[serde(default)]
    title: String,
    message: String,
    #[serde(default, deserialize_with = "flag_or_blank")]
    is_deleted: bool,
}

impl TemplateRow {
    fn into_template(self) -> Result<NotificationTemplate, TemplateImportError> {
        if self.status_code.is_empty() {
            return Err(TemplateImportError::MissingStatusCode { id: self.id });
        }
        let notify_type = NotifyType::from_label(&self.notify_type).ok_or_else(|| {
            TemplateImportError::UnknownNotifyType {
                id: self.id.clone(),
                value: self.notify_type.clone(),
            }
        })?;
        let notify_role = NotifyRole::from_label(&self.notify_role).ok_or_else(|| {
            TemplateImportError::UnknownNotifyRole {
                id: self.id.clone(),
                value: self.notify_role.clone(),
            }
        })?;

        Ok(NotificationTemplate {
            id: TemplateId(self.id),
            status_code: self.status_code,
            notify_type,
            notify_role,
            title: self.title,
            message: self.message,
            is_deleted: self.is_deleted,
        })
    }
}

fn flag_or_blank<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" => Ok(false),
        "1" | "true" => Ok(true),
        other => Err(serde::de::Error::custom(format!(
            "expected 0/1 flag, got '{other}'"
        ))),
    }
}
