use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::shared::{SYSTEM_KEYS, validate_image_url};
use crate::error::AppError;
use crate::records::{NewRecord, Record, RecordChanges};

/// Record as returned by the API. User fields are flattened next to the
/// system-owned ones.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordResponse {
    pub id: Uuid,
    #[serde(flatten)]
    #[schema(value_type = Object, example = json!({"title": "Dunes", "description": "Namib, early light", "date": "2024-05-01"}))]
    pub fields: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Record> for RecordResponse {
    fn from(model: Record) -> Self {
        let mut fields = match model.fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        // System keys always win over same-named user keys.
        for key in SYSTEM_KEYS.iter().chain(&["imageUrl", "imagePath"]) {
            fields.remove(*key);
        }

        Self {
            id: model.id,
            fields,
            image_url: model.image_url,
            image_path: model.image_path,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct RecordListQuery {
    /// Maximum number of records, 1-100. Default: 100.
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct DeleteRecordResponse {
    pub deleted: Uuid,
}

/// A client body split into user fields and the image reference columns.
#[derive(Debug, Default, PartialEq)]
pub struct RecordBody {
    pub fields: Map<String, Value>,
    pub image_url: Option<Option<String>>,
    pub image_path: Option<Option<String>>,
}

impl RecordBody {
    /// Split a client JSON object.
    ///
    /// System keys (`id`, `_id`, timestamps, `version`) are dropped so
    /// clients can't choose identifiers. `imageUrl`/`imagePath` are lifted
    /// out: `null` or `""` clears, a string sets.
    pub fn parse(body: Value) -> Result<Self, AppError> {
        let Value::Object(mut map) = body else {
            return Err(AppError::Validation(
                "Request body must be a JSON object".into(),
            ));
        };

        for key in SYSTEM_KEYS {
            map.remove(*key);
        }

        let image_url = take_reference(&mut map, "imageUrl")?;
        if let Some(Some(url)) = &image_url {
            validate_image_url(url)?;
        }
        let image_path = take_reference(&mut map, "imagePath")?;

        Ok(Self {
            fields: map,
            image_url,
            image_path,
        })
    }

    pub fn into_new_record(self) -> NewRecord {
        NewRecord {
            fields: self
                .fields
                .into_iter()
                .filter(|(_, v)| !v.is_null())
                .collect(),
            image_url: self.image_url.flatten(),
            image_path: self.image_path.flatten(),
        }
    }

    pub fn into_changes(self) -> RecordChanges {
        RecordChanges {
            fields: self.fields,
            image_url: self.image_url,
            image_path: self.image_path,
        }
    }
}

fn take_reference(
    map: &mut Map<String, Value>,
    key: &str,
) -> Result<Option<Option<String>>, AppError> {
    match map.remove(key) {
        None => Ok(None),
        Some(Value::Null) => Ok(Some(None)),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(Some(None)),
        Some(Value::String(s)) => Ok(Some(Some(s.trim().to_string()))),
        Some(_) => Err(AppError::Validation(format!("{key} must be a string"))),
    }
}
