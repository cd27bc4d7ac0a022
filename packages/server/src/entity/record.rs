use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "record")]
pub struct Model {
    /// UUIDv7 primary key, assigned on insert.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// User-supplied scalar fields (title, description, date, ...) as a JSON object.
    #[sea_orm(column_type = "JsonBinary")]
    pub fields: Json,

    /// Public URL of the attached image, as returned by the object store.
    pub image_url: Option<String>,

    /// Object store key of the attached image.
    pub image_path: Option<String>,

    /// Optimistic concurrency token, bumped on every update.
    pub version: i32,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
