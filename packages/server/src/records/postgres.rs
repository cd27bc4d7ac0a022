use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::*;
use uuid::Uuid;

use super::{MAX_LIST_LIMIT, NewRecord, Record, RecordChanges, RecordStore, RecordStoreError};
use crate::entity::record;

/// Record store backed by the `record` table.
#[derive(Clone)]
pub struct SeaOrmRecordStore {
    db: DatabaseConnection,
}

impl SeaOrmRecordStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RecordStore for SeaOrmRecordStore {
    async fn list(&self, limit: u64) -> Result<Vec<Record>, RecordStoreError> {
        let records = record::Entity::find()
            .order_by_desc(record::Column::CreatedAt)
            .order_by_desc(record::Column::Id)
            .limit(Ord::min(limit, MAX_LIST_LIMIT))
            .all(&self.db)
            .await?;
        Ok(records)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Record>, RecordStoreError> {
        Ok(record::Entity::find_by_id(id).one(&self.db).await?)
    }

    async fn create(&self, new: NewRecord) -> Result<Record, RecordStoreError> {
        let model = new.into_model(Uuid::now_v7());
        let active = record::ActiveModel {
            id: Set(model.id),
            fields: Set(model.fields),
            image_url: Set(model.image_url),
            image_path: Set(model.image_path),
            version: Set(model.version),
            created_at: Set(model.created_at),
            updated_at: Set(model.updated_at),
        };
        Ok(active.insert(&self.db).await?)
    }

    async fn update(&self, id: Uuid, changes: &RecordChanges) -> Result<Record, RecordStoreError> {
        let current = record::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(RecordStoreError::NotFound)?;
        let next = changes.apply(&current);

        let result = record::Entity::update_many()
            .col_expr(record::Column::Fields, Expr::value(next.fields.clone()))
            .col_expr(record::Column::ImageUrl, Expr::value(next.image_url.clone()))
            .col_expr(record::Column::ImagePath, Expr::value(next.image_path.clone()))
            .col_expr(record::Column::Version, Expr::value(next.version))
            .col_expr(record::Column::UpdatedAt, Expr::value(next.updated_at))
            .filter(record::Column::Id.eq(id))
            .filter(record::Column::Version.eq(current.version))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            let still_exists = record::Entity::find_by_id(id)
                .count(&self.db)
                .await?
                > 0;
            return Err(if still_exists {
                RecordStoreError::WriteConflict
            } else {
                RecordStoreError::NotFound
            });
        }

        Ok(next)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, RecordStoreError> {
        let result = record::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }
}
