use async_trait::async_trait;
use common::storage::{BagId, FileId};
use sea_orm::ActiveValue::{Set, Unchanged};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};

use super::{BagRecord, BagRecordStore, NewBagRecord, StoreError, StoreResult};
use crate::entity::bag;

/// Record store backed by the `bag` table.
#[derive(Clone)]
pub struct SeaOrmBagStore {
    db: DatabaseConnection,
}

impl SeaOrmBagStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_where(&self, filter: sea_orm::Condition) -> StoreResult<Vec<BagRecord>> {
        bag::Entity::find()
            .filter(filter)
            .order_by_asc(bag::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(BagRecord::try_from)
            .collect()
    }
}

impl TryFrom<bag::Model> for BagRecord {
    type Error = StoreError;

    fn try_from(model: bag::Model) -> Result<Self, Self::Error> {
        let hash_type = model.hash_type.parse().map_err(|e| StoreError::Corrupt {
            id: model.id,
            reason: format!("{e}"),
        })?;
        Ok(Self {
            id: model.id,
            file_id: FileId(model.file_id),
            bag_id: BagId(model.bag_id),
            user_id: model.user_id,
            hash_type,
            hash_value: model.hash_value,
            created: model.created,
            updated: model.updated,
        })
    }
}

#[async_trait]
impl BagRecordStore for SeaOrmBagStore {
    async fn insert(&self, record: NewBagRecord) -> StoreResult<BagRecord> {
        let model = bag::ActiveModel {
            file_id: Set(record.file_id.0),
            bag_id: Set(record.bag_id.0),
            user_id: Set(record.user_id),
            hash_type: Set(record.hash_type.to_string()),
            hash_value: Set(record.hash_value),
            created: Set(record.created),
            updated: Set(record.updated),
            ..Default::default()
        };
        model.insert(&self.db).await?.try_into()
    }

    async fn update(&self, record: &BagRecord) -> StoreResult<BagRecord> {
        let model = bag::ActiveModel {
            id: Unchanged(record.id),
            file_id: Set(record.file_id.0),
            bag_id: Set(record.bag_id.0),
            user_id: Set(record.user_id.clone()),
            hash_type: Set(record.hash_type.to_string()),
            hash_value: Set(record.hash_value.clone()),
            created: Set(record.created),
            updated: Set(record.updated),
        };
        match model.update(&self.db).await {
            Ok(updated) => updated.try_into(),
            Err(DbErr::RecordNotUpdated) => {
                Err(StoreError::NotFound(format!("record {}", record.id)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, record: &BagRecord) -> StoreResult<()> {
        let result = bag::Entity::delete_by_id(record.id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(StoreError::NotFound(format!("record {}", record.id)));
        }
        Ok(())
    }

    async fn delete_many(&self, records: &[BagRecord]) -> StoreResult<u64> {
        let txn = self.db.begin().await?;
        let mut removed = 0;
        for record in records {
            let result = bag::Entity::delete_by_id(record.id).exec(&txn).await?;
            if result.rows_affected == 0 {
                txn.rollback().await?;
                return Err(StoreError::NotFound(format!("record {}", record.id)));
            }
            removed += result.rows_affected;
        }
        txn.commit().await?;
        Ok(removed)
    }

    async fn find_all(&self, user_id: &str) -> StoreResult<Vec<BagRecord>> {
        self.find_where(sea_orm::Condition::all().add(bag::Column::UserId.eq(user_id)))
            .await
    }

    async fn find_by_bag_id(&self, bag_id: BagId, user_id: &str) -> StoreResult<Vec<BagRecord>> {
        self.find_where(
            sea_orm::Condition::all()
                .add(bag::Column::BagId.eq(bag_id.0))
                .add(bag::Column::UserId.eq(user_id)),
        )
        .await
    }

    async fn find_by_file_id(
        &self,
        file_id: FileId,
        user_id: &str,
    ) -> StoreResult<Vec<BagRecord>> {
        self.find_where(
            sea_orm::Condition::all()
                .add(bag::Column::FileId.eq(file_id.0))
                .add(bag::Column::UserId.eq(user_id)),
        )
        .await
    }
}
