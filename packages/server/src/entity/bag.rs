use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bag")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Source file the bag was built from.
    #[sea_orm(indexed)]
    pub file_id: i64,

    /// Container in the bag storage backend.
    #[sea_orm(indexed)]
    pub bag_id: Uuid,

    #[sea_orm(indexed)]
    pub user_id: String,

    /// Digest algorithm name, e.g. "md5".
    pub hash_type: String,

    /// Container digest as of the last create or update.
    pub hash_value: String,

    pub created: DateTimeUtc,
    pub updated: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
