use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,

    /// Argon2id PHC string, stored as bytes
    #[sea_orm(column_type = "Blob")]
    pub password: Vec<u8>,

    pub is_active: bool,

    pub security_q: String,

    /// Stored as entered; there is no recovery flow that would justify hashing it yet.
    pub security_ans: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
