use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "log_entries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Owning user, by value
    pub username: String,

    pub start: String,

    pub end: String,

    pub notes: Option<String>,

    /// `%Y-%m-%d %H:%M:%S`, UTC, no suffix
    pub date: String,

    pub car: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
