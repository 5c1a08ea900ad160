use sea_orm::sea_query::{ColumnDef, Index, Table};
use sea_orm::{ConnectionTrait, DbErr};

use crate::entities::{log_entries, users};

pub async fn create_if_absent<C: ConnectionTrait>(conn: &C) -> Result<(), DbErr> {
    let backend = conn.get_database_backend();

    let users_table = Table::create()
        .table(users::Entity)
        .if_not_exists()
        .col(
            ColumnDef::new(users::Column::Id)
                .integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(
            ColumnDef::new(users::Column::Username)
                .text()
                .not_null()
                .unique_key(),
        )
        .col(ColumnDef::new(users::Column::Password).blob().not_null())
        .col(
            ColumnDef::new(users::Column::IsActive)
                .boolean()
                .not_null()
                .default(true),
        )
        .col(ColumnDef::new(users::Column::SecurityQ).text().not_null())
        .col(ColumnDef::new(users::Column::SecurityAns).text().not_null())
        .to_owned();

    let log_entries_table = Table::create()
        .table(log_entries::Entity)
        .if_not_exists()
        .col(
            ColumnDef::new(log_entries::Column::Id)
                .integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(ColumnDef::new(log_entries::Column::Username).text().not_null())
        .col(ColumnDef::new(log_entries::Column::Start).text().not_null())
        .col(ColumnDef::new(log_entries::Column::End).text().not_null())
        .col(ColumnDef::new(log_entries::Column::Notes).text().null())
        .col(ColumnDef::new(log_entries::Column::Date).text().not_null())
        .col(ColumnDef::new(log_entries::Column::Car).text().null())
        .to_owned();

    // Per-user listing sorts on date
    let log_entries_index = Index::create()
        .if_not_exists()
        .name("idx_log_entries_username_date")
        .table(log_entries::Entity)
        .col(log_entries::Column::Username)
        .col(log_entries::Column::Date)
        .to_owned();

    conn.execute(backend.build(&users_table)).await?;
    conn.execute(backend.build(&log_entries_table)).await?;
    conn.execute(backend.build(&log_entries_index)).await?;

    Ok(())
}

pub async fn drop_all<C: ConnectionTrait>(conn: &C) -> Result<(), DbErr> {
    let backend = conn.get_database_backend();

    for statement in [
        Table::drop().table(log_entries::Entity).if_exists().to_owned(),
        Table::drop().table(users::Entity).if_exists().to_owned(),
    ] {
        conn.execute(backend.build(&statement)).await?;
    }

    Ok(())
}
