use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Messages {
    Table,
    Id,
    Title,
    Content,
    Priority,
    GroupName,
    EditedAt,
    Images,
    SentTime,
    ViewedAt,
    ReadStatus,
    ReadTime,
    SentStatus,
    StudentNumber,
    StudentId,
}

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20250301_000001_create_messages_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Messages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Messages::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Messages::Title).string().not_null())
                    .col(ColumnDef::new(Messages::Content).string().not_null())
                    .col(
                        ColumnDef::new(Messages::Priority)
                            .string()
                            .not_null()
                            .default("medium"),
                    )
                    .col(ColumnDef::new(Messages::GroupName).string())
                    .col(ColumnDef::new(Messages::EditedAt).big_integer())
                    .col(
                        ColumnDef::new(Messages::Images)
                            .string()
                            .not_null()
                            .default("[]"),
                    )
                    .col(ColumnDef::new(Messages::SentTime).big_integer().not_null())
                    .col(ColumnDef::new(Messages::ViewedAt).big_integer())
                    .col(
                        ColumnDef::new(Messages::ReadStatus)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Messages::ReadTime).big_integer())
                    .col(
                        ColumnDef::new(Messages::SentStatus)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Messages::StudentNumber).string().not_null())
                    .col(ColumnDef::new(Messages::StudentId).big_integer().not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Messages::Table).to_owned())
            .await
    }
}
