use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Messages {
    Table,
    StudentNumber,
    SentTime,
    ReadStatus,
    SentStatus,
}

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20250302_000001_add_message_indexes"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Listing by recency
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_messages_student_sent_time")
                    .table(Messages::Table)
                    .col(Messages::StudentNumber)
                    .col(Messages::SentTime)
                    .to_owned(),
            )
            .await?;

        // Pending acknowledgment lookups
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_messages_student_receipt")
                    .table(Messages::Table)
                    .col(Messages::StudentNumber)
                    .col(Messages::ReadStatus)
                    .col(Messages::SentStatus)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_messages_student_receipt")
                    .table(Messages::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_messages_student_sent_time")
                    .table(Messages::Table)
                    .to_owned(),
            )
            .await
    }
}
