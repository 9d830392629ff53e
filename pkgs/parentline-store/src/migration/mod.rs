//! Sea-ORM migrations for the on-device schema

pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_messages_table;
mod m20250301_000002_create_students_table;
mod m20250302_000001_add_message_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_messages_table::Migration),
            Box::new(m20250301_000002_create_students_table::Migration),
            Box::new(m20250302_000001_add_message_indexes::Migration),
        ]
    }
}
