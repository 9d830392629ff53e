//! Student store - the students linked to the signed-in parent

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::entities::students;
use crate::types::{Student, StudentQuery};

impl From<students::Model> for Student {
    fn from(model: students::Model) -> Self {
        Self {
            id: model.id,
            student_number: model.student_number,
            full_name: model.full_name,
            class_name: model.class_name,
        }
    }
}

/// Student store
#[derive(Clone)]
pub struct StudentStore {
    db: DatabaseConnection,
}

impl StudentStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Insert or update students in one transaction
    pub async fn save(&self, items: &[Student]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }

        let txn = self.db.begin().await.context("Failed to begin transaction")?;
        let now = chrono::Utc::now().timestamp_millis();

        for student in items {
            let existing = students::Entity::find_by_id(student.id)
                .one(&txn)
                .await
                .context("Failed to look up student")?;

            if let Some(model) = existing {
                let mut active: students::ActiveModel = model.into();
                active.student_number = Set(student.student_number.clone());
                active.full_name = Set(student.full_name.clone());
                active.class_name = Set(student.class_name.clone());
                active.updated_at = Set(now);
                active
                    .update(&txn)
                    .await
                    .context("Failed to update student")?;
            } else {
                let row = students::ActiveModel {
                    id: Set(student.id),
                    student_number: Set(student.student_number.clone()),
                    full_name: Set(student.full_name.clone()),
                    class_name: Set(student.class_name.clone()),
                    updated_at: Set(now),
                };
                match row.insert(&txn).await {
                    Ok(_) => {}
                    Err(DbErr::RecordNotFound(_)) => {}
                    Err(e) => return Err(e).context("Failed to insert student"),
                }
            }
        }

        txn.commit().await.context("Failed to commit students")?;
        info!("Saved {} students", items.len());
        Ok(())
    }

    /// Find a student by server id or student number
    pub async fn find(&self, query: &StudentQuery) -> Result<Option<Student>> {
        debug!("Looking up student: {:?}", query);

        let select = match query {
            StudentQuery::ById(id) => students::Entity::find_by_id(*id),
            StudentQuery::ByNumber(number) => {
                students::Entity::find().filter(students::Column::StudentNumber.eq(number.as_str()))
            }
        };

        let row = select
            .one(&self.db)
            .await
            .context("Failed to fetch student")?;
        Ok(row.map(Student::from))
    }

    /// All known students ordered by id
    pub async fn list(&self) -> Result<Vec<Student>> {
        let rows = students::Entity::find()
            .order_by_asc(students::Column::Id)
            .all(&self.db)
            .await
            .context("Failed to list students")?;

        Ok(rows.into_iter().map(Student::from).collect())
    }

    pub async fn count(&self) -> Result<u64> {
        students::Entity::find()
            .count(&self.db)
            .await
            .context("Failed to count students")
    }
}
