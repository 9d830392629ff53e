//! Tests for StudentStore

use parentline_store::{MessageStore, Student, StudentQuery};
use tempfile::NamedTempFile;

fn student(id: i64, number: &str, name: &str) -> Student {
    Student {
        id,
        student_number: number.to_string(),
        full_name: name.to_string(),
        class_name: Some("5B".to_string()),
    }
}

#[tokio::test]
async fn test_save_and_find_student() {
    let temp_file = NamedTempFile::new().unwrap();
    let store = MessageStore::new(temp_file.path().to_path_buf())
        .await
        .expect("Failed to create message store");

    store
        .students()
        .save(&[student(1001, "ST-1001", "Ada"), student(1002, "ST-1002", "Ben")])
        .await
        .expect("Failed to save students");

    let by_id = store
        .find_student(&StudentQuery::ById(1002))
        .await
        .unwrap()
        .expect("student by id");
    assert_eq!(by_id.full_name, "Ben");

    let by_number = store
        .find_student(&StudentQuery::ByNumber("ST-1001".to_string()))
        .await
        .unwrap()
        .expect("student by number");
    assert_eq!(by_number.id, 1001);

    assert!(store
        .find_student(&StudentQuery::ById(7))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_resave_updates_in_place() {
    let temp_file = NamedTempFile::new().unwrap();
    let store = MessageStore::new(temp_file.path().to_path_buf())
        .await
        .unwrap();

    store.students().save(&[student(1001, "ST-1001", "Ada")]).await.unwrap();
    let mut renamed = student(1001, "ST-1001", "Ada Lovelace");
    renamed.class_name = None;
    store.students().save(&[renamed.clone()]).await.unwrap();

    assert_eq!(store.students().count().await.unwrap(), 1);
    assert_eq!(store.students().list().await.unwrap(), vec![renamed]);
}
