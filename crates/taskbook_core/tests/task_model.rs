use taskbook_core::{
    MalformedRecordError, NewTask, Priority, StoreConfig, Task, TaskFormats, TaskRecord,
    TaskStatus, TaskStore,
};

fn fixture_record() -> serde_json::Value {
    serde_json::json!({
        "id": 3,
        "title": "Buy milk",
        "description": "2% fat",
        "due_date": "2025-07-20",
        "priority": "high",
        "status": "done",
        "created_at": "2025-07-01T08:15:00",
        "last_updated_at": "2025-07-02T09:30:45.250",
        "is_recurring": true,
        "recurrence_pattern": "weekly"
    })
}

fn decode(value: serde_json::Value) -> Result<Task, MalformedRecordError> {
    let record: TaskRecord = serde_json::from_value(value)?;
    Task::from_record(record, &TaskFormats::default())
}

#[test]
fn from_record_reads_every_field() {
    let task = decode(fixture_record()).unwrap();

    assert_eq!(task.id().get(), 3);
    assert_eq!(task.title(), "Buy milk");
    assert_eq!(task.description(), "2% fat");
    assert_eq!(task.due_date().to_string(), "2025-07-20");
    assert_eq!(task.priority(), Priority::High);
    assert_eq!(task.status(), TaskStatus::Done);
    assert_eq!(task.created_at().to_string(), "2025-07-01 08:15:00");
    assert_eq!(
        task.last_updated_at().to_string(),
        "2025-07-02 09:30:45.250"
    );
    assert!(task.is_recurring());
    assert_eq!(task.recurrence_pattern(), Some("weekly"));
}

#[test]
fn record_roundtrip_preserves_every_field() {
    let formats = TaskFormats::default();
    let task = decode(fixture_record()).unwrap();

    let record = task.to_record(&formats);
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["due_date"], "2025-07-20");
    assert_eq!(json["priority"], "high");
    assert_eq!(json["status"], "done");
    assert_eq!(json["created_at"], "2025-07-01T08:15:00");
    assert_eq!(json["last_updated_at"], "2025-07-02T09:30:45.250");

    let decoded = decode(json).unwrap();
    assert_eq!(decoded, task);
}

#[test]
fn store_created_task_roundtrips_through_record() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = TaskStore::open(StoreConfig::new(dir.path().join("tasks.json"))).unwrap();
    let task = store
        .add_task(NewTask::new("Exercise", "", "2025-07-21", "Medium").recurring("daily"))
        .unwrap();

    let formats = store.formats().clone();
    let decoded = Task::from_record(task.to_record(&formats), &formats).unwrap();
    assert_eq!(decoded, task);
}

#[test]
fn missing_optional_fields_use_defaults() {
    let value = serde_json::json!({
        "id": 1,
        "title": "Pay rent",
        "due_date": "2025-08-01",
        "priority": "medium",
        "created_at": "2025-07-01T08:15:00",
        "last_updated_at": "2025-07-01T08:15:00"
    });

    let task = decode(value).unwrap();
    assert_eq!(task.status(), TaskStatus::NotDone);
    assert_eq!(task.description(), "");
    assert!(!task.is_recurring());
    assert_eq!(task.recurrence_pattern(), None);
}

#[test]
fn missing_priority_is_rejected() {
    let mut value = fixture_record();
    value.as_object_mut().unwrap().remove("priority");

    let err = decode(value).unwrap_err();
    assert!(matches!(err, MalformedRecordError::Decode(_)));
    assert!(err.to_string().contains("priority"), "unexpected error: {err}");
}

#[test]
fn unknown_priority_label_is_rejected() {
    let mut value = fixture_record();
    value["priority"] = serde_json::json!("urgent");

    assert!(matches!(
        decode(value).unwrap_err(),
        MalformedRecordError::Decode(_)
    ));
}

#[test]
fn malformed_dates_and_timestamps_are_rejected() {
    let mut value = fixture_record();
    value["due_date"] = serde_json::json!("20/07/2025");
    assert!(matches!(
        decode(value).unwrap_err(),
        MalformedRecordError::InvalidDate {
            field: "due_date",
            ..
        }
    ));

    let mut value = fixture_record();
    value["created_at"] = serde_json::json!("yesterday");
    assert!(matches!(
        decode(value).unwrap_err(),
        MalformedRecordError::InvalidTimestamp {
            field: "created_at",
            ..
        }
    ));
}

#[test]
fn zero_id_and_blank_title_are_rejected() {
    let mut value = fixture_record();
    value["id"] = serde_json::json!(0);
    assert!(matches!(
        decode(value).unwrap_err(),
        MalformedRecordError::InvalidId(0)
    ));

    let mut value = fixture_record();
    value["title"] = serde_json::json!("   ");
    assert!(matches!(
        decode(value).unwrap_err(),
        MalformedRecordError::EmptyTitle { id: 3 }
    ));
}

#[test]
fn wrong_value_shape_is_rejected() {
    let mut value = fixture_record();
    value["id"] = serde_json::json!("three");

    assert!(matches!(
        decode(value).unwrap_err(),
        MalformedRecordError::Decode(_)
    ));
}

#[test]
fn recurrence_pattern_is_ignored_when_not_recurring() {
    let mut value = fixture_record();
    value["is_recurring"] = serde_json::json!(false);

    let task = decode(value).unwrap();
    assert!(!task.is_recurring());
    assert_eq!(task.recurrence_pattern(), None);
}
