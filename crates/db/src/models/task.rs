use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    entities::task,
    filter::{SortDirective, TaskFilter},
    types::TaskStatus,
};

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Task not found")]
    TaskNotFound,
    #[error(transparent)]
    Database(#[from] DbErr),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub created_date: DateTime<Utc>,
    pub entity_name: String,
    pub task_type: String,
    pub task_time: DateTime<Utc>,
    pub contact_person: String,
    pub note: Option<String>,
    pub status: TaskStatus,
}

impl From<task::Model> for Task {
    fn from(model: task::Model) -> Self {
        Self {
            id: model.id,
            created_date: model.created_date,
            entity_name: model.entity_name,
            task_type: model.task_type,
            task_time: model.task_time,
            contact_person: model.contact_person,
            note: model.note,
            status: model.status,
        }
    }
}

/// Validated create data. Status is not part of it: new tasks always start
/// open, whatever the client sent.
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub entity_name: String,
    pub task_type: String,
    pub task_time: DateTime<Utc>,
    pub contact_person: String,
    pub note: Option<String>,
}

/// Validated partial update. `None` leaves a field untouched; for `note`,
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub entity_name: Option<String>,
    pub task_type: Option<String>,
    pub task_time: Option<DateTime<Utc>>,
    pub contact_person: Option<String>,
    pub note: Option<Option<String>>,
    pub status: Option<TaskStatus>,
}

impl Task {
    pub async fn create<C: ConnectionTrait>(db: &C, data: &CreateTask) -> Result<Self, DbErr> {
        let active = task::ActiveModel {
            created_date: Set(Utc::now()),
            entity_name: Set(data.entity_name.clone()),
            task_type: Set(data.task_type.clone()),
            task_time: Set(data.task_time),
            contact_person: Set(data.contact_person.clone()),
            note: Set(data.note.clone()),
            status: Set(TaskStatus::Open),
            ..Default::default()
        };

        let model = active.insert(db).await?;
        Ok(model.into())
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Self>, DbErr> {
        let record = task::Entity::find_by_id(id).one(db).await?;
        Ok(record.map(Self::from))
    }

    /// Applies the filter conjunction, then orders by the resolved sort key.
    /// `SortKey::Unsorted` leaves the store's iteration order as is.
    pub async fn list<C: ConnectionTrait>(
        db: &C,
        filter: &TaskFilter,
        sort: &SortDirective,
    ) -> Result<Vec<Self>, DbErr> {
        let mut query = task::Entity::find().filter(filter.condition());
        if let Some(column) = sort.key.column() {
            query = query.order_by(column, sort.order.clone());
        }

        let models = query.all(db).await?;
        Ok(models.into_iter().map(Self::from).collect())
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: i64,
        data: &UpdateTask,
    ) -> Result<Self, TaskError> {
        let record = task::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(TaskError::TaskNotFound)?;

        let mut active: task::ActiveModel = record.clone().into();
        if let Some(entity_name) = &data.entity_name {
            active.entity_name = Set(entity_name.clone());
        }
        if let Some(task_type) = &data.task_type {
            active.task_type = Set(task_type.clone());
        }
        if let Some(task_time) = data.task_time {
            active.task_time = Set(task_time);
        }
        if let Some(contact_person) = &data.contact_person {
            active.contact_person = Set(contact_person.clone());
        }
        if let Some(note) = &data.note {
            active.note = Set(note.clone());
        }
        if let Some(status) = &data.status {
            active.status = Set(status.clone());
        }

        if !active.is_changed() {
            return Ok(record.into());
        }

        let updated = active.update(db).await?;
        Ok(updated.into())
    }

    pub async fn update_status<C: ConnectionTrait>(
        db: &C,
        id: i64,
        status: TaskStatus,
    ) -> Result<Self, TaskError> {
        let record = task::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(TaskError::TaskNotFound)?;

        let mut active: task::ActiveModel = record.into();
        active.status = Set(status);
        let updated = active.update(db).await?;
        Ok(updated.into())
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: i64) -> Result<u64, DbErr> {
        let result = task::Entity::delete_by_id(id).exec(db).await?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use chrono::TimeZone;
    use sea_orm::Order;

    use super::*;
    use crate::{DBService, filter::SortKey, types::parse_timestamp};

    async fn setup_db() -> DBService {
        static NEXT: AtomicU32 = AtomicU32::new(0);
        let dir = std::env::temp_dir().join(format!(
            "tasks-db-test-{}-{}",
            std::process::id(),
            NEXT.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let url = format!("sqlite://{}/db.sqlite?mode=rwc", dir.to_string_lossy());
        DBService::new(&url).await.unwrap()
    }

    fn sample(entity_name: &str, contact_person: &str, task_time: &str) -> CreateTask {
        CreateTask {
            entity_name: entity_name.to_string(),
            task_type: "call".to_string(),
            task_time: parse_timestamp(task_time).unwrap(),
            contact_person: contact_person.to_string(),
            note: None,
        }
    }

    #[tokio::test]
    async fn create_assigns_id_and_forces_open_status() {
        let db = setup_db().await;
        let before = Utc::now();
        let task = Task::create(&db.conn, &sample("Acme", "John Smith", "2024-03-01T10:00:00Z"))
            .await
            .unwrap();

        assert!(task.id > 0);
        assert_eq!(task.status, TaskStatus::Open);
        assert!(task.created_date >= before);
        assert_eq!(
            task.task_time,
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn find_by_id_roundtrips_and_misses_cleanly() {
        let db = setup_db().await;
        let created = Task::create(&db.conn, &sample("Acme", "John", "2024-03-01T10:00:00Z"))
            .await
            .unwrap();

        let found = Task::find_by_id(&db.conn, created.id).await.unwrap().unwrap();
        assert_eq!(found.entity_name, "Acme");
        assert_eq!(found.id, created.id);

        assert!(Task::find_by_id(&db.conn, 9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_filters_are_conjunctive() {
        let db = setup_db().await;
        Task::create(&db.conn, &sample("Acme Corp", "John Smith", "2024-03-01T10:00:00Z"))
            .await
            .unwrap();
        Task::create(&db.conn, &sample("Acme Corp", "Jane Doe", "2024-03-02T10:00:00Z"))
            .await
            .unwrap();
        Task::create(&db.conn, &sample("Globex", "John Smith", "2024-03-03T10:00:00Z"))
            .await
            .unwrap();

        let filter = TaskFilter {
            entity_name: Some("acme".to_string()),
            contact_person: Some("john".to_string()),
            ..Default::default()
        };
        let tasks = Task::list(&db.conn, &filter, &SortDirective::default())
            .await
            .unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].entity_name, "Acme Corp");
        assert_eq!(tasks[0].contact_person, "John Smith");
    }

    #[tokio::test]
    async fn substring_filters_are_case_insensitive() {
        let db = setup_db().await;
        Task::create(&db.conn, &sample("Acme", "John Smith", "2024-03-01T10:00:00Z"))
            .await
            .unwrap();
        Task::create(&db.conn, &sample("Acme", "johnny", "2024-03-02T10:00:00Z"))
            .await
            .unwrap();
        Task::create(&db.conn, &sample("Acme", "Alice", "2024-03-03T10:00:00Z"))
            .await
            .unwrap();

        let filter = TaskFilter {
            contact_person: Some("John".to_string()),
            ..Default::default()
        };
        let tasks = Task::list(&db.conn, &filter, &SortDirective::default())
            .await
            .unwrap();
        let contacts: Vec<_> = tasks.iter().map(|t| t.contact_person.as_str()).collect();
        assert_eq!(tasks.len(), 2);
        assert!(contacts.contains(&"John Smith"));
        assert!(contacts.contains(&"johnny"));
    }

    #[tokio::test]
    async fn unknown_status_filter_matches_nothing() {
        let db = setup_db().await;
        Task::create(&db.conn, &sample("Acme", "John", "2024-03-01T10:00:00Z"))
            .await
            .unwrap();

        let filter = TaskFilter {
            status: Some("archived".to_string()),
            ..Default::default()
        };
        let tasks = Task::list(&db.conn, &filter, &SortDirective::default())
            .await
            .unwrap();
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn date_bounds_are_inclusive() {
        let db = setup_db().await;
        for day in ["2024-03-01", "2024-03-02", "2024-03-03", "2024-03-04"] {
            Task::create(&db.conn, &sample("Acme", "John", &format!("{day}T12:00:00Z")))
                .await
                .unwrap();
        }

        let filter = TaskFilter {
            start_date: Some(parse_timestamp("2024-03-02T12:00:00Z").unwrap()),
            end_date: Some(parse_timestamp("2024-03-03T12:00:00Z").unwrap()),
            ..Default::default()
        };
        let tasks = Task::list(&db.conn, &filter, &SortDirective::default())
            .await
            .unwrap();
        assert_eq!(tasks.len(), 2);
    }

    #[tokio::test]
    async fn sorts_by_resolved_key_in_both_directions() {
        let db = setup_db().await;
        Task::create(&db.conn, &sample("Beta", "John", "2024-03-02T10:00:00Z"))
            .await
            .unwrap();
        Task::create(&db.conn, &sample("Alpha", "John", "2024-03-03T10:00:00Z"))
            .await
            .unwrap();
        Task::create(&db.conn, &sample("Gamma", "John", "2024-03-01T10:00:00Z"))
            .await
            .unwrap();

        let asc = SortDirective {
            key: SortKey::EntityName,
            order: Order::Asc,
        };
        let tasks = Task::list(&db.conn, &TaskFilter::default(), &asc).await.unwrap();
        let names: Vec<_> = tasks.iter().map(|t| t.entity_name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Beta", "Gamma"]);

        let desc = SortDirective {
            key: SortKey::TaskTime,
            order: Order::Desc,
        };
        let tasks = Task::list(&db.conn, &TaskFilter::default(), &desc).await.unwrap();
        let names: Vec<_> = tasks.iter().map(|t| t.entity_name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Beta", "Gamma"]);
    }

    #[tokio::test]
    async fn update_touches_only_present_fields() {
        let db = setup_db().await;
        let created = Task::create(
            &db.conn,
            &CreateTask {
                note: Some("initial".to_string()),
                ..sample("Acme", "John", "2024-03-01T10:00:00Z")
            },
        )
        .await
        .unwrap();

        let updated = Task::update(
            &db.conn,
            created.id,
            &UpdateTask {
                entity_name: Some("Acme Intl".to_string()),
                status: Some(TaskStatus::Closed),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.entity_name, "Acme Intl");
        assert_eq!(updated.status, TaskStatus::Closed);
        assert_eq!(updated.task_type, created.task_type);
        assert_eq!(updated.contact_person, created.contact_person);
        assert_eq!(updated.note.as_deref(), Some("initial"));
        assert_eq!(updated.created_date, created.created_date);
        assert_eq!(updated.id, created.id);
    }

    #[tokio::test]
    async fn update_can_clear_note_and_tolerates_empty_patch() {
        let db = setup_db().await;
        let created = Task::create(
            &db.conn,
            &CreateTask {
                note: Some("call back".to_string()),
                ..sample("Acme", "John", "2024-03-01T10:00:00Z")
            },
        )
        .await
        .unwrap();

        let cleared = Task::update(
            &db.conn,
            created.id,
            &UpdateTask {
                note: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(cleared.note.is_none());

        let untouched = Task::update(&db.conn, created.id, &UpdateTask::default())
            .await
            .unwrap();
        assert_eq!(untouched.entity_name, "Acme");
        assert!(untouched.note.is_none());
    }

    #[tokio::test]
    async fn update_missing_id_is_not_found() {
        let db = setup_db().await;
        let err = Task::update(&db.conn, 42, &UpdateTask::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::TaskNotFound));
    }

    #[tokio::test]
    async fn status_patch_roundtrips() {
        let db = setup_db().await;
        let created = Task::create(&db.conn, &sample("Acme", "John", "2024-03-01T10:00:00Z"))
            .await
            .unwrap();

        let closed = Task::update_status(&db.conn, created.id, TaskStatus::Closed)
            .await
            .unwrap();
        assert_eq!(closed.status, TaskStatus::Closed);

        let reopened = Task::update_status(&db.conn, created.id, TaskStatus::Open)
            .await
            .unwrap();
        assert_eq!(reopened.status, TaskStatus::Open);
        assert_eq!(reopened.entity_name, "Acme");
    }

    #[tokio::test]
    async fn delete_reports_affected_rows() {
        let db = setup_db().await;
        let created = Task::create(&db.conn, &sample("Acme", "John", "2024-03-01T10:00:00Z"))
            .await
            .unwrap();

        assert_eq!(Task::delete(&db.conn, created.id).await.unwrap(), 1);
        assert!(Task::find_by_id(&db.conn, created.id).await.unwrap().is_none());
        assert_eq!(Task::delete(&db.conn, created.id).await.unwrap(), 0);
    }
}
