use std::str::FromStr;

use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, patch},
};
use db::{
    DBService,
    filter::{SortDirective, TaskFilter},
    models::task::{CreateTask, Task, UpdateTask},
    types::{TaskStatus, parse_timestamp},
};
use serde::{Deserialize, Deserializer};

use crate::{error::ApiError, middleware::load_task_middleware};

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub entity_name: Option<String>,
    pub task_type: Option<String>,
    pub task_time: Option<String>,
    pub contact_person: Option<String>,
    pub note: Option<String>,
}

impl CreateTaskRequest {
    // Field-check order is part of the contract: the first missing field is
    // the one named in the error.
    fn validate(self) -> Result<CreateTask, ApiError> {
        let entity_name = require(self.entity_name, "entity_name")?;
        let task_type = require(self.task_type, "task_type")?;
        let task_time = require(self.task_time, "task_time")?;
        let contact_person = require(self.contact_person, "contact_person")?;

        let task_time = parse_timestamp(&task_time).map_err(|_| {
            ApiError::Validation("Invalid task_time format. Use ISO format.".to_string())
        })?;

        Ok(CreateTask {
            entity_name,
            task_type,
            task_time,
            contact_person,
            note: self.note,
        })
    }
}

fn require<T>(value: Option<T>, field: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::Validation(format!("Missing required field: {field}")))
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTaskRequest {
    pub entity_name: Option<String>,
    pub task_type: Option<String>,
    pub task_time: Option<String>,
    pub contact_person: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub note: Option<Option<String>>,
    pub status: Option<String>,
}

// Distinguishes an absent `note` (leave untouched) from an explicit null
// (clear it).
fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl UpdateTaskRequest {
    fn validate(self) -> Result<UpdateTask, ApiError> {
        let task_time = self
            .task_time
            .as_deref()
            .map(parse_timestamp)
            .transpose()
            .map_err(|_| ApiError::Validation("Invalid task_time format".to_string()))?;
        let status = self.status.as_deref().map(parse_status).transpose()?;

        Ok(UpdateTask {
            entity_name: self.entity_name,
            task_type: self.task_type,
            task_time,
            contact_person: self.contact_person,
            note: self.note,
            status,
        })
    }
}

fn parse_status(value: &str) -> Result<TaskStatus, ApiError> {
    TaskStatus::from_str(value).map_err(|_| {
        ApiError::Validation("Status must be either \"open\" or \"closed\"".to_string())
    })
}

#[derive(Debug, Deserialize)]
pub struct StatusPatchRequest {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
    pub entity_name: Option<String>,
    pub task_type: Option<String>,
    pub status: Option<String>,
    pub contact_person: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl TaskListQuery {
    // Date params are the only query inputs that can fail; everything else
    // just narrows (or empties) the result set.
    fn validate(self) -> Result<(TaskFilter, SortDirective), ApiError> {
        let start_date = self
            .start_date
            .as_deref()
            .map(parse_timestamp)
            .transpose()
            .map_err(|_| ApiError::Validation("Invalid start_date format".to_string()))?;
        let end_date = self
            .end_date
            .as_deref()
            .map(parse_timestamp)
            .transpose()
            .map_err(|_| ApiError::Validation("Invalid end_date format".to_string()))?;

        let sort = SortDirective::from_params(self.sort_by.as_deref(), self.sort_order.as_deref());
        let filter = TaskFilter {
            entity_name: self.entity_name,
            task_type: self.task_type,
            status: self.status,
            contact_person: self.contact_person,
            start_date,
            end_date,
        };

        Ok((filter, sort))
    }
}

pub async fn get_tasks(
    State(db): State<DBService>,
    Query(query): Query<TaskListQuery>,
) -> Result<ResponseJson<Vec<Task>>, ApiError> {
    let (filter, sort) = query.validate()?;
    let tasks = Task::list(&db.conn, &filter, &sort).await?;
    Ok(ResponseJson(tasks))
}

pub async fn create_task(
    State(db): State<DBService>,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<(StatusCode, ResponseJson<Task>), ApiError> {
    let data = payload.validate()?;

    tracing::debug!(
        "Creating '{}' task for {}",
        data.task_type,
        data.entity_name
    );

    let task = Task::create(&db.conn, &data).await?;
    Ok((StatusCode::CREATED, ResponseJson(task)))
}

pub async fn get_task(Extension(task): Extension<Task>) -> ResponseJson<Task> {
    ResponseJson(task)
}

pub async fn update_task(
    Extension(existing): Extension<Task>,
    State(db): State<DBService>,
    Json(payload): Json<UpdateTaskRequest>,
) -> Result<ResponseJson<Task>, ApiError> {
    let data = payload.validate()?;
    let task = Task::update(&db.conn, existing.id, &data).await?;
    Ok(ResponseJson(task))
}

pub async fn update_task_status(
    Extension(existing): Extension<Task>,
    State(db): State<DBService>,
    Json(payload): Json<StatusPatchRequest>,
) -> Result<ResponseJson<Task>, ApiError> {
    let status = payload
        .status
        .ok_or_else(|| ApiError::Validation("Status is required".to_string()))?;
    let status = parse_status(&status)?;

    let task = Task::update_status(&db.conn, existing.id, status).await?;
    Ok(ResponseJson(task))
}

pub async fn delete_task(
    Extension(task): Extension<Task>,
    State(db): State<DBService>,
) -> Result<StatusCode, ApiError> {
    Task::delete(&db.conn, task.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router(db: &DBService) -> Router<DBService> {
    let task_id_router = Router::new()
        .route("/", get(get_task).put(update_task).delete(delete_task))
        .route("/status", patch(update_task_status))
        .layer(from_fn_with_state(db.clone(), load_task_middleware));

    let inner = Router::new()
        .route("/", get(get_tasks).post(create_task))
        .nest("/{task_id}", task_id_router);

    Router::new().nest("/tasks", inner)
}
