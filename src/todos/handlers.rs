use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get},
    Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    error::AppError,
    extract::{AppJson, AppPath},
    state::AppState,
    todos::{
        dto::{CreateTodoRequest, TodoListResponse, UpdateTodoRequest},
        services,
    },
};

pub fn todo_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/todos",
            get(retrieve_todos)
                .post(create_todo)
                .put(update_todo)
                .patch(update_todo),
        )
        .route("/todos/:id", delete(delete_todo))
}

#[instrument(skip(state))]
pub async fn retrieve_todos(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<AppJson<TodoListResponse>, AppError> {
    Ok(AppJson(services::retrieve(state.todos.as_ref()).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_todo(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    AppJson(payload): AppJson<CreateTodoRequest>,
) -> Result<(StatusCode, AppJson<TodoListResponse>), AppError> {
    let list = services::create(state.todos.as_ref(), &payload.title).await?;
    Ok((StatusCode::CREATED, AppJson(list)))
}

#[instrument(skip(state, payload))]
pub async fn update_todo(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    AppJson(payload): AppJson<UpdateTodoRequest>,
) -> Result<AppJson<TodoListResponse>, AppError> {
    let list = services::update(state.todos.as_ref(), payload.id, payload.done).await?;
    Ok(AppJson(list))
}

#[instrument(skip(state))]
pub async fn delete_todo(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<AppJson<TodoListResponse>, AppError> {
    Ok(AppJson(services::delete(state.todos.as_ref(), id).await?))
}
