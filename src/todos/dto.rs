use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::todos::repo_types::Todo;

pub const MAX_TITLE_LEN: usize = 100;

#[derive(Debug, Deserialize)]
pub struct CreateTodoRequest {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTodoRequest {
    pub id: Uuid,
    pub done: bool,
}

#[derive(Debug, Serialize)]
pub struct TodoDetail {
    pub id: Uuid,
    pub title: String,
    pub done: bool,
}

impl From<Todo> for TodoDetail {
    fn from(t: Todo) -> Self {
        Self {
            id: t.id,
            title: t.title,
            done: t.done,
        }
    }
}

/// Every todo operation answers with the whole collection.
#[derive(Debug, Serialize)]
pub struct TodoListResponse {
    pub todos: Vec<TodoDetail>,
}
