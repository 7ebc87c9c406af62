use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::todos::dto::{TodoDetail, TodoListResponse, MAX_TITLE_LEN};
use crate::todos::repo::TodoStore;

pub async fn create(store: &dyn TodoStore, title: &str) -> Result<TodoListResponse, AppError> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::bad_request(
            "INVALID_TITLE",
            format!("title must be 1 to {MAX_TITLE_LEN} characters"),
        ));
    }
    let todo = store.insert(title).await?;
    info!(todo_id = %todo.id, title = %todo.title, "todo created");
    retrieve(store).await
}

pub async fn retrieve(store: &dyn TodoStore) -> Result<TodoListResponse, AppError> {
    let todos = store.list().await?;
    Ok(TodoListResponse {
        todos: todos.into_iter().map(TodoDetail::from).collect(),
    })
}

pub async fn delete(store: &dyn TodoStore, id: Uuid) -> Result<TodoListResponse, AppError> {
    if !store.delete(id).await? {
        warn!(todo_id = %id, "delete of unknown todo");
        return Err(AppError::not_found("todo"));
    }
    info!(todo_id = %id, "todo deleted");
    retrieve(store).await
}

/// Unknown ids are ignored; the caller still gets the current list.
pub async fn update(
    store: &dyn TodoStore,
    id: Uuid,
    done: bool,
) -> Result<TodoListResponse, AppError> {
    if store.set_done(id, done).await? {
        info!(todo_id = %id, done, "todo updated");
    }
    retrieve(store).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTodoStore;

    #[tokio::test]
    async fn create_then_retrieve_has_one_open_item() {
        let store = MemoryTodoStore::default();
        create(&store, "buy milk").await.unwrap();
        let list = retrieve(&store).await.unwrap();
        assert_eq!(list.todos.len(), 1);
        assert_eq!(list.todos[0].title, "buy milk");
        assert!(!list.todos[0].done);
    }

    #[tokio::test]
    async fn create_returns_full_list() {
        let store = MemoryTodoStore::default();
        create(&store, "one").await.unwrap();
        let list = create(&store, "two").await.unwrap();
        assert_eq!(list.todos.len(), 2);
    }

    #[tokio::test]
    async fn blank_title_is_rejected() {
        let store = MemoryTodoStore::default();
        let err = create(&store, "   ").await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest { code: "INVALID_TITLE", .. }));
        assert!(retrieve(&store).await.unwrap().todos.is_empty());
    }

    #[tokio::test]
    async fn delete_unknown_is_not_found_and_leaves_list_alone() {
        let store = MemoryTodoStore::default();
        create(&store, "keep me").await.unwrap();
        let err = delete(&store, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
        let list = retrieve(&store).await.unwrap();
        assert_eq!(list.todos.len(), 1);
        assert_eq!(list.todos[0].title, "keep me");
    }

    #[tokio::test]
    async fn delete_existing_removes_it() {
        let store = MemoryTodoStore::default();
        let id = create(&store, "gone").await.unwrap().todos[0].id;
        let list = delete(&store, id).await.unwrap();
        assert!(list.todos.is_empty());
    }

    #[tokio::test]
    async fn update_toggles_done() {
        let store = MemoryTodoStore::default();
        let id = create(&store, "task").await.unwrap().todos[0].id;
        let list = update(&store, id, true).await.unwrap();
        assert!(list.todos[0].done);
    }

    #[tokio::test]
    async fn update_unknown_is_a_no_op() {
        let store = MemoryTodoStore::default();
        create(&store, "task").await.unwrap();
        let list = update(&store, Uuid::new_v4(), true).await.unwrap();
        assert_eq!(list.todos.len(), 1);
        assert!(!list.todos[0].done);
    }
}
