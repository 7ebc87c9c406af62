use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::StoreError;
use crate::todos::repo_types::Todo;

#[async_trait]
pub trait TodoStore: Send + Sync {
    async fn insert(&self, title: &str) -> Result<Todo, StoreError>;
    /// All todos, oldest first.
    async fn list(&self) -> Result<Vec<Todo>, StoreError>;
    /// `false` when no todo had that id.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
    /// `false` when no todo had that id.
    async fn set_done(&self, id: Uuid, done: bool) -> Result<bool, StoreError>;
}

#[derive(Clone)]
pub struct PgTodoStore {
    db: PgPool,
}

impl PgTodoStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TodoStore for PgTodoStore {
    async fn insert(&self, title: &str) -> Result<Todo, StoreError> {
        let todo = sqlx::query_as::<_, Todo>(
            r#"
            INSERT INTO todos (id, title)
            VALUES ($1, $2)
            RETURNING id, title, done, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(title)
        .fetch_one(&self.db)
        .await?;
        Ok(todo)
    }

    async fn list(&self) -> Result<Vec<Todo>, StoreError> {
        let rows = sqlx::query_as::<_, Todo>(
            r#"
            SELECT id, title, done, created_at
            FROM todos
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM todos WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn set_done(&self, id: Uuid, done: bool) -> Result<bool, StoreError> {
        let res = sqlx::query("UPDATE todos SET done = $2 WHERE id = $1")
            .bind(id)
            .bind(done)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
