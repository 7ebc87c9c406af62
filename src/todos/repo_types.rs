use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// To-do record. There is no owner column; every authenticated user sees the same list.
#[derive(Debug, Clone, FromRow)]
pub struct Todo {
    pub id: Uuid,
    pub title: String,
    pub done: bool,
    pub created_at: OffsetDateTime,
}
