use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, Role, User};
use crate::db::StoreError;

/// Account persistence. Email uniqueness is the store's responsibility.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    /// Fails with [`StoreError::Conflict`] when the email is taken.
    async fn create(&self, new: NewUser) -> Result<User, StoreError>;
    async fn update_role(&self, id: Uuid, role: Role) -> Result<Option<User>, StoreError>;
    async fn update_profile_image(
        &self,
        id: Uuid,
        profile_image: Option<String>,
    ) -> Result<Option<User>, StoreError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, user_name, join_date, role, profile_image
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, user_name, join_date, role, profile_image
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, password_hash, user_name, role, profile_image)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, email, password_hash, user_name, join_date, role, profile_image
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(&new.user_name)
        .bind(new.role.as_str())
        .bind(&new.profile_image)
        .fetch_one(&self.db)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn update_role(&self, id: Uuid, role: Role) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET role = $2
            WHERE id = $1
            RETURNING id, email, password_hash, user_name, join_date, role, profile_image
            "#,
        )
        .bind(id)
        .bind(role.as_str())
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn update_profile_image(
        &self,
        id: Uuid,
        profile_image: Option<String>,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET profile_image = $2
            WHERE id = $1
            RETURNING id, email, password_hash, user_name, join_date, role, profile_image
            "#,
        )
        .bind(id)
        .bind(profile_image)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }
}
