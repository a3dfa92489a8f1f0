//! Users repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::user::{CreateUser, Role, User},
};

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, login, firstname, lastname, email, role, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// List all users
    pub async fn list(&self) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, login, firstname, lastname, email, role, created_at FROM users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Create a new user
    pub async fn create(&self, user: &CreateUser) -> AppResult<User> {
        let role = user.role.unwrap_or(Role::Member);

        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (login, firstname, lastname, email, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, login, firstname, lastname, email, role, created_at
            "#,
        )
        .bind(&user.login)
        .bind(&user.firstname)
        .bind(&user.lastname)
        .bind(&user.email)
        .bind(role)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }
}
