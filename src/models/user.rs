use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::Database;
use crate::error::StorageError;

/// Кто пишет боту: идентификатор и имена из транспорта.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    pub id: i64,
    pub first_name: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Создаёт или обновляет пользователя. Сохранённый телефон не трогаем.
    pub async fn upsert(db: &Database, user: &UserRef) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, username, first_name, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (user_id) DO UPDATE SET
                username = excluded.username,
                first_name = excluded.first_name
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(Utc::now())
        .execute(&db.pool)
        .await?;

        Ok(())
    }

    pub async fn update_phone(db: &Database, user: &UserRef, phone: &str) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, username, first_name, phone, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (user_id) DO UPDATE SET phone = excluded.phone
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(phone)
        .bind(Utc::now())
        .execute(&db.pool)
        .await?;

        log::debug!("📞 Phone updated for user {}", user.id);
        Ok(())
    }

    pub async fn find(db: &Database, user_id: i64) -> Result<Option<Self>, StorageError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT user_id, username, first_name, phone, created_at FROM users WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&db.pool)
        .await?;

        Ok(user)
    }
}
