use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

const SELECT_USER: &str = r#"
SELECT id, name, email, password_hash, created_at, updated_at
FROM users
"#;

fn store_err(e: sqlx::Error) -> UserRepoError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => UserRepoError::DuplicateEmail,
        _ => UserRepoError::Store(e.to_string()),
    }
}

pub struct MySqlUserRepo {
    pool: MySqlPool,
}

impl MySqlUserRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlUserRepo { pool }
    }

    fn row_to_record(row: MySqlRow) -> Result<UserRecord, UserRepoError> {
        let id: i64 = row.try_get("id").map_err(store_err)?;
        let name: String = row.try_get("name").map_err(store_err)?;
        let email: String = row.try_get("email").map_err(store_err)?;
        let password_hash: String = row.try_get("password_hash").map_err(store_err)?;
        let created_at: DateTime<Utc> = row.try_get("created_at").map_err(store_err)?;
        let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(store_err)?;

        Ok(UserRecord {
            id: UserId(id),
            name,
            email,
            password_hash,
            created_at,
            updated_at,
        })
    }
}

#[async_trait::async_trait]
impl UserRepo for MySqlUserRepo {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, UserRepoError> {
        sqlx::query(&format!("{SELECT_USER} WHERE email = ?"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?
            .map(Self::row_to_record)
            .transpose()
    }

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, UserRepoError> {
        sqlx::query(&format!("{SELECT_USER} WHERE id = ?"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?
            .map(Self::row_to_record)
            .transpose()
    }

    async fn exists(&self, email: &str) -> Result<bool, UserRepoError> {
        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM users WHERE email = ?"#)
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;

        Ok(count > 0)
    }

    async fn create(&self, user: NewUser) -> Result<UserRecord, UserRepoError> {
        let result = sqlx::query(
            r#"
INSERT INTO users (name, email, password_hash)
VALUES (?, ?, ?)
"#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        let id = i64::try_from(result.last_insert_id())
            .map_err(|e| UserRepoError::Store(format!("insert id out of range: {e}")))?;
        self.find_by_id(UserId(id))
            .await?
            .ok_or_else(|| UserRepoError::Store(format!("user {id} vanished after insert")))
    }

    async fn list(&self) -> Result<Vec<UserRecord>, UserRepoError> {
        sqlx::query(&format!("{SELECT_USER} ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?
            .into_iter()
            .map(Self::row_to_record)
            .collect()
    }

    async fn update(
        &self,
        user_id: UserId,
        changes: UserChanges,
    ) -> Result<Option<UserRecord>, UserRepoError> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        let locked = sqlx::query(&format!("{SELECT_USER} WHERE id = ? FOR UPDATE"))
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(store_err)?;
        if locked.is_none() {
            tx.rollback().await.map_err(store_err)?;
            return Ok(None);
        }

        sqlx::query(
            r#"
UPDATE users
SET name = COALESCE(?, name),
    email = COALESCE(?, email),
    updated_at = CURRENT_TIMESTAMP(3)
WHERE id = ?
"#,
        )
        .bind(changes.name)
        .bind(changes.email)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(store_err)?;

        let row = sqlx::query(&format!("{SELECT_USER} WHERE id = ?"))
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(store_err)?;
        let updated = Self::row_to_record(row)?;

        tx.commit().await.map_err(store_err)?;
        Ok(Some(updated))
    }

    async fn delete(&self, user_id: UserId) -> Result<Option<UserRecord>, UserRepoError> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        let Some(row) = sqlx::query(&format!("{SELECT_USER} WHERE id = ? FOR UPDATE"))
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(store_err)?
        else {
            tx.rollback().await.map_err(store_err)?;
            return Ok(None);
        };
        let removed = Self::row_to_record(row)?;

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;

        tx.commit().await.map_err(store_err)?;
        Ok(Some(removed))
    }
}
