use sqlx::error::ErrorKind;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::database::models::Drink;

/// Errors from the persistence adapter. Constraint violations are kept apart
/// from connection/query failures so the routing layer can map them to
/// different status codes.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("row not found")]
    NotFound,

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

fn map_sqlx(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db) => match db.kind() {
            ErrorKind::UniqueViolation
            | ErrorKind::NotNullViolation
            | ErrorKind::CheckViolation => StoreError::Constraint(db.to_string()),
            _ => StoreError::Sqlx(sqlx::Error::Database(db)),
        },
        other => StoreError::Sqlx(other),
    }
}

/// Connection pool plus the single-row operations the handlers need.
#[derive(Clone)]
pub struct DrinkStore {
    pool: SqlitePool,
}

impl DrinkStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);

        // An in-memory database lives inside its connection; keep exactly one
        // and never reap it, or every checkout would see an empty schema.
        let in_memory = config.url.contains(":memory:");
        let max_connections = if in_memory { 1 } else { config.max_connections };

        let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections);
        if in_memory {
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }

        let pool = pool_options.connect_with(options).await?;
        info!("connected to database at {}", config.url);
        Ok(Self { pool })
    }

    /// Idempotent schema bootstrap, invoked explicitly at startup.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS drinks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL UNIQUE,
                recipe TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Drop and recreate the schema. Destructive; only for tests and demo
    /// seeding, never called on the request-serving path.
    pub async fn reset(&self) -> Result<(), StoreError> {
        sqlx::query("DROP TABLE IF EXISTS drinks")
            .execute(&self.pool)
            .await?;
        self.migrate().await
    }

    pub async fn list(&self) -> Result<Vec<Drink>, StoreError> {
        sqlx::query_as::<_, Drink>("SELECT id, title, recipe FROM drinks ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)
    }

    pub async fn find(&self, id: i64) -> Result<Drink, StoreError> {
        sqlx::query_as::<_, Drink>("SELECT id, title, recipe FROM drinks WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?
            .ok_or(StoreError::NotFound)
    }

    /// Insert a new row and return it with its assigned id. A missing title
    /// or a duplicate one surfaces as `Constraint`.
    pub async fn insert(&self, title: Option<&str>, recipe: &str) -> Result<Drink, StoreError> {
        sqlx::query_as::<_, Drink>(
            "INSERT INTO drinks (title, recipe) VALUES (?1, ?2) RETURNING id, title, recipe",
        )
        .bind(title)
        .bind(recipe)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    /// Persist in-place changes to an existing row.
    pub async fn update(&self, drink: &Drink) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE drinks SET title = ?1, recipe = ?2 WHERE id = ?3")
            .bind(&drink.title)
            .bind(&drink.recipe)
            .bind(drink.id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM drinks WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;

    async fn memory_store() -> DrinkStore {
        let store = DrinkStore::connect(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 5,
        })
        .await
        .unwrap();
        store.migrate().await.unwrap();
        store
    }

    #[tokio::test]
    async fn insert_assigns_id_and_round_trips() {
        let store = memory_store().await;
        let drink = store
            .insert(Some("Water"), r#"[{"name":"Water","color":"blue","parts":1}]"#)
            .await
            .unwrap();
        assert_eq!(drink.id, 1);
        assert_eq!(drink.title, "Water");

        let found = store.find(drink.id).await.unwrap();
        assert_eq!(found.recipe, drink.recipe);

        let all = store.list().await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_title_is_a_constraint_violation() {
        let store = memory_store().await;
        store.insert(Some("Matcha"), "[]").await.unwrap();

        let err = store.insert(Some("Matcha"), "[]").await.unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)), "got {:?}", err);

        // The failed insert must not have created a row
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_title_is_a_constraint_violation() {
        let store = memory_store().await;
        let err = store.insert(None, "null").await.unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn update_rewrites_row_in_place() {
        let store = memory_store().await;
        let mut drink = store.insert(Some("Latte"), "[]").await.unwrap();

        drink.title = "Flat White".to_string();
        store.update(&drink).await.unwrap();

        let found = store.find(drink.id).await.unwrap();
        assert_eq!(found.title, "Flat White");
    }

    #[tokio::test]
    async fn update_and_delete_on_missing_row_report_not_found() {
        let store = memory_store().await;
        let ghost = Drink {
            id: 99,
            title: "Ghost".to_string(),
            recipe: "[]".to_string(),
        };
        assert!(matches!(store.update(&ghost).await, Err(StoreError::NotFound)));
        assert!(matches!(store.delete(99).await, Err(StoreError::NotFound)));
        assert!(matches!(store.find(99).await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn delete_removes_row_from_listing() {
        let store = memory_store().await;
        let drink = store.insert(Some("Espresso"), "[]").await.unwrap();
        store.delete(drink.id).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reset_recreates_an_empty_schema() {
        let store = memory_store().await;
        store.insert(Some("Mocha"), "[]").await.unwrap();
        store.reset().await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }
}
