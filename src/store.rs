use crate::{utils, Storage, Table, WatcherError};
use sqlx::{sqlite::SqliteConnectOptions, Row, SqlitePool};
use tokio::sync::Mutex;

pub const SEEN_TABLE: &str = "seen_jobs";

/// Evidence that a posting has already been reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenRecord {
    pub fingerprint: String,
    pub url: String,
    pub title: String,
    pub company: String,
}

pub struct SeenTable {
    name: String,
    pool: SqlitePool,
}

#[async_trait::async_trait]
impl Table for SeenTable {
    type Record<'a> = &'a SeenRecord;

    fn get_name(&self) -> &str {
        self.name.as_str()
    }

    fn get_key(&self) -> &str {
        "fingerprint"
    }

    fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn create(&self) -> Result<(), sqlx::Error> {
        let query = format!(
            r#"
                CREATE TABLE {} (
                    fingerprint TEXT PRIMARY KEY,
                    url TEXT NOT NULL,
                    title TEXT NOT NULL,
                    company TEXT NOT NULL,
                    created_at DATETIME
                )
            "#,
            &self.name
        );
        sqlx::query(query.as_str()).execute(self.get_pool()).await?;
        Ok(())
    }

    // A fingerprint raced in by a concurrent run is ignored.
    async fn insert<'a>(&self, record: Self::Record<'a>) -> Result<(), sqlx::Error> {
        let query = format!(
            "INSERT OR IGNORE INTO {} (fingerprint, url, title, company, created_at) VALUES (?, ?, ?, ?, ?)",
            &self.name
        );
        sqlx::query(&query)
            .bind(record.fingerprint.as_str())
            .bind(record.url.as_str())
            .bind(record.title.as_str())
            .bind(record.company.as_str())
            .bind(utils::get_now())
            .execute(self.get_pool())
            .await?;
        Ok(())
    }
}

/// The `seen_jobs` set kept in a sqlite file.
pub struct SqliteStorage {
    pub seen: SeenTable,
    pool: SqlitePool,
}

impl SqliteStorage {
    pub async fn new(filename: &str) -> Result<SqliteStorage, WatcherError> {
        let opt = SqliteConnectOptions::new()
            .filename(filename)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(opt).await?;
        let s = SqliteStorage {
            seen: SeenTable {
                name: SEEN_TABLE.to_string(),
                pool: pool.clone(),
            },
            pool,
        };

        if !utils::is_table_exists(&s.pool, s.seen.get_name()).await? {
            tracing::debug!("Create table {}", s.seen.get_name());
            s.seen.create().await?;
        } else {
            tracing::debug!("Use table {}", s.seen.get_name());
        }

        Ok(s)
    }
}

#[async_trait::async_trait]
impl Storage for SqliteStorage {
    async fn seen_is_exists<I: AsRef<str> + Send>(
        &self,
        fingerprint: I,
    ) -> Result<bool, WatcherError> {
        Ok(self.seen.is_exist(fingerprint.as_ref()).await?)
    }

    async fn seen_insert(&self, record: &SeenRecord) -> Result<(), WatcherError> {
        Ok(self.seen.insert(record).await?)
    }

    async fn seen_count(&self) -> Result<u32, WatcherError> {
        Ok(self.seen.count().await?)
    }

    async fn seen_get(&self) -> Result<Vec<SeenRecord>, WatcherError> {
        let mut records = vec![];
        let query = format!(
            "SELECT fingerprint, url, title, company FROM {} ORDER BY created_at, rowid",
            self.seen.get_name()
        );
        for row in sqlx::query(&query).fetch_all(&self.pool).await? {
            records.push(SeenRecord {
                fingerprint: row.try_get("fingerprint")?,
                url: row.try_get("url")?,
                title: row.try_get("title")?,
                company: row.try_get("company")?,
            });
        }
        Ok(records)
    }
}

/// Process-local seen set, for ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    records: Mutex<Vec<SeenRecord>>,
}

#[async_trait::async_trait]
impl Storage for MemoryStorage {
    async fn seen_is_exists<I: AsRef<str> + Send>(
        &self,
        fingerprint: I,
    ) -> Result<bool, WatcherError> {
        let fingerprint = fingerprint.as_ref();
        Ok(self
            .records
            .lock()
            .await
            .iter()
            .any(|r| r.fingerprint == fingerprint))
    }

    async fn seen_insert(&self, record: &SeenRecord) -> Result<(), WatcherError> {
        let mut records = self.records.lock().await;
        if !records.iter().any(|r| r.fingerprint == record.fingerprint) {
            records.push(record.clone());
        }
        Ok(())
    }

    async fn seen_count(&self) -> Result<u32, WatcherError> {
        Ok(self.records.lock().await.len() as u32)
    }

    async fn seen_get(&self) -> Result<Vec<SeenRecord>, WatcherError> {
        Ok(self.records.lock().await.clone())
    }
}
