//! SQLite-backed medicine store with a live query.
//!
//! Every write that changes at least one row bumps a version counter held in
//! a `tokio::sync::watch` channel. Each [`LiveQuery`] waits on that counter and
//! re-reads the whole table when it moves, so a subscriber always sees a full
//! snapshot consistent with the store at the time of the re-read. Several
//! writes landing before a subscriber gets to re-read collapse into a single
//! emission.

use log::{debug, error, info, warn};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::Row;
use std::future::Future;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::constants::{EXPECTED_DB_VERSION, VERSION_KEY};
use crate::converters::{decode_optional_schedules, encode_schedules};
use crate::medicine::{sort_for_display, Medicine};
use crate::queries::{ddl, medicines, metadata};

pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Handle to the medicine store. Cheap to clone; all clones share the pool and
/// the change notifications.
#[derive(Clone)]
pub struct MedicineDb {
    pool: SqlitePool,
    changes: Arc<watch::Sender<u64>>,
}

impl MedicineDb {
    /// Open (creating if needed) a database file and bring its schema up to date.
    /// Enables WAL mode.
    pub async fn open(db_path: impl AsRef<Path>) -> Result<Self, DynError> {
        let db_path = db_path.as_ref();
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        info!("SQLite database: {}", db_path.display());
        Self::from_pool(pool).await
    }

    /// Open a private in-memory database (for tests).
    /// Uses a single connection that is never recycled, otherwise the data would vanish.
    pub async fn open_in_memory() -> Result<Self, DynError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, initialising the schema first
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, DynError> {
        init_database_schema(&pool).await?;
        let (changes, _) = watch::channel(0u64);
        Ok(Self {
            pool,
            changes: Arc::new(changes),
        })
    }

    /// Get a reference to the underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert a record, or overwrite every column of the row with the same id.
    /// A record without an id gets the next free one. Returns the row id.
    pub async fn insert(&self, medicine: &Medicine) -> Result<i64, DynError> {
        let id = medicine.is_stored().then_some(medicine.id);
        let sql = medicines::upsert(
            id,
            &medicine.name,
            &medicine.instructions,
            medicine.image_ref.as_deref(),
            &encode_schedules(&medicine.schedules),
            medicine.advice.as_deref(),
        );
        let id: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        debug!("Stored medicine {} ('{}')", id, medicine.name);
        self.notify();
        Ok(id)
    }

    /// Remove the row with the record's id. Returns the number of rows removed;
    /// a missing row is not an error.
    pub async fn delete(&self, medicine: &Medicine) -> Result<u64, DynError> {
        self.delete_by_id(medicine.id).await
    }

    /// Remove the row with the given id
    pub async fn delete_by_id(&self, id: i64) -> Result<u64, DynError> {
        let sql = medicines::delete_by_id(id);
        let removed = sqlx::query(&sql).execute(&self.pool).await?.rows_affected();
        if removed > 0 {
            debug!("Deleted medicine {}", id);
            self.notify();
        } else {
            debug!("Delete of medicine {} matched no row", id);
        }
        Ok(removed)
    }

    /// Fetch one record by id
    pub async fn get(&self, id: i64) -> Result<Option<Medicine>, DynError> {
        let sql = medicines::select_by_id(id);
        let row = sqlx::query(&sql).fetch_optional(&self.pool).await?;
        Ok(row.as_ref().map(medicine_from_row).transpose()?)
    }

    /// One-shot read of every record in display order
    pub async fn snapshot(&self) -> Result<Vec<Medicine>, DynError> {
        let sql = medicines::select_all();
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let mut list = rows
            .iter()
            .map(medicine_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        sort_for_display(&mut list);
        Ok(list)
    }

    /// Live view of every record: the first `next()` returns the current
    /// contents, each later one waits for a change and returns the new contents.
    pub fn query_all(&self) -> LiveQuery {
        LiveQuery {
            db: self.clone(),
            changes: self.changes.subscribe(),
            primed: false,
        }
    }

    /// Run `callback` with every emission of a new live query on a background task.
    /// Must be called from within a Tokio runtime. The returned handle stops the
    /// task when cancelled or dropped.
    pub fn subscribe<F>(&self, mut callback: F) -> Subscription
    where
        F: FnMut(Vec<Medicine>) + Send + 'static,
    {
        let mut live = self.query_all();
        let handle = tokio::spawn(async move {
            loop {
                match live.next().await {
                    Ok(list) => callback(list),
                    Err(e) => error!("Live medicine query failed: {}", e),
                }
            }
        });
        Subscription { handle }
    }

    /// Number of writes that have changed the table since this handle was opened
    pub fn version(&self) -> u64 {
        *self.changes.borrow()
    }

    fn notify(&self) {
        self.changes.send_modify(|version| *version += 1);
    }
}

/// A long-lived query over all medicines. See [`MedicineDb::query_all`].
pub struct LiveQuery {
    db: MedicineDb,
    changes: watch::Receiver<u64>,
    primed: bool,
}

impl LiveQuery {
    /// Next full snapshot. Returns immediately the first time, then waits for
    /// the next change to the table.
    pub async fn next(&mut self) -> Result<Vec<Medicine>, DynError> {
        if self.primed {
            self.changes.changed().await?;
        } else {
            self.changes.borrow_and_update();
            self.primed = true;
        }
        self.db.snapshot().await
    }
}

/// Cancellation handle for [`MedicineDb::subscribe`]
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    /// Stop delivering snapshots
    pub fn cancel(self) {
        drop(self);
    }

    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Create tables, wiping the medicines table when the stored schema version
/// differs from `EXPECTED_DB_VERSION`
pub async fn init_database_schema(pool: &SqlitePool) -> Result<(), DynError> {
    sqlx::query(&ddl::create_metadata_table())
        .execute(pool)
        .await?;

    let stored: Option<String> = sqlx::query_scalar(&metadata::select_by_key(VERSION_KEY))
        .fetch_optional(pool)
        .await?;

    match stored.as_deref() {
        Some(EXPECTED_DB_VERSION) => {}
        Some(other) => {
            warn!(
                "Database schema version '{}' does not match expected '{}', recreating medicines table",
                other, EXPECTED_DB_VERSION
            );
            sqlx::query(&ddl::drop_medicines_table())
                .execute(pool)
                .await?;
        }
        None => {
            // Unversioned file: keep any existing rows and stamp the current version
            info!(
                "Database has no schema version, recording '{}'",
                EXPECTED_DB_VERSION
            );
        }
    }

    sqlx::query(&ddl::create_medicines_table())
        .execute(pool)
        .await?;
    sqlx::query(&metadata::upsert(VERSION_KEY, EXPECTED_DB_VERSION))
        .execute(pool)
        .await?;

    Ok(())
}

/// Decode one `medicines` row selected with `medicines::ALL_COLUMNS`
fn medicine_from_row(row: &SqliteRow) -> Result<Medicine, sqlx::Error> {
    let schedules: Option<String> = row.try_get(4)?;
    Ok(Medicine {
        id: row.try_get(0)?,
        name: row.try_get(1)?,
        instructions: row.try_get(2)?,
        image_ref: row.try_get(3)?,
        schedules: decode_optional_schedules(schedules.as_deref()),
        advice: row.try_get(5)?,
    })
}

/// Synchronous store wrapper that owns a runtime for blocking callers.
pub struct SyncDb {
    db: MedicineDb,
    runtime: Runtime,
}

impl SyncDb {
    /// Open a database file with an embedded current-thread runtime
    pub fn connect(db_path: impl AsRef<Path>) -> Result<Self, DynError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let db = runtime.block_on(MedicineDb::open(db_path))?;
        Ok(Self { db, runtime })
    }

    /// Block on an async future using the embedded runtime
    pub fn block_on<F, T>(&self, fut: F) -> Result<T, DynError>
    where
        F: Future<Output = Result<T, DynError>>,
    {
        self.runtime.block_on(fut)
    }

    /// Get a reference to the async handle
    pub fn db(&self) -> &MedicineDb {
        &self.db
    }

    pub fn insert(&self, medicine: &Medicine) -> Result<i64, DynError> {
        self.block_on(self.db.insert(medicine))
    }

    pub fn delete_by_id(&self, id: i64) -> Result<u64, DynError> {
        self.block_on(self.db.delete_by_id(id))
    }

    pub fn get(&self, id: i64) -> Result<Option<Medicine>, DynError> {
        self.block_on(self.db.get(id))
    }

    pub fn snapshot(&self) -> Result<Vec<Medicine>, DynError> {
        self.block_on(self.db.snapshot())
    }
}
