//! Postgres record strategy for the sequenced-item store.
//!
//! One table per sequence discipline, keyed by a composite primary key
//! `(sequence_id, position)` — the database's own constraint is the
//! uniqueness check, so a racing append loses atomically at commit time and
//! surfaces as `ConcurrencyConflict`. Everything else the driver can fail
//! with is `Transport`.
//!
//! Schema provisioning is the operator's job. The expected shape:
//!
//! ```sql
//! CREATE TABLE integer_sequenced_items (
//!     sequence_id TEXT   NOT NULL,
//!     position    BIGINT NOT NULL,
//!     topic       TEXT   NOT NULL,
//!     data        TEXT   NOT NULL,
//!     PRIMARY KEY (sequence_id, position)
//! );
//! -- timestamp_sequenced_items: identical shape, time-ordered positions.
//! ```

use std::marker::PhantomData;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::debug;

use seqstore::{
    Position, PositionRange, RecordStrategy, Result, SequencedItem, StoreError, Timestamp,
};

pub const INTEGER_SEQUENCED_TABLE: &str = "integer_sequenced_items";
pub const TIMESTAMP_SEQUENCED_TABLE: &str = "timestamp_sequenced_items";

/// How a position discipline lays out in a BIGINT column. Both disciplines
/// are 64-bit ordered values, so one column type covers them and the
/// numeric sort order is the position order.
pub trait PgPosition: Position {
    fn to_db(self) -> i64;
    fn from_db(raw: i64) -> Self;
}

impl PgPosition for i64 {
    fn to_db(self) -> i64 {
        self
    }

    fn from_db(raw: i64) -> Self {
        raw
    }
}

impl PgPosition for Timestamp {
    fn to_db(self) -> i64 {
        self.nanos()
    }

    fn from_db(raw: i64) -> Self {
        Timestamp::from_nanos(raw)
    }
}

/// Relational adapter: one instance per (discipline, table).
#[derive(Clone)]
pub struct PgRecordStrategy<P> {
    pool: PgPool,
    table: &'static str,
    _position: PhantomData<P>,
}

impl PgRecordStrategy<i64> {
    /// Strategy over the integer-sequenced table.
    pub fn integer_sequenced(pool: PgPool) -> Self {
        Self::with_table(pool, INTEGER_SEQUENCED_TABLE)
    }
}

impl PgRecordStrategy<Timestamp> {
    /// Strategy over the timestamp-sequenced table.
    pub fn timestamp_sequenced(pool: PgPool) -> Self {
        Self::with_table(pool, TIMESTAMP_SEQUENCED_TABLE)
    }
}

impl<P: PgPosition> PgRecordStrategy<P> {
    /// Strategy over a caller-named table of the standard shape. The name is
    /// `&'static str` on purpose: table names cannot be bound as parameters,
    /// so only compile-time strings are interpolated into SQL here.
    pub fn with_table(pool: PgPool, table: &'static str) -> Self {
        Self {
            pool,
            table,
            _position: PhantomData,
        }
    }
}

#[async_trait]
impl<P: PgPosition> RecordStrategy<P> for PgRecordStrategy<P> {
    async fn append(&self, item: SequencedItem<P>) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} (sequence_id, position, topic, data) VALUES ($1, $2, $3, $4)",
            self.table
        );
        sqlx::query(&sql)
            .bind(&item.sequence_id)
            .bind(item.position.to_db())
            .bind(&item.topic)
            .bind(&item.data)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    debug!(sequence_id = %item.sequence_id, position = %item.position,
                           "append lost the uniqueness race");
                    StoreError::conflict(&item.sequence_id, item.position)
                } else {
                    StoreError::Transport(e.into())
                }
            })?;
        Ok(())
    }

    async fn get_item(&self, sequence_id: &str, position: P) -> Result<SequencedItem<P>> {
        let sql = format!(
            "SELECT topic, data FROM {} WHERE sequence_id = $1 AND position = $2",
            self.table
        );
        let row = sqlx::query(&sql)
            .bind(sequence_id)
            .bind(position.to_db())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Transport(e.into()))?;

        match row {
            Some(row) => Ok(SequencedItem::new(
                sequence_id,
                position,
                row.try_get::<String, _>("topic")
                    .map_err(|e| StoreError::Transport(e.into()))?,
                row.try_get::<String, _>("data")
                    .map_err(|e| StoreError::Transport(e.into()))?,
            )),
            None => Err(StoreError::not_found(sequence_id, position)),
        }
    }

    async fn list_items(
        &self,
        sequence_id: &str,
        range: &PositionRange<P>,
        limit: usize,
        ascending: bool,
    ) -> Result<Vec<SequencedItem<P>>> {
        if limit == 0 {
            return Err(StoreError::InvalidArgument(
                "list_items limit must be positive".into(),
            ));
        }

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT position, topic, data FROM {} WHERE sequence_id = ",
            self.table
        ));
        query.push_bind(sequence_id);
        if let Some(p) = range.gt {
            query.push(" AND position > ").push_bind(p.to_db());
        }
        if let Some(p) = range.gte {
            query.push(" AND position >= ").push_bind(p.to_db());
        }
        if let Some(p) = range.lt {
            query.push(" AND position < ").push_bind(p.to_db());
        }
        if let Some(p) = range.lte {
            query.push(" AND position <= ").push_bind(p.to_db());
        }
        query.push(if ascending {
            " ORDER BY position ASC"
        } else {
            " ORDER BY position DESC"
        });
        query.push(" LIMIT ").push_bind(limit as i64);

        let rows = query
            .build_query_as::<(i64, String, String)>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Transport(e.into()))?;

        Ok(rows
            .into_iter()
            .map(|(position, topic, data)| {
                SequencedItem::new(sequence_id, P::from_db(position), topic, data)
            })
            .collect())
    }

    async fn all_items(&self) -> Result<Vec<SequencedItem<P>>> {
        let sql = format!(
            "SELECT sequence_id, position, topic, data FROM {} ORDER BY sequence_id, position",
            self.table
        );
        let rows = sqlx::query_as::<_, (String, i64, String, String)>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Transport(e.into()))?;

        Ok(rows
            .into_iter()
            .map(|(sequence_id, position, topic, data)| {
                SequencedItem::new(sequence_id, P::from_db(position), topic, data)
            })
            .collect())
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}
