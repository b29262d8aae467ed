//! SQLite implementation of [`BtcObserverDb`].

use std::{future::Future, path::Path, str::FromStr};

use async_trait::async_trait;
use bitcoin::Txid;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};
use tracing::{info, warn};
use zeta_btc_primitives::{rpc_types::GetTransactionResult, types::OutboundKey};

use super::{config::DbConfig, errors::StorageError};
use crate::{errors::DbResult, observer::BtcObserverDb};

/// SQLite-backed observer database.
#[derive(Debug, Clone)]
pub struct SqliteDb {
    pool: SqlitePool,
    config: DbConfig,
}

impl SqliteDb {
    /// Wraps an existing pool whose schema is already migrated.
    pub fn new(pool: SqlitePool, config: DbConfig) -> Self {
        Self { pool, config }
    }

    /// Opens (creating if missing) the database file at `path` in WAL mode and runs the
    /// migrations.
    pub async fn connect(path: impl AsRef<Path>, config: DbConfig) -> DbResult<Self> {
        let path = path.as_ref();
        let connect_options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .connect_with(connect_options)
            .await
            .map_err(StorageError::from)?;

        info!(action = "running migrations", path = %path.display());
        sqlx::migrate!("../../migrations")
            .run(&pool)
            .await
            .map_err(StorageError::from)?;

        Ok(Self::new(pool, config))
    }

    /// Runs `op`, retrying while the database reports itself busy.
    async fn with_retries<T, F, Fut>(&self, name: &'static str, op: F) -> DbResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, StorageError>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Err(err) if err.is_busy() && attempt < self.config.max_retry_count() => {
                    attempt += 1;
                    warn!(%name, %err, %attempt, "database busy, retrying");
                    tokio::time::sleep(self.config.backoff_period()).await;
                }
                result => return Ok(result?),
            }
        }
    }

    async fn upsert_last_scanned_block(&self, height: i64) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT OR REPLACE INTO last_scanned_block
                (id, block_height)
                VALUES (1, $1)",
        )
        .bind(height)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn upsert_broadcasted_tx(&self, outbound_id: &str, txid: &str) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT OR REPLACE INTO broadcasted_txs
                (outbound_id, txid)
                VALUES ($1, $2)",
        )
        .bind(outbound_id)
        .bind(txid)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn upsert_included_tx(
        &self,
        outbound_id: &str,
        tx_result: &str,
    ) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT OR REPLACE INTO included_txs
                (outbound_id, tx_result)
                VALUES ($1, $2)",
        )
        .bind(outbound_id)
        .bind(tx_result)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn remove_included_tx(&self, outbound_id: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM included_txs WHERE outbound_id = $1")
            .bind(outbound_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

fn parse_outbound_id(outbound_id: &str) -> Result<OutboundKey, StorageError> {
    OutboundKey::from_str(outbound_id).map_err(|e| StorageError::InvalidData(e.to_string()))
}

#[async_trait]
impl BtcObserverDb for SqliteDb {
    async fn get_last_scanned_block(&self) -> DbResult<Option<u64>> {
        let height: Option<i64> =
            sqlx::query_scalar("SELECT block_height FROM last_scanned_block WHERE id = 1")
                .fetch_optional(&self.pool)
                .await
                .map_err(StorageError::from)?;

        match height {
            Some(height) => u64::try_from(height)
                .map(Some)
                .map_err(|_| StorageError::InvalidData(format!("negative block height {height}")).into()),
            None => Ok(None),
        }
    }

    async fn set_last_scanned_block(&self, height: u64) -> DbResult<()> {
        let height = i64::try_from(height)
            .map_err(|_| StorageError::InvalidData(format!("block height {height} out of range")))?;

        self.with_retries("set_last_scanned_block", || {
            self.upsert_last_scanned_block(height)
        })
        .await
    }

    async fn get_broadcasted_txs(&self) -> DbResult<Vec<(OutboundKey, Txid)>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT outbound_id, txid FROM broadcasted_txs")
                .fetch_all(&self.pool)
                .await
                .map_err(StorageError::from)?;

        rows.into_iter()
            .map(|(outbound_id, txid)| {
                let key = parse_outbound_id(&outbound_id)?;
                let txid = Txid::from_str(&txid)
                    .map_err(|e| StorageError::InvalidData(format!("txid {txid}: {e}")))?;

                Ok((key, txid))
            })
            .collect()
    }

    async fn save_broadcasted_tx(&self, key: &OutboundKey, txid: Txid) -> DbResult<()> {
        let outbound_id = key.to_string();
        let txid = txid.to_string();

        self.with_retries("save_broadcasted_tx", || {
            self.upsert_broadcasted_tx(&outbound_id, &txid)
        })
        .await
    }

    async fn get_included_txs(&self) -> DbResult<Vec<(OutboundKey, GetTransactionResult)>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT outbound_id, tx_result FROM included_txs")
                .fetch_all(&self.pool)
                .await
                .map_err(StorageError::from)?;

        rows.into_iter()
            .map(|(outbound_id, tx_result)| {
                let key = parse_outbound_id(&outbound_id)?;
                let result = serde_json::from_str(&tx_result).map_err(|e| {
                    StorageError::InvalidData(format!("tx result of {outbound_id}: {e}"))
                })?;

                Ok((key, result))
            })
            .collect()
    }

    async fn save_included_tx(
        &self,
        key: &OutboundKey,
        result: &GetTransactionResult,
    ) -> DbResult<()> {
        let outbound_id = key.to_string();
        let tx_result = serde_json::to_string(result)
            .map_err(|e| StorageError::InvalidData(format!("tx result of {outbound_id}: {e}")))?;

        self.with_retries("save_included_tx", || {
            self.upsert_included_tx(&outbound_id, &tx_result)
        })
        .await
    }

    async fn delete_included_tx(&self, key: &OutboundKey) -> DbResult<()> {
        let outbound_id = key.to_string();

        self.with_retries("delete_included_tx", || {
            self.remove_included_tx(&outbound_id)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use zeta_btc_test_utils::prelude::*;

    use super::*;

    fn make_db(pool: SqlitePool) -> SqliteDb {
        SqliteDb::new(pool, DbConfig::default())
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_last_scanned_block(pool: SqlitePool) {
        let db = make_db(pool);

        assert!(
            db.get_last_scanned_block()
                .await
                .is_ok_and(|v| v.is_none()),
            "last scanned block must not exist initially"
        );

        db.set_last_scanned_block(828_440)
            .await
            .expect("must be able to set last scanned block");
        db.set_last_scanned_block(828_441)
            .await
            .expect("must be able to overwrite last scanned block");

        assert!(
            db.get_last_scanned_block()
                .await
                .is_ok_and(|v| v == Some(828_441)),
            "last scanned block must be the latest value"
        );
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_broadcasted_txs(pool: SqlitePool) {
        let db = make_db(pool);
        let tss_address = generate_tss_address_string();
        let key = OutboundKey::new(18444, tss_address.clone(), 1);
        let other_key = OutboundKey::new(18444, tss_address, 2);

        let first = generate_txid();
        let second = generate_txid();

        db.save_broadcasted_tx(&key, first)
            .await
            .expect("must be able to save broadcasted tx");
        db.save_broadcasted_tx(&key, second)
            .await
            .expect("must be able to overwrite broadcasted tx");
        db.save_broadcasted_tx(&other_key, first)
            .await
            .expect("must be able to save broadcasted tx");

        let mut txs = db
            .get_broadcasted_txs()
            .await
            .expect("must be able to load broadcasted txs");
        txs.sort();

        assert_eq!(
            txs,
            vec![(key, second), (other_key, first)],
            "saving under an existing key must replace the hash"
        );
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_included_txs(pool: SqlitePool) {
        let db = make_db(pool);
        let key = OutboundKey::new(8332, generate_tss_address_string(), 9);
        let mut result = generate_tx_result(generate_txid(), 0);

        db.save_included_tx(&key, &result)
            .await
            .expect("must be able to save included tx");

        result.confirmations = 3;
        db.save_included_tx(&key, &result)
            .await
            .expect("must be able to refresh included tx");

        assert!(
            db.get_included_txs()
                .await
                .is_ok_and(|v| v == vec![(key.clone(), result.clone())]),
            "included tx must be the refreshed result"
        );

        db.delete_included_tx(&key)
            .await
            .expect("must be able to delete included tx");
        db.delete_included_tx(&key)
            .await
            .expect("deleting a missing included tx must not fail");

        assert!(
            db.get_included_txs().await.is_ok_and(|v| v.is_empty()),
            "included tx must not exist after deletion"
        );
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn test_malformed_outbound_id(pool: SqlitePool) {
        sqlx::query("INSERT INTO broadcasted_txs (outbound_id, txid) VALUES ('garbage', 'x')")
            .execute(&pool)
            .await
            .expect("must insert raw row");

        let db = make_db(pool);
        assert!(
            db.get_broadcasted_txs().await.is_err(),
            "malformed rows must surface as errors"
        );
    }

    #[test]
    fn test_is_busy() {
        assert!(!StorageError::InvalidData("x".to_string()).is_busy());
        assert!(StorageError::Driver(sqlx::Error::PoolTimedOut).is_busy());
        assert!(!StorageError::Driver(sqlx::Error::RowNotFound).is_busy());
    }
}
