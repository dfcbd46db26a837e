use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::dune::DuneClient;
use crate::cache::QueryCache;
use crate::models::{Address, Table};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Dune client not initialized. Check DUNE_API_KEY.")]
    MissingApiKey,
}

/// Pulls recent transactions for a focal pair, going through the query cache
pub struct TransactionFetcher {
    client: Option<DuneClient>,
    cache: QueryCache,
}

impl TransactionFetcher {
    pub fn new(client: Option<DuneClient>, cache: QueryCache) -> Self {
        Self { client, cache }
    }

    /// SQL selecting the latest `limit` transactions touching each address
    pub fn build_query(address1: &Address, address2: &Address, limit: u32) -> String {
        format!(
            r#"
            WITH address1_tx AS (
                SELECT "from", "to", (value/1e18) AS value_eth, hash, block_time
                FROM ethereum.transactions
                WHERE ("from" = {a1} OR "to" = {a1})
                ORDER BY block_time DESC
                LIMIT {limit}
            ),
            address2_tx AS (
                SELECT "from", "to", (value/1e18) AS value_eth, hash, block_time
                FROM ethereum.transactions
                WHERE ("from" = {a2} OR "to" = {a2})
                ORDER BY block_time DESC
                LIMIT {limit}
            )
            SELECT * FROM address1_tx
            UNION ALL
            SELECT * FROM address2_tx
            "#,
            a1 = address1,
            a2 = address2,
            limit = limit,
        )
    }

    /// Fetch the transaction table for a focal pair.
    ///
    /// # Returns
    /// * `Ok(Table)` - Cached or freshly fetched rows, deduplicated by hash; empty on any remote failure
    /// * `Err(FetchError::MissingApiKey)` - No credential was configured
    pub async fn fetch_transactions(
        &self,
        address1: &Address,
        address2: &Address,
        limit: u32,
    ) -> Result<Table, FetchError> {
        let client = self.client.as_ref().ok_or(FetchError::MissingApiKey)?;

        println!("Fetching transactions for {} and {}...", address1, address2);
        let query = Self::build_query(address1, address2, limit);

        if let Some(cached) = self.cache.get(&query) {
            info!("Serving {} rows from cache", cached.len());
            return Ok(cached);
        }

        match client.run_sql(&query).await {
            Ok(rows) => {
                let rows = dedup_by_hash(rows);
                info!("Fetched {} transactions from Dune", rows.len());
                self.cache.put(&query, &rows);
                Ok(rows)
            }
            Err(e) => {
                warn!("Dune error: {}", e);
                Ok(Vec::new())
            }
        }
    }
}

/// Drop repeated hashes, keeping the first occurrence. Rows without a hash are kept.
pub fn dedup_by_hash(rows: Table) -> Table {
    let before = rows.len();
    let mut seen = HashSet::new();
    let deduped: Table = rows
        .into_iter()
        .filter(|row| match &row.hash {
            Some(hash) => seen.insert(hash.clone()),
            None => true,
        })
        .collect();

    if deduped.len() != before {
        debug!("Removed {} duplicate rows", before - deduped.len());
    }
    deduped
}
