//! Contract-size correction.
//!
//! Several venues (OKX SWAP, MEXC futures, XT futures, KCEX futures) denominate sizes in
//! contracts; one contract is a venue-declared number of base-asset units. Each venue here
//! keeps a process-wide contract table refreshed hourly by a background task, plus pure
//! transforms that multiply the relevant size fields of a raw payload before it reaches the
//! adapter.
//!
//! The tables must be started explicitly via [`init_fixes`]. Absent initialisation the
//! transforms log and pass frames through unchanged rather than raising, so the streaming
//! path never couples hard to this module.

use crate::error::DataError;
use fnv::FnvHashMap;
use marketwire_instrument::{MarketType, Venue};
use parking_lot::{Mutex, RwLock};
use smol_str::SmolStr;
use std::{future::Future, time::Duration};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// OKX SWAP contract table and transforms.
pub mod okx;

/// MEXC futures contract table and transforms.
pub mod mexc;

/// XT futures contract table and transforms.
pub mod xt;

/// KCEX futures contract table and transforms.
pub mod kcex;

/// Cadence of the catalogue refresh task.
const REFRESH_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Default [`ContractTable::wait_ready`] timeout.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-venue map of symbol to contract size (base-asset units per contract).
///
/// Written only by the hourly refresh task; read-shared across sessions.
pub struct ContractTable {
    venue: Venue,
    sizes: RwLock<FnvHashMap<SmolStr, f64>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ContractTable {
    pub(crate) fn new(venue: Venue) -> Self {
        Self {
            venue,
            sizes: RwLock::new(FnvHashMap::default()),
            task: Mutex::new(None),
        }
    }

    pub fn venue(&self) -> Venue {
        self.venue
    }

    /// Contract size for a symbol, `None` when the catalogue has not listed it.
    pub fn get(&self, symbol: &str) -> Option<f64> {
        self.sizes.read().get(symbol).copied()
    }

    /// Insert one entry. Exposed so tests and callers with out-of-band catalogues can seed
    /// the table without the refresh task.
    pub fn insert(&self, symbol: SmolStr, size: f64) {
        self.sizes.write().insert(symbol, size);
    }

    pub fn is_ready(&self) -> bool {
        !self.sizes.read().is_empty()
    }

    fn extend(&self, entries: Vec<(SmolStr, f64)>) {
        let count = entries.len();
        self.sizes.write().extend(entries);
        info!(venue = %self.venue, count, "refreshed contract sizes");
    }

    /// Block until the table has at least one entry, or fail with
    /// [`DataError::ContractTableTimeout`].
    pub async fn wait_ready(&self, timeout: Duration) -> Result<(), DataError> {
        let deadline = tokio::time::Instant::now() + timeout;
        while !self.is_ready() {
            if tokio::time::Instant::now() >= deadline {
                return Err(DataError::ContractTableTimeout { venue: self.venue });
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        Ok(())
    }

    /// Spawn the hourly refresh task once; later calls are no-ops.
    pub(crate) fn spawn_refresh<F, Fut>(&'static self, fetch: F)
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Vec<(SmolStr, f64)>, DataError>> + Send,
    {
        let mut task = self.task.lock();
        if task.is_some() {
            return;
        }
        *task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(REFRESH_INTERVAL);
            loop {
                interval.tick().await;
                match fetch().await {
                    Ok(entries) => self.extend(entries),
                    Err(fetch_error) => {
                        error!(
                            venue = %self.venue,
                            %fetch_error,
                            "failed to refresh contract sizes"
                        );
                    }
                }
            }
        }));
    }

    /// Cancel the refresh task. The table contents stay available.
    pub fn shutdown(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for ContractTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractTable")
            .field("venue", &self.venue)
            .field("entries", &self.sizes.read().len())
            .finish()
    }
}

/// Warn-and-skip helper shared by the transforms: a frame mentioning a symbol the catalogue
/// does not list is left untouched.
pub(crate) fn missing_size(venue: Venue, symbol: &str) {
    warn!(%venue, symbol, "no contract size known - leaving frame unchanged");
}

/// Start the contract-size fixes for every (venue, market) combination that needs one.
///
/// Venue/market pairs without contract denomination are skipped silently, so callers can pass
/// their full subscription universe.
pub async fn init_fixes(venues: &[Venue], markets: &[MarketType]) -> Result<(), DataError> {
    for venue in venues {
        for market in markets {
            if *market != MarketType::Futures {
                continue;
            }
            match venue {
                Venue::Okx => okx::init().await?,
                Venue::Mexc => mexc::init().await?,
                Venue::Xt => xt::init().await?,
                Venue::Kcex => kcex::init().await?,
                _ => {}
            }
        }
    }
    Ok(())
}

/// Cancel every refresh task. Table contents stay available for the transforms.
pub fn shutdown_fixes() {
    okx::table().shutdown();
    mexc::table().shutdown();
    xt::table().shutdown();
    kcex::table().shutdown();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wait_ready_times_out_on_empty_table() {
        let table = ContractTable::new(Venue::Okx);
        let actual = table.wait_ready(Duration::from_millis(150)).await;
        assert!(matches!(
            actual,
            Err(DataError::ContractTableTimeout { venue: Venue::Okx })
        ));

        table.insert(SmolStr::new("BTC-USDT-SWAP"), 0.01);
        assert!(table.wait_ready(Duration::from_millis(150)).await.is_ok());
    }
}
