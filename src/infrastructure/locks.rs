use crate::domain::wallet::WalletId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

/// Per-wallet mutual exclusion shared by the ledger backends.
///
/// Each wallet gets its own async mutex, created on first use. A commit holds the guards of
/// every wallet it touches until its writes are visible, so all mutations of one wallet are
/// totally ordered while commits on disjoint wallets never wait on each other.
#[derive(Default, Clone)]
pub struct WalletLocks {
    locks: Arc<Mutex<HashMap<WalletId, Arc<tokio::sync::Mutex<()>>>>>,
}

/// Guards for a set of wallets; dropping it releases them all.
pub struct WalletGuards {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl WalletLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks every wallet in `wallets`.
    ///
    /// Locks are always taken in ascending `WalletId` order whatever the input order, which
    /// rules out deadlock between two commits sharing both wallets.
    pub async fn acquire(&self, wallets: &[WalletId]) -> WalletGuards {
        let mut ordered = wallets.to_vec();
        ordered.sort();
        ordered.dedup();

        let handles: Vec<_> = {
            let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            ordered
                .iter()
                .map(|id| locks.entry(*id).or_default().clone())
                .collect()
        };

        let mut guards = Vec::with_capacity(handles.len());
        for handle in handles {
            guards.push(handle.lock_owned().await);
        }
        debug!(wallets = ?ordered, "wallet locks acquired");

        WalletGuards { _guards: guards }
    }
}
