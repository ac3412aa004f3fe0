//! Lease tracking.
//!
//! This module holds the shared lease table, the single source of truth
//! for which client has which address. The table owns the
//! [`AddressPool`], so looking a client up, allocating the next candidate
//! address, and registering the new lease happen as one transaction under
//! one lock. Protocol state is implicit in the table: a client with no
//! record is unassigned, a client with a record is assigned.
//!
//! Leases are never removed. `expires_at` is stamped when a lease is
//! created but nothing evicts a lease or returns its address to the pool
//! when that moment passes; the field is informational.
//!
//! # Thread Safety
//!
//! All operations are thread-safe. [`LeaseTable`] wraps its state in a
//! [`RwLock`]: [`offer`](LeaseTable::offer) takes the write lock for the
//! whole lookup-allocate-register sequence, [`lookup`](LeaseTable::lookup)
//! and the read-only accessors share the read lock.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::RwLock;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::pool::AddressPool;

/// An active lease: a time-bounded binding between a client identifier
/// and an allocated address.
#[derive(Debug, Clone)]
pub struct LeaseRecord {
    /// Identifier the client supplied.
    ///
    /// When a DISCOVER carries no `CLIENT_ID:` field, the stringified
    /// sender IP stands in (see [`Request::parse`](crate::message::Request::parse)),
    /// so distinct hosts reaching the server through one relay address can
    /// collide on a single lease. Known limitation, kept as-is.
    pub client_id: String,

    /// The address leased to this client, unique across the table.
    pub address: Ipv4Addr,

    /// When this lease expires (UTC): allocation time plus the configured
    /// duration. Recorded and reported, never enforced.
    pub expires_at: DateTime<Utc>,

    /// Source address of the datagram that created the lease, kept so
    /// operators can tell relayed registrations from direct ones.
    pub origin: SocketAddr,
}

impl LeaseRecord {
    /// Seconds remaining until expiration, or 0 if that moment has passed.
    pub fn remaining_seconds(&self) -> i64 {
        let remaining = self.expires_at - Utc::now();
        remaining.num_seconds().max(0)
    }
}

/// Internal mutable state protected by the table lock.
#[derive(Debug)]
struct TableState {
    records: HashMap<String, LeaseRecord>,
    pool: AddressPool,
}

/// Thread-safe lease table owning the address pool.
///
/// The table exposes exactly the operations the protocol needs:
/// [`offer`](Self::offer) for DISCOVER and [`lookup`](Self::lookup) for
/// REQUEST, plus read-only accessors for reporting. There is no remove or
/// renew; an address, once bound, stays bound until the process exits.
///
/// # Example
///
/// ```
/// use leaseline::{Config, LeaseTable};
///
/// # async fn example() -> leaseline::Result<()> {
/// let table = LeaseTable::new(&Config::default());
/// let origin = "192.168.1.23:68".parse().unwrap();
///
/// let record = table.offer("client-a", origin).await?;
/// assert_eq!(table.lookup("client-a").await.unwrap().address, record.address);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct LeaseTable {
    state: RwLock<TableState>,
    lease_duration: TimeDelta,
}

impl LeaseTable {
    /// Creates an empty table with a freshly generated pool.
    pub fn new(config: &Config) -> Self {
        let state = TableState {
            records: HashMap::new(),
            pool: AddressPool::new(config.pool_base, config.pool_size),
        };

        Self {
            state: RwLock::new(state),
            lease_duration: TimeDelta::seconds(i64::from(config.lease_duration_seconds)),
        }
    }

    /// Returns the lease held by `client_id`, if one exists.
    pub async fn lookup(&self, client_id: &str) -> Option<LeaseRecord> {
        let state = self.state.read().await;
        state.records.get(client_id).cloned()
    }

    /// The DISCOVER transaction: returns the client's existing lease, or
    /// allocates the next pool address and registers a new one.
    ///
    /// The whole sequence runs under the write lock, which is what makes
    /// the table's invariants hold under concurrency: two clients offered
    /// at the same time can never receive the same address, and two
    /// concurrent offers for the same client converge on one record. A
    /// repeated DISCOVER is idempotent and consumes nothing from the pool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolExhausted`] when the client has no lease and
    /// the pool cursor has reached the end of the generated sequence. No
    /// record is created in that case.
    pub async fn offer(&self, client_id: &str, origin: SocketAddr) -> Result<LeaseRecord> {
        let mut state = self.state.write().await;

        if let Some(record) = state.records.get(client_id) {
            return Ok(record.clone());
        }

        let address = state.pool.allocate_next().ok_or(Error::PoolExhausted)?;
        let record = LeaseRecord {
            client_id: client_id.to_string(),
            address,
            expires_at: Utc::now() + self.lease_duration,
            origin,
        };
        state.records.insert(client_id.to_string(), record.clone());

        Ok(record)
    }

    /// Returns all leases, in no particular order.
    pub async fn list_leases(&self) -> Vec<LeaseRecord> {
        let state = self.state.read().await;
        state.records.values().cloned().collect()
    }

    /// Number of registered leases.
    pub async fn lease_count(&self) -> usize {
        let state = self.state.read().await;
        state.records.len()
    }

    /// Number of pool addresses not yet handed out.
    pub async fn remaining_addresses(&self) -> usize {
        let state = self.state.read().await;
        state.pool.remaining()
    }
}
