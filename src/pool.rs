//! Candidate address generation and sequential allocation.

use std::net::Ipv4Addr;

/// An ordered pool of candidate addresses with a monotone allocation cursor.
///
/// The pool is generated once at startup: `count` addresses counting up
/// from `base + 1` (the base address itself is never issued). Allocation
/// hands out addresses in generation order and never revisits an index, so
/// once the cursor reaches the end the pool stays exhausted for the
/// lifetime of the process. Released or expired leases do not return their
/// address to the pool.
///
/// The pool carries no lock of its own. It is owned by
/// [`LeaseTable`](crate::lease::LeaseTable), and allocation only happens
/// inside the table's critical section so that allocate + register form a
/// single transaction.
#[derive(Debug)]
pub struct AddressPool {
    addresses: Vec<Ipv4Addr>,
    next: usize,
}

impl AddressPool {
    /// Generates `count` addresses by incrementing `base`.
    ///
    /// The caller is responsible for having validated that the sequence
    /// fits in the IPv4 address space (see
    /// [`Config::validate`](crate::Config::validate)).
    pub fn new(base: Ipv4Addr, count: u32) -> Self {
        let base = u32::from(base);
        let addresses = (1..=count)
            .map(|offset| Ipv4Addr::from(base + offset))
            .collect();
        Self { addresses, next: 0 }
    }

    /// Returns the address at the cursor and advances it, or `None` once
    /// every address has been handed out.
    pub fn allocate_next(&mut self) -> Option<Ipv4Addr> {
        let address = self.addresses.get(self.next).copied()?;
        self.next += 1;
        Some(address)
    }

    /// Number of addresses not yet handed out.
    pub fn remaining(&self) -> usize {
        self.addresses.len() - self.next
    }

    /// Total number of addresses the pool was generated with.
    pub fn capacity(&self) -> usize {
        self.addresses.len()
    }
}
