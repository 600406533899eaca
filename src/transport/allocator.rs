//! Ephemeral local address allocation.
//!
//! Connector-side sessions get addresses from a strictly decreasing sequence
//! starting at `-1`. The allocator keeps the set of addresses currently in
//! use and skips them when the sequence wraps around.

use std::collections::HashSet;

use parking_lot::Mutex;

use crate::address::PipeAddress;
use crate::config::FULL_ALLOCATOR_CAPACITY;
use crate::error::{Result, VpipeError};

/// First address handed out, and where the sequence restarts after wrapping.
const FIRST_LOCAL_PORT: i32 = -1;

struct AllocatorState {
    taken: HashSet<PipeAddress>,
    next_port: i32,
}

/// Pool of connector-side addresses.
///
/// All state lives behind one lock that is held only for the scan/insert in
/// [`allocate`](Self::allocate) or the removal in [`release`](Self::release).
pub struct LocalAddressAllocator {
    state: Mutex<AllocatorState>,
    /// Number of addresses in the pool: `-1 ..= -capacity`.
    capacity: u32,
}

impl LocalAddressAllocator {
    /// Create an allocator over the full negative `i32` range.
    pub fn new() -> Self {
        Self::with_capacity(FULL_ALLOCATOR_CAPACITY)
    }

    /// Create an allocator over `-1 ..= -capacity`.
    ///
    /// `capacity` is clamped to `1..=2^31`.
    pub fn with_capacity(capacity: u32) -> Self {
        Self {
            state: Mutex::new(AllocatorState {
                taken: HashSet::new(),
                next_port: FIRST_LOCAL_PORT,
            }),
            capacity: capacity.clamp(1, FULL_ALLOCATOR_CAPACITY),
        }
    }

    /// Pool size.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Lowest port in the pool.
    fn floor(&self) -> i32 {
        (-i64::from(self.capacity)) as i32
    }

    /// Take the next free address.
    ///
    /// Scans at most `capacity` candidates; fails with
    /// [`VpipeError::AddressExhaustion`] if all of them are taken, leaving the
    /// taken set untouched.
    pub fn allocate(&self) -> Result<PipeAddress> {
        let floor = self.floor();
        let mut state = self.state.lock();

        for _ in 0..self.capacity {
            let candidate = PipeAddress::new(state.next_port);
            state.next_port = if state.next_port <= floor {
                FIRST_LOCAL_PORT
            } else {
                state.next_port - 1
            };

            if state.taken.insert(candidate) {
                return Ok(candidate);
            }
        }

        tracing::warn!(
            capacity = self.capacity,
            "Local address pool exhausted"
        );
        Err(VpipeError::AddressExhaustion {
            capacity: u64::from(self.capacity),
        })
    }

    /// Return an address to the pool.
    ///
    /// Releasing an address that is not taken is a no-op.
    pub fn release(&self, address: PipeAddress) {
        let removed = self.state.lock().taken.remove(&address);
        if removed {
            tracing::trace!("Released local address {}", address);
        }
    }

    /// Whether `address` is currently allocated.
    pub fn is_taken(&self, address: PipeAddress) -> bool {
        self.state.lock().taken.contains(&address)
    }

    /// Number of addresses currently allocated.
    pub fn taken_count(&self) -> usize {
        self.state.lock().taken.len()
    }
}

impl Default for LocalAddressAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LocalAddressAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalAddressAllocator")
            .field("capacity", &self.capacity)
            .field("taken", &self.taken_count())
            .finish()
    }
}
