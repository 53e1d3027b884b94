//! Fixed-size receive buffer pool.
//!
//! All buffers are allocated once at startup. The engine claims one before
//! each receive poll and writes the frame straight into it; if the poll
//! produced something worth reporting the claim is committed and its
//! [`BufferHandle`] travels in the event, otherwise dropping the claim hands
//! the buffer back.
//!
//! # Handles
//!
//! Handles are drawn from a counter that never repeats, so a handle that
//! has been released can never alias a buffer claimed later. Looking up or
//! releasing a stale handle is a no-op.
//!
//! # Sharing
//!
//! The pool is shared between the engine thread and the host through an
//! `Arc`. Slot bookkeeping sits behind a mutex; the buffer bytes are moved
//! out of the slot while claimed, so the engine never holds the lock while
//! receiving.

use std::{
    fmt,
    num::NonZeroU64,
    ops::{Deref, DerefMut},
    sync::{Mutex, MutexGuard, PoisonError},
};

use crate::error::PoolError;

/// Identifies a committed buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(NonZeroU64);

impl BufferHandle {
    /// Raw handle value.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for BufferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
struct Slot {
    /// Handle of the claim or commit occupying the slot
    owner: Option<BufferHandle>,
    /// Buffer storage; `None` while moved out to a claim
    storage: Option<Vec<u8>>,
}

impl Slot {
    fn is_free(&self) -> bool {
        self.owner.is_none() && self.storage.is_some()
    }
}

#[derive(Debug)]
struct PoolState {
    slots: Vec<Slot>,
    next_handle: NonZeroU64,
}

impl PoolState {
    fn issue_handle(&mut self) -> BufferHandle {
        let handle = BufferHandle(self.next_handle);
        self.next_handle = self.next_handle.saturating_add(1);
        handle
    }

    fn slot_of(&mut self, handle: BufferHandle) -> Option<&mut Slot> {
        self.slots.iter_mut().find(|slot| slot.owner == Some(handle))
    }
}

/// A fixed set of equally sized receive buffers.
#[derive(Debug)]
pub struct BufferPool {
    state: Mutex<PoolState>,
    buffer_size: usize,
}

impl BufferPool {
    /// Allocate `count` buffers of `buffer_size` bytes each.
    pub fn new(count: usize, buffer_size: usize) -> Result<Self, PoolError> {
        if count == 0 || buffer_size == 0 {
            return Err(PoolError::Empty { count, size: buffer_size });
        }

        let mut slots = Vec::new();
        slots
            .try_reserve_exact(count)
            .map_err(|_| PoolError::Allocation { count, size: buffer_size })?;
        for _ in 0..count {
            let mut storage = Vec::new();
            storage
                .try_reserve_exact(buffer_size)
                .map_err(|_| PoolError::Allocation { count, size: buffer_size })?;
            slots.push(Slot { owner: None, storage: Some(storage) });
        }

        Ok(Self {
            state: Mutex::new(PoolState { slots, next_handle: NonZeroU64::MIN }),
            buffer_size,
        })
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Capacity of each buffer.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Number of buffers in the pool.
    pub fn capacity(&self) -> usize {
        self.lock().slots.len()
    }

    /// Number of buffers claimed or committed.
    pub fn in_use(&self) -> usize {
        self.lock().slots.iter().filter(|slot| !slot.is_free()).count()
    }

    /// Claim a free buffer, or `None` if every buffer is in use.
    pub fn claim(&self) -> Option<Claim<'_>> {
        let mut state = self.lock();
        let index = state.slots.iter().position(Slot::is_free)?;
        let handle = state.issue_handle();
        let slot = &mut state.slots[index];
        let mut storage = slot.storage.take()?;
        slot.owner = Some(handle);
        storage.clear();

        Some(Claim { pool: self, index, handle, storage, committed: false })
    }

    /// Read a committed buffer.
    ///
    /// Returns `None` for released or unknown handles.
    pub fn get<R>(&self, handle: BufferHandle, read: impl FnOnce(&[u8]) -> R) -> Option<R> {
        let mut state = self.lock();
        let slot = state.slot_of(handle)?;
        slot.storage.as_deref().map(read)
    }

    /// Return a committed buffer to the pool.
    ///
    /// Returns false if the handle was not live.
    pub fn release(&self, handle: BufferHandle) -> bool {
        let mut state = self.lock();
        match state.slot_of(handle) {
            Some(slot) if slot.storage.is_some() => {
                slot.owner = None;
                true
            },
            _ => false,
        }
    }

    fn restore(&self, index: usize, handle: BufferHandle, storage: Vec<u8>, keep: bool) {
        let mut state = self.lock();
        if let Some(slot) = state.slots.get_mut(index) {
            slot.storage = Some(storage);
            if !keep && slot.owner == Some(handle) {
                slot.owner = None;
            }
        }
    }
}

/// A buffer checked out of the pool.
///
/// Dropping an uncommitted claim frees the slot.
#[derive(Debug)]
pub struct Claim<'a> {
    pool: &'a BufferPool,
    index: usize,
    handle: BufferHandle,
    storage: Vec<u8>,
    committed: bool,
}

impl Claim<'_> {
    /// Handle the buffer will have once committed.
    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    /// Keep the buffer in use and hand out its handle.
    pub fn commit(mut self) -> BufferHandle {
        self.committed = true;
        self.handle
    }
}

impl Deref for Claim<'_> {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.storage
    }
}

impl DerefMut for Claim<'_> {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.storage
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        let storage = std::mem::take(&mut self.storage);
        self.pool.restore(self.index, self.handle, storage, self.committed);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn empty_pool_rejected() {
        assert_eq!(BufferPool::new(0, 16).unwrap_err(), PoolError::Empty { count: 0, size: 16 });
        assert_eq!(BufferPool::new(2, 0).unwrap_err(), PoolError::Empty { count: 2, size: 0 });
    }

    #[test]
    fn claims_have_full_capacity() {
        let pool = BufferPool::new(1, 64).unwrap();
        let claim = pool.claim().unwrap();
        assert!(claim.capacity() >= 64);
        assert!(claim.is_empty());
    }

    #[test]
    fn exhaustion_returns_none() {
        let pool = BufferPool::new(2, 8).unwrap();
        let a = pool.claim().unwrap();
        let b = pool.claim().unwrap();
        assert!(pool.claim().is_none());
        assert_ne!(a.handle(), b.handle());
    }

    #[test]
    fn dropped_claim_frees_slot() {
        let pool = BufferPool::new(1, 8).unwrap();
        {
            let mut claim = pool.claim().unwrap();
            claim.extend_from_slice(b"abc");
        }
        assert_eq!(pool.in_use(), 0);
        assert!(pool.claim().unwrap().is_empty());
    }

    #[test]
    fn committed_buffer_readable_until_released() {
        let pool = BufferPool::new(1, 8).unwrap();
        let mut claim = pool.claim().unwrap();
        claim.extend_from_slice(b"frame");
        let handle = claim.commit();

        assert_eq!(pool.in_use(), 1);
        assert!(pool.claim().is_none());
        assert_eq!(pool.get(handle, <[u8]>::to_vec), Some(b"frame".to_vec()));

        assert!(pool.release(handle));
        assert!(!pool.release(handle));
        assert_eq!(pool.get(handle, <[u8]>::len), None);
        assert_eq!(pool.in_use(), 0);
    }

    #[test]
    fn uncommitted_claim_not_readable() {
        let pool = BufferPool::new(1, 8).unwrap();
        let claim = pool.claim().unwrap();
        assert_eq!(pool.get(claim.handle(), <[u8]>::len), None);
        assert!(!pool.release(claim.handle()));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Claim { commit: bool },
        Release(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            any::<bool>().prop_map(|commit| Op::Claim { commit }),
            any::<usize>().prop_map(Op::Release),
        ]
    }

    proptest! {
        #[test]
        fn outstanding_handles_never_alias(count in 1usize..6, ops in proptest::collection::vec(op(), 0..64)) {
            let pool = BufferPool::new(count, 4).unwrap();
            let mut live: Vec<BufferHandle> = Vec::new();
            let mut seen = HashSet::new();

            for op in ops {
                match op {
                    Op::Claim { commit } => match pool.claim() {
                        Some(claim) => {
                            prop_assert!(live.len() < count);
                            prop_assert!(seen.insert(claim.handle()));
                            if commit {
                                live.push(claim.commit());
                            }
                        },
                        None => {
                            prop_assert_eq!(live.len(), count);
                        },
                    },
                    Op::Release(i) if !live.is_empty() => {
                        let handle = live.swap_remove(i % live.len());
                        prop_assert!(pool.release(handle));
                    },
                    Op::Release(_) => {},
                }
                prop_assert_eq!(pool.in_use(), live.len());
            }
        }
    }
}
