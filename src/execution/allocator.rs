//! Resource Allocator - exclusive token ownership during execution
//!
//! The only state shared between concurrently executing actions. Claims are
//! claim-if-absent on a `DashMap`; every successful claim is paired with
//! exactly one release, performed by `AllocationGuard` on every path
//! (success, failure, timeout, or the future being dropped).

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::error::AllocationError;

#[derive(Debug, Default)]
pub struct ResourceAllocator {
    /// token -> owning agent
    owners: DashMap<String, String>,
    allocations: AtomicU64,
    releases: AtomicU64,
}

impl ResourceAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim one token for `agent_id` if nobody holds it
    pub fn try_claim(&self, token: &str, agent_id: &str) -> Result<(), AllocationError> {
        match self.owners.entry(token.to_string()) {
            Entry::Occupied(held) => Err(AllocationError::AlreadyHeld {
                token: token.to_string(),
                holder: held.get().clone(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(agent_id.to_string());
                self.allocations.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }
    }

    /// Release `token` if `agent_id` holds it. Returns whether anything was released.
    pub fn release(&self, token: &str, agent_id: &str) -> bool {
        let released = self
            .owners
            .remove_if(token, |_, holder| holder == agent_id)
            .is_some();
        if released {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
        released
    }

    /// Claim every token or none of them.
    ///
    /// On failure, tokens claimed so far are released before returning.
    pub fn claim_all(
        self: &Arc<Self>,
        tokens: &[String],
        agent_id: &str,
    ) -> Result<AllocationGuard, AllocationError> {
        let mut guard = AllocationGuard {
            allocator: Arc::clone(self),
            agent_id: agent_id.to_string(),
            tokens: Vec::with_capacity(tokens.len()),
            released: false,
        };
        for token in tokens {
            // dropping the guard on `?` releases the partial claim
            self.try_claim(token, agent_id)?;
            guard.tokens.push(token.clone());
        }
        debug!("{} claimed {:?}", agent_id, guard.tokens);
        Ok(guard)
    }

    pub fn holder(&self, token: &str) -> Option<String> {
        self.owners.get(token).map(|h| h.value().clone())
    }

    pub fn held_tokens(&self) -> Vec<String> {
        let mut tokens: Vec<String> = self.owners.iter().map(|e| e.key().clone()).collect();
        tokens.sort();
        tokens
    }

    pub fn is_idle(&self) -> bool {
        self.owners.is_empty()
    }

    pub fn allocation_count(&self) -> u64 {
        self.allocations.load(Ordering::SeqCst)
    }

    pub fn release_count(&self) -> u64 {
        self.releases.load(Ordering::SeqCst)
    }

    /// Every claim so far has been released
    pub fn is_balanced(&self) -> bool {
        self.allocation_count() == self.release_count()
    }
}

/// Tokens held by one action. Released on `release()` or drop, once.
#[derive(Debug)]
pub struct AllocationGuard {
    allocator: Arc<ResourceAllocator>,
    agent_id: String,
    tokens: Vec<String>,
    released: bool,
}

impl AllocationGuard {
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        for token in &self.tokens {
            self.allocator.release(token, &self.agent_id);
        }
        if !self.tokens.is_empty() {
            debug!("{} released {:?}", self.agent_id, self.tokens);
        }
    }
}

impl Drop for AllocationGuard {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_claim_if_absent() {
        let allocator = ResourceAllocator::new();
        allocator.try_claim("resource:R1", "ava").unwrap();

        let err = allocator.try_claim("resource:R1", "bram").unwrap_err();
        assert_eq!(
            err,
            AllocationError::AlreadyHeld {
                token: "resource:R1".into(),
                holder: "ava".into()
            }
        );
        assert_eq!(allocator.holder("resource:R1").as_deref(), Some("ava"));
    }

    #[test]
    fn test_release_only_by_holder() {
        let allocator = ResourceAllocator::new();
        allocator.try_claim("resource:R1", "ava").unwrap();

        assert!(!allocator.release("resource:R1", "bram"));
        assert!(allocator.release("resource:R1", "ava"));
        assert!(!allocator.release("resource:R1", "ava"));
        assert!(allocator.is_idle());
        assert!(allocator.is_balanced());
    }

    #[test]
    fn test_guard_releases_once() {
        let allocator = Arc::new(ResourceAllocator::new());
        let mut guard = allocator
            .claim_all(&tokens(&["resource:R1", "location:bridge"]), "ava")
            .unwrap();
        assert_eq!(allocator.held_tokens(), tokens(&["location:bridge", "resource:R1"]));

        guard.release();
        guard.release();
        drop(guard);

        assert!(allocator.is_idle());
        assert_eq!(allocator.allocation_count(), 2);
        assert_eq!(allocator.release_count(), 2);
    }

    #[test]
    fn test_partial_claim_is_rolled_back() {
        let allocator = Arc::new(ResourceAllocator::new());
        allocator.try_claim("resource:R2", "bram").unwrap();

        let result = allocator.claim_all(&tokens(&["resource:R1", "resource:R2"]), "ava");
        assert!(result.is_err());
        assert_eq!(allocator.holder("resource:R1"), None);
        assert_eq!(allocator.holder("resource:R2").as_deref(), Some("bram"));

        allocator.release("resource:R2", "bram");
        assert!(allocator.is_balanced());
    }

    #[test]
    fn test_dropped_guard_releases() {
        let allocator = Arc::new(ResourceAllocator::new());
        {
            let _guard = allocator.claim_all(&tokens(&["resource:R1"]), "ava").unwrap();
            assert!(!allocator.is_idle());
        }
        assert!(allocator.is_idle());
        assert!(allocator.is_balanced());
    }
}
