//! Spawn budget and depth ceiling for one reaction.

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

use crate::domain::errors::{ReactorError, ReactorResult};

/// Counters enforced against the reaction's ceilings.
///
/// The spawn counter is reserved with a single compare-and-swap, so
/// concurrent siblings can never push it past `max_agents`.
#[derive(Debug)]
pub struct ResourceGovernor {
    max_agents: usize,
    max_depth: usize,
    spawned: AtomicUsize,
    max_depth_reached: AtomicUsize,
}

impl ResourceGovernor {
    pub const fn new(max_agents: usize, max_depth: usize) -> Self {
        Self {
            max_agents,
            max_depth,
            spawned: AtomicUsize::new(0),
            max_depth_reached: AtomicUsize::new(0),
        }
    }

    /// Reserve one unit of spawn budget, returning the new count.
    pub fn try_reserve(&self) -> ReactorResult<usize> {
        self.spawned
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                (count < self.max_agents).then_some(count + 1)
            })
            .map(|previous| previous + 1)
            .map_err(|spawned| {
                debug!(spawned, max = self.max_agents, "spawn budget exhausted");
                ReactorError::ResourceExhausted {
                    spawned,
                    max: self.max_agents,
                }
            })
    }

    /// Give back a reservation whose agent never made it into the registry.
    pub fn release(&self) {
        let _ = self
            .spawned
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| count.checked_sub(1));
    }

    /// Check a prospective agent depth against the ceiling.
    pub const fn check_depth(&self, depth: usize) -> ReactorResult<()> {
        if depth > self.max_depth {
            return Err(ReactorError::DepthExceeded {
                depth,
                max: self.max_depth,
            });
        }
        Ok(())
    }

    pub fn record_depth(&self, depth: usize) {
        self.max_depth_reached.fetch_max(depth, Ordering::AcqRel);
    }

    pub fn has_capacity(&self) -> bool {
        self.spawned() < self.max_agents
    }

    /// Whether an agent at `depth` may still have children.
    pub const fn allows_children_at(&self, depth: usize) -> bool {
        depth < self.max_depth
    }

    pub fn spawned(&self) -> usize {
        self.spawned.load(Ordering::Acquire)
    }

    pub fn max_depth_reached(&self) -> usize {
        self.max_depth_reached.load(Ordering::Acquire)
    }

    pub const fn max_agents(&self) -> usize {
        self.max_agents
    }

    pub const fn max_depth(&self) -> usize {
        self.max_depth
    }
}
