// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

//! Deterministic worklist driving both translators.
//!
//! Locations with a single predecessor are appended to the back, merge
//! points go to the front so they are retried as soon as their inputs
//! might be complete. `pop_ready` prefers the first item whose
//! predecessors have all been emitted; when no item qualifies (which
//! happens exactly when the remaining items sit on cycles) it forces the
//! front item so traversal always terminates.

use crate::block_tree::BlockId;
use std::collections::{BTreeSet, VecDeque};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkItem<L> {
    pub loc: L,
    pub block: BlockId,
}

#[derive(Debug, Default)]
pub struct Waitlist<L: Ord + Copy> {
    queue: VecDeque<WorkItem<L>>,
    discovered: BTreeSet<L>,
}

impl<L: Ord + Copy> Waitlist<L> {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            discovered: BTreeSet::new(),
        }
    }

    /// Enqueues `loc` unless it was discovered before. Returns whether the
    /// location was fresh.
    pub fn discover(&mut self, loc: L, block: BlockId, merge_point: bool) -> bool {
        if !self.discovered.insert(loc) {
            return false;
        }
        let item = WorkItem { loc, block };
        if merge_point {
            self.queue.push_front(item);
        } else {
            self.queue.push_back(item);
        }
        true
    }

    pub fn is_discovered(&self, loc: &L) -> bool {
        self.discovered.contains(loc)
    }

    /// Pops the first item for which `ready` holds, or the front item when
    /// none is ready (every remaining item then waits on a cycle).
    pub fn pop_ready(&mut self, mut ready: impl FnMut(&L) -> bool) -> Option<WorkItem<L>> {
        let position = self.queue.iter().position(|item| ready(&item.loc));
        match position {
            Some(index) => self.queue.remove(index),
            None => self.queue.pop_front(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
