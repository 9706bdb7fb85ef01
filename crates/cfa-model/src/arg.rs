// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

use crate::edge::EdgeId;
use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

pub type StateId = usize;

/// An explored verifier state over a CFA node.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArgState {
    pub id: StateId,
    /// The program point this state abstracts.
    pub node: usize,
    /// Child states with the CFA edge that led to each, sorted by edge id.
    pub children: Vec<(EdgeId, StateId)>,
    /// States subsuming this one. A covered state has no children; flow
    /// reaching it is redirected to the covering representative via goto.
    #[serde(default)]
    pub covered_by: Option<StateId>,
    /// Reaches a checked property violation.
    #[serde(default)]
    pub is_target: bool,
}

/// An abstract reachability graph: a rooted DAG of states with an acyclic
/// covering relation, both validated at construction rather than defended by
/// runtime assertions.
#[derive(Clone, Debug)]
pub struct Arg {
    states: Vec<ArgState>,
    root: StateId,
    parents: Vec<Vec<StateId>>,
    /// representative -> states it covers, sorted.
    covering_targets: BTreeMap<StateId, Vec<StateId>>,
    /// Transitive covering representative per covered state.
    representative: BTreeMap<StateId, StateId>,
}

impl Arg {
    pub fn new(mut states: Vec<ArgState>, root: StateId) -> Result<Self, ModelError> {
        for state in &mut states {
            state.children.sort_unstable();
        }

        for state in &states {
            if let Some(cov) = state.covered_by {
                if cov >= states.len() {
                    return Err(ModelError::DanglingChildState {
                        state: state.id,
                        child: cov,
                    });
                }
                if !state.children.is_empty() {
                    return Err(ModelError::CoveredStateWithChildren {
                        state: state.id,
                        children: state.children.len(),
                    });
                }
            }
        }

        // Resolve every covering chain to its final representative up front.
        // A chain revisiting a state is a cycle and is rejected outright; the
        // source of this design only caught that case with a debug assertion.
        let mut representative = BTreeMap::new();
        for state in &states {
            if state.covered_by.is_none() {
                continue;
            }
            let mut seen = BTreeSet::new();
            let mut current = state.id;
            while let Some(next) = states[current].covered_by {
                if !seen.insert(current) {
                    return Err(ModelError::CyclicCovering { state: state.id });
                }
                current = next;
            }
            representative.insert(state.id, current);
        }

        let mut parents = vec![Vec::new(); states.len()];
        for state in &states {
            for (_, child) in &state.children {
                if *child >= states.len() {
                    return Err(ModelError::DanglingChildState {
                        state: state.id,
                        child: *child,
                    });
                }
                parents[*child].push(state.id);
            }
        }
        for list in parents.iter_mut() {
            list.sort_unstable();
            list.dedup();
        }

        // Kahn's algorithm: the parent/child relation must be a DAG. Cycles
        // belong in the covering relation, never in the explicit graph.
        let mut indegree: Vec<usize> = parents.iter().map(|p| p.len()).collect();
        let mut queue: VecDeque<StateId> = indegree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(s, _)| s)
            .collect();
        let mut visited = 0usize;
        while let Some(state) = queue.pop_front() {
            visited += 1;
            for (_, child) in &states[state].children {
                indegree[*child] -= 1;
                if indegree[*child] == 0 {
                    queue.push_back(*child);
                }
            }
        }
        if visited != states.len() {
            return Err(ModelError::CyclicStateGraph);
        }

        let mut covering_targets: BTreeMap<StateId, Vec<StateId>> = BTreeMap::new();
        for (covered, rep) in &representative {
            covering_targets.entry(*rep).or_default().push(*covered);
        }

        Ok(Self {
            states,
            root,
            parents,
            covering_targets,
            representative,
        })
    }

    pub fn root(&self) -> StateId {
        self.root
    }

    pub fn state(&self, id: StateId) -> &ArgState {
        &self.states[id]
    }

    pub fn states(&self) -> &[ArgState] {
        &self.states
    }

    pub fn parents(&self, id: StateId) -> &[StateId] {
        &self.parents[id]
    }

    pub fn is_covered(&self, id: StateId) -> bool {
        self.states[id].covered_by.is_some()
    }

    /// The final representative of a covered state's covering chain.
    pub fn covering_representative(&self, id: StateId) -> Option<StateId> {
        self.representative.get(&id).copied()
    }

    /// States redirected into `id` by covering, if any.
    pub fn covered_states_of(&self, id: StateId) -> &[StateId] {
        self.covering_targets.get(&id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// A join is reached by more than one explicit path or is the
    /// redirect target of at least one covered state.
    pub fn is_join(&self, id: StateId) -> bool {
        self.parents[id].len() > 1 || self.covering_targets.contains_key(&id)
    }

    /// State ids in a topological order of the parent/child relation.
    /// Construction guarantees the relation is a DAG.
    pub fn topological_order(&self) -> Vec<StateId> {
        let mut indegree: Vec<usize> = self.parents.iter().map(|p| p.len()).collect();
        let mut queue: VecDeque<StateId> = indegree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(s, _)| s)
            .collect();
        let mut order = Vec::with_capacity(self.states.len());
        while let Some(state) = queue.pop_front() {
            order.push(state);
            for (_, child) in &self.states[state].children {
                indegree[*child] -= 1;
                if indegree[*child] == 0 {
                    queue.push_back(*child);
                }
            }
        }
        order
    }
}
