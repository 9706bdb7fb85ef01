// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

//! Scope-conflict analysis for ARG translation.
//!
//! Gotos can enter a merge point from blocks with unrelated local
//! declarations of the same name. For every join this pass finds the
//! variables whose live declaration differs between incoming paths; the
//! translator then routes their values through a global shadow temporary
//! (saved before each jump, reassigned after the label) so every path
//! agrees on the value regardless of which block declared the variable.
//!
//! The pass runs over the ARG in topological order before any code is
//! emitted, simulating the same frame discipline the translator applies.

use crate::error::TranslationError;
use cfa_model::{Arg, Cfa, EdgeId, EdgeKind, StateId};
use im::OrdMap;
use std::collections::BTreeMap;

/// Where the live declaration of a name came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum DeclSite {
    /// Declared by edge `edge` in inlining frame `frame`; `index`
    /// disambiguates declarations bundled in one multi edge.
    Edge {
        frame: usize,
        edge: EdgeId,
        index: usize,
    },
    /// Reconciled at an earlier join.
    Join(StateId),
}

/// Declarations visible on one path: name to (site, rendered type).
type Env = OrdMap<String, (DeclSite, String)>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConflictVar {
    pub name: String,
    pub ty: String,
}

/// Result of the pre-pass: per join, the variables needing a shadow.
#[derive(Debug, Default)]
pub struct ScopeAnalysis {
    conflicts: BTreeMap<StateId, Vec<ConflictVar>>,
}

pub fn shadow_name(join: StateId, name: &str) -> String {
    format!("__scope_{}_{}", join, name)
}

impl ScopeAnalysis {
    pub fn conflicts_at(&self, join: StateId) -> &[ConflictVar] {
        self.conflicts.get(&join).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn compute(cfa: &Cfa, arg: &Arg) -> Result<Self, TranslationError> {
        let mut analysis = ScopeAnalysis::default();
        // Inputs reaching each state: (env, frame) per incoming edge.
        let mut inputs: BTreeMap<StateId, Vec<(Env, usize)>> = BTreeMap::new();
        let mut final_env: BTreeMap<StateId, (Env, usize)> = BTreeMap::new();
        // frame -> (caller frame, caller env at the call site).
        let mut call_sites: BTreeMap<usize, (usize, Env)> = BTreeMap::new();
        let mut next_frame = 1usize;

        inputs.insert(arg.root(), vec![(Env::new(), 0)]);

        for state in arg.topological_order() {
            let arrived = inputs.remove(&state).unwrap_or_default();
            let (env, frame) = if arrived.len() <= 1 {
                arrived.into_iter().next().unwrap_or((Env::new(), 0))
            } else {
                merge_inputs(&mut analysis, state, arrived)?
            };

            for (edge_id, child) in &arg.state(state).children {
                let edge = cfa.edge(*edge_id);
                let next = apply_edge(
                    cfa,
                    env.clone(),
                    frame,
                    edge,
                    &mut call_sites,
                    &mut next_frame,
                );
                inputs.entry(*child).or_default().push(next);
            }
            final_env.insert(state, (env, frame));
        }

        // Covered states feed their representative through a goto; compare
        // their environments against the representative's merged one.
        for rep_state in arg.states() {
            let covered = arg.covered_states_of(rep_state.id);
            if covered.is_empty() {
                continue;
            }
            let Some((rep_env, _)) = final_env.get(&rep_state.id).cloned() else {
                continue;
            };
            for covered_id in covered {
                let Some((cov_env, _)) = final_env.get(covered_id) else {
                    continue;
                };
                for (name, (site, ty)) in rep_env.iter() {
                    let differs = matches!(cov_env.get(name), Some((other, _)) if other != site);
                    if differs {
                        analysis.add_conflict(rep_state.id, name, ty);
                    }
                }
            }
        }

        Ok(analysis)
    }

    fn add_conflict(&mut self, join: StateId, name: &str, ty: &str) {
        let list = self.conflicts.entry(join).or_default();
        if !list.iter().any(|c| c.name == name) {
            list.push(ConflictVar {
                name: name.to_string(),
                ty: ty.to_string(),
            });
        }
    }
}

/// Merges the environments of all explicit paths into a join. A name
/// survives the merge only if every path declares it; disagreeing
/// declaration sites become a conflict and are reconciled to the join.
fn merge_inputs(
    analysis: &mut ScopeAnalysis,
    join: StateId,
    arrived: Vec<(Env, usize)>,
) -> Result<(Env, usize), TranslationError> {
    let frame = arrived[0].1;
    if arrived.iter().any(|(_, f)| *f != frame) {
        return Err(TranslationError::JoinFrameMismatch { state: join });
    }

    let mut merged = Env::new();
    let Some((first, rest)) = arrived.split_first() else {
        return Ok((Env::new(), 0));
    };
    for (name, (site, ty)) in first.0.iter() {
        let mut all_present = true;
        let mut all_same = true;
        for (env, _) in rest {
            match env.get(name) {
                None => all_present = false,
                Some((other, _)) if other != site => all_same = false,
                Some(_) => {}
            }
        }
        if !all_present {
            continue;
        }
        if all_same {
            merged.insert(name.clone(), (*site, ty.clone()));
        } else {
            analysis.add_conflict(join, name, ty);
            merged.insert(name.clone(), (DeclSite::Join(join), ty.clone()));
        }
    }
    Ok((merged, frame))
}

/// The environment after traversing one edge.
fn apply_edge(
    cfa: &Cfa,
    mut env: Env,
    frame: usize,
    edge: &cfa_model::Edge,
    call_sites: &mut BTreeMap<usize, (usize, Env)>,
    next_frame: &mut usize,
) -> (Env, usize) {
    match &edge.kind {
        EdgeKind::Declaration { decl, is_global } if !is_global => {
            env.insert(
                decl.name.clone(),
                (
                    DeclSite::Edge {
                        frame,
                        edge: edge.id,
                        index: 0,
                    },
                    decl.ty.clone(),
                ),
            );
            (env, frame)
        }
        EdgeKind::Multi { inner } => {
            for (index, part) in inner.iter().enumerate() {
                if let EdgeKind::Declaration { decl, is_global } = part {
                    if !is_global {
                        env.insert(
                            decl.name.clone(),
                            (
                                DeclSite::Edge {
                                    frame,
                                    edge: edge.id,
                                    index,
                                },
                                decl.ty.clone(),
                            ),
                        );
                    }
                }
            }
            (env, frame)
        }
        EdgeKind::Call { callee, .. } => {
            let new_frame = *next_frame;
            *next_frame += 1;
            call_sites.insert(new_frame, (frame, env.clone()));
            for param in &cfa.function(*callee).params {
                env.insert(
                    param.name.clone(),
                    (
                        DeclSite::Edge {
                            frame: new_frame,
                            edge: edge.id,
                            index: 0,
                        },
                        param.ty.clone(),
                    ),
                );
            }
            (env, new_frame)
        }
        EdgeKind::FunctionReturn { .. } => match call_sites.get(&frame) {
            Some((caller_frame, caller_env)) => (caller_env.clone(), *caller_frame),
            None => (env, frame),
        },
        _ => (env, frame),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfa_model::{ArgState, CfaBuilder, VarDecl};

    // Diamond where both branches declare `x` on distinct edges.
    fn diamond() -> (Cfa, Arg) {
        let mut builder = CfaBuilder::new();
        let main = builder.add_function("main", None, vec![], "void main(void)");
        let nodes: Vec<_> = (0..4).map(|_| builder.add_node(main)).collect();
        builder.set_entry_exit(main, nodes[0], nodes[3]);
        builder.set_entry_function(main);
        let decl = |name: &str| EdgeKind::Declaration {
            decl: VarDecl::new(name, "int", format!("int {}", name)),
            is_global: false,
        };
        let left = builder.add_edge(nodes[0], nodes[1], decl("x"));
        let right = builder.add_edge(nodes[0], nodes[2], decl("x"));
        let join_l = builder.add_edge(nodes[1], nodes[3], EdgeKind::Blank);
        let join_r = builder.add_edge(nodes[2], nodes[3], EdgeKind::Blank);
        let cfa = builder.build().unwrap();

        let states = vec![
            ArgState {
                id: 0,
                node: 0,
                children: vec![(left, 1), (right, 2)],
                covered_by: None,
                is_target: false,
            },
            ArgState {
                id: 1,
                node: 1,
                children: vec![(join_l, 3)],
                covered_by: None,
                is_target: false,
            },
            ArgState {
                id: 2,
                node: 2,
                children: vec![(join_r, 3)],
                covered_by: None,
                is_target: false,
            },
            ArgState {
                id: 3,
                node: 3,
                children: vec![],
                covered_by: None,
                is_target: false,
            },
        ];
        (cfa, Arg::new(states, 0).unwrap())
    }

    #[test]
    fn diverging_declarations_conflict_at_the_join() {
        let (cfa, arg) = diamond();
        let analysis = ScopeAnalysis::compute(&cfa, &arg).unwrap();
        assert_eq!(
            analysis.conflicts_at(3),
            &[ConflictVar {
                name: "x".to_string(),
                ty: "int".to_string(),
            }]
        );
        assert_eq!(shadow_name(3, "x"), "__scope_3_x");
    }

    #[test]
    fn shared_declarations_do_not_conflict() {
        // Declare x before the split; both paths see the same site.
        let mut builder = CfaBuilder::new();
        let main = builder.add_function("main", None, vec![], "void main(void)");
        let nodes: Vec<_> = (0..5).map(|_| builder.add_node(main)).collect();
        builder.set_entry_exit(main, nodes[0], nodes[4]);
        builder.set_entry_function(main);
        let decl = builder.add_edge(
            nodes[0],
            nodes[1],
            EdgeKind::Declaration {
                decl: VarDecl::new("x", "int", "int x"),
                is_global: false,
            },
        );
        let left = builder.add_edge(nodes[1], nodes[2], EdgeKind::Blank);
        let right = builder.add_edge(nodes[1], nodes[3], EdgeKind::Blank);
        let jl = builder.add_edge(nodes[2], nodes[4], EdgeKind::Blank);
        let jr = builder.add_edge(nodes[3], nodes[4], EdgeKind::Blank);
        let cfa = builder.build().unwrap();

        let state = |id, node, children| ArgState {
            id,
            node,
            children,
            covered_by: None,
            is_target: false,
        };
        let states = vec![
            state(0, 0, vec![(decl, 1)]),
            state(1, 1, vec![(left, 2), (right, 3)]),
            state(2, 2, vec![(jl, 4)]),
            state(3, 3, vec![(jr, 4)]),
            state(4, 4, vec![]),
        ];
        let arg = Arg::new(states, 0).unwrap();
        let analysis = ScopeAnalysis::compute(&cfa, &arg).unwrap();
        assert!(analysis.conflicts_at(4).is_empty());
    }
}
