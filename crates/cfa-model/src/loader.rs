// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

//! JSON graph descriptions.
//!
//! The on-disk format mirrors the in-memory model one to one: a list of
//! functions, nodes and edges (edges internally tagged by `kind`), plus an
//! optional ARG section. Ids are positional: the id of every element must
//! equal its index in its list.

use crate::arg::{Arg, ArgState, StateId};
use crate::cfa::{Cfa, CfaNode, Function, FunctionId};
use crate::edge::Edge;
use crate::error::ModelError;
use serde::{Deserialize, Serialize};

/// Raw ARG section of a graph description.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArgDescription {
    pub root: StateId,
    pub states: Vec<ArgState>,
}

/// Raw top-level graph description.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgramDescription {
    #[serde(default)]
    pub entry_function: FunctionId,
    pub functions: Vec<Function>,
    pub nodes: Vec<CfaNode>,
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub arg: Option<ArgDescription>,
}

/// A fully validated program graph: the CFA plus the explored ARG, when the
/// description carries one.
#[derive(Clone, Debug)]
pub struct Program {
    pub cfa: Cfa,
    pub arg: Option<Arg>,
}

/// Parses and validates a JSON graph description.
pub fn load_program(json: &str) -> Result<Program, ModelError> {
    let description: ProgramDescription = serde_json::from_str(json)?;
    build_program(description)
}

/// Validates an already parsed description.
pub fn build_program(description: ProgramDescription) -> Result<Program, ModelError> {
    let ProgramDescription {
        entry_function,
        functions,
        nodes,
        edges,
        arg,
    } = description;

    check_positional_ids(nodes.iter().map(|n| n.id), "node")?;
    check_positional_ids(edges.iter().map(|e| e.id), "edge")?;
    check_positional_ids(functions.iter().map(|f| f.id), "function")?;

    let cfa = Cfa::from_parts(nodes, edges, functions, entry_function)?;
    let arg = match arg {
        Some(description) => {
            check_positional_ids(description.states.iter().map(|s| s.id), "state")?;
            for state in &description.states {
                if state.node >= cfa.node_count() {
                    return Err(ModelError::DanglingStateNode {
                        state: state.id,
                        node: state.node,
                    });
                }
            }
            Some(Arg::new(description.states, description.root)?)
        }
        None => None,
    };

    log::debug!(
        "loaded program graph: {} functions, {} nodes, arg: {}",
        cfa.functions().len(),
        cfa.node_count(),
        arg.is_some()
    );
    Ok(Program { cfa, arg })
}

fn check_positional_ids(
    ids: impl Iterator<Item = usize>,
    what: &'static str,
) -> Result<(), ModelError> {
    for (position, id) in ids.enumerate() {
        if position != id {
            return Err(ModelError::MisplacedId { what, id, position });
        }
    }
    Ok(())
}
