// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

//! Read-only program graph model consumed by the C translator.
//!
//! Two graph shapes are supported: a control-flow automaton (CFA), whose
//! nodes are program points and whose edges carry statements, assumptions,
//! declarations and calls; and an abstract reachability graph (ARG) of
//! explored verifier states layered over CFA nodes, with the extra
//! covering/merge relations a verifier produces.
//!
//! The model is constructed once (from the builder API or the JSON loader)
//! and never mutated afterwards; translation runs only read it.

mod arg;
mod cfa;
mod edge;
mod error;
pub mod loader;

pub use arg::{Arg, ArgState, StateId};
pub use cfa::{Cfa, CfaBuilder, CfaNode, Function, FunctionId, NodeId};
pub use edge::{Edge, EdgeId, EdgeKind, VarDecl};
pub use error::ModelError;
