// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

//! Translation of control-flow automata and abstract reachability graphs
//! back into compilable C.
//!
//! Two entry points share one machinery: [`translate_cfa`] re-emits a whole
//! program (all calls inlined into the entry function), while
//! [`translate_arg`] emits the explored state space of a verification run,
//! with covered states closed by gotos and property violations marked
//! according to [`TargetStrategy`].

mod arg;
mod block_tree;
mod branch;
mod cfa;
mod context;
mod error;
mod inline;
mod options;
mod render;
mod scheduler;
mod scope;
mod target;
mod writer;

pub use arg::{translate_arg, translate_arg_with_markers};
pub use cfa::{translate_cfa, translate_cfa_restricted};
pub use error::TranslationError;
pub use options::{FunctionEndTreatment, TargetStrategy, TranslatorOptions};
