// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Fatal translation failures. Translation is side-effect-free on its input,
/// so none of these leave partial output behind; each names the offending
/// edge, node or state so the caller can point back into the graph.
#[derive(Debug, Error)]
pub enum TranslationError {
    /// The edge references a type upstream parsing could not resolve.
    /// Emitting broken C is never acceptable, so the run aborts.
    #[error("edge {edge} carries an unresolved type; refusing to emit code for it")]
    UnresolvedType { edge: usize },

    /// A call-to-return summary edge reached structural traversal. These are
    /// filtered out before dispatch; seeing one is a contract violation.
    #[error("summary edge {edge} encountered during structural traversal")]
    UnexpectedSummaryEdge { edge: usize },

    /// A function exit node without a return transfer matching the open
    /// call, or with an edge shape the inliner does not recognize.
    #[error("unrecognized function-exit shape at node {node}")]
    UnstructuredFunctionExit { node: usize },

    /// A branching or interprocedural edge nested inside a multi edge.
    #[error("multi edge {edge} contains a non-sequential inner operation")]
    MalformedMultiEdge { edge: usize },

    /// The call graph is cyclic. Inlining every call site independently
    /// cannot terminate on recursion, so this is rejected up front as a
    /// precondition violation instead of looping forever.
    #[error("recursive call graph involving function `{function}`; inlining does not support recursion")]
    RecursiveCall { function: String },

    /// Paths with different inlining frames reconverged at one state.
    #[error("paths with mismatched call frames merge at state {state}")]
    JoinFrameMismatch { state: usize },
}
