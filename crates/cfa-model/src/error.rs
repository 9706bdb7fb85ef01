// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Errors raised while constructing or validating a program graph.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("edge {edge} references unknown node {node}")]
    DanglingNode { edge: usize, node: usize },

    #[error("node {node} references unknown function {function}")]
    DanglingFunction { node: usize, function: usize },

    #[error("call edge {edge} references unknown callee function {callee}")]
    DanglingCallee { edge: usize, callee: usize },

    #[error("state {state} references unknown CFA node {node}")]
    DanglingStateNode { state: usize, node: usize },

    #[error("state {state} references unknown child state {child}")]
    DanglingChildState { state: usize, child: usize },

    #[error("covering relation contains a cycle through state {state}")]
    CyclicCovering { state: usize },

    #[error("covered state {state} still has {children} child edge(s)")]
    CoveredStateWithChildren { state: usize, children: usize },

    #[error("state graph contains a cycle (not representable as an ARG)")]
    CyclicStateGraph,

    #[error("function {function} has no entry node")]
    MissingEntry { function: usize },

    #[error("{what} id {id} does not match its position {position}")]
    MisplacedId {
        what: &'static str,
        id: usize,
        position: usize,
    },

    #[error("failed to parse graph description: {0}")]
    Parse(#[from] serde_json::Error),
}
