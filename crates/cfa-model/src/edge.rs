// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

pub type EdgeId = usize;

/// A variable declaration as rendered by the upstream AST layer.
///
/// `text` is the full declaration source without the trailing semicolon
/// (e.g. `int x = 0`); `name` and `ty` are exposed separately so the
/// translator can synthesize shadow temporaries of the same type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarDecl {
    pub name: String,
    pub ty: String,
    pub text: String,
}

impl VarDecl {
    pub fn new(name: impl Into<String>, ty: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            text: text.into(),
        }
    }
}

/// The payload of a CFA edge. All expression/statement content arrives
/// pre-rendered as source text; the translator never inspects expression
/// structure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EdgeKind {
    /// No operation; connects program points without emitting code.
    Blank,

    /// A plain statement, e.g. `y = 1`.
    Statement { text: String },

    /// One branch of a conditional. `truth` is the assumed value of the
    /// condition on this edge; `swapped` records whether the parser flipped
    /// the operand order. The canonical "true" edge of a pair satisfies
    /// `truth != swapped`.
    Assume {
        condition: String,
        truth: bool,
        swapped: bool,
    },

    /// A variable declaration, global or local.
    Declaration { decl: VarDecl, is_global: bool },

    /// A `return e;` statement edge into the enclosing function's exit node.
    ReturnStatement { expr: Option<String> },

    /// A function call; the edge target is the callee's entry node.
    /// Actual arguments are rendered expressions, paired positionally with
    /// the callee's formal parameters.
    Call {
        callee: usize,
        arguments: Vec<String>,
    },

    /// The return transfer from a callee exit node back to the node after
    /// the call site. `call_edge` identifies the matching call,
    /// `assign_to` the caller-side LHS receiving the return value, if any.
    FunctionReturn {
        call_edge: EdgeId,
        assign_to: Option<String>,
    },

    /// The call-to-return shortcut edge parallel to a call. Never legal
    /// during structural traversal.
    Summary { call_edge: EdgeId },

    /// An ordered bundle of simple operations with no branching inside.
    Multi { inner: Vec<EdgeKind> },
}

impl EdgeKind {
    pub fn is_assume(&self) -> bool {
        matches!(self, EdgeKind::Assume { .. })
    }

    pub fn is_interprocedural(&self) -> bool {
        matches!(
            self,
            EdgeKind::Call { .. } | EdgeKind::FunctionReturn { .. } | EdgeKind::Summary { .. }
        )
    }
}

/// A directed, typed edge between two CFA nodes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: usize,
    pub target: usize,
    #[serde(flatten)]
    pub kind: EdgeKind,
    /// Set when the edge references a type upstream parsing failed to
    /// resolve. Consuming such an edge aborts translation.
    #[serde(default)]
    pub problem_type: bool,
}
