// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

use crate::edge::{Edge, EdgeId, EdgeKind, VarDecl};
use crate::error::ModelError;
use serde::{Deserialize, Serialize};

pub type NodeId = usize;
pub type FunctionId = usize;

/// A program point.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CfaNode {
    pub id: NodeId,
    pub function: FunctionId,
    /// Marked by external loop analysis; enables `while` structuring.
    #[serde(default)]
    pub is_loop_head: bool,
    /// Original C label at this point, re-emitted verbatim.
    #[serde(default)]
    pub label: Option<String>,
}

/// A function of the analyzed program.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Function {
    pub id: FunctionId,
    pub name: String,
    /// Rendered return type, `None` for `void`.
    pub return_type: Option<String>,
    pub params: Vec<VarDecl>,
    pub entry: NodeId,
    pub exit: NodeId,
    /// Rendered definition header, e.g. `int main(void)`.
    pub signature: String,
}

impl Function {
    pub fn returns_value(&self) -> bool {
        self.return_type.is_some()
    }
}

/// A control-flow automaton: program points connected by typed edges.
/// Read-only after construction; adjacency lists are kept sorted by edge id
/// so traversal order never depends on insertion order.
#[derive(Clone, Debug)]
pub struct Cfa {
    nodes: Vec<CfaNode>,
    edges: Vec<Edge>,
    functions: Vec<Function>,
    entry_function: FunctionId,
    outgoing: Vec<Vec<EdgeId>>,
    incoming: Vec<Vec<EdgeId>>,
}

impl Cfa {
    pub fn node(&self, id: NodeId) -> &CfaNode {
        &self.nodes[id]
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id]
    }

    pub fn function(&self, id: FunctionId) -> &Function {
        &self.functions[id]
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn entry_function(&self) -> &Function {
        &self.functions[self.entry_function]
    }

    /// All outgoing edge ids of `node`, sorted.
    pub fn outgoing(&self, node: NodeId) -> &[EdgeId] {
        &self.outgoing[node]
    }

    /// All incoming edge ids of `node`, sorted.
    pub fn incoming(&self, node: NodeId) -> &[EdgeId] {
        &self.incoming[node]
    }

    /// Number of intraprocedural predecessors of `node`. Call, return and
    /// summary edges cross function boundaries and do not count: within one
    /// inlining frame only same-function flow can reconverge.
    pub fn intra_pred_count(&self, node: NodeId) -> usize {
        self.incoming[node]
            .iter()
            .filter(|e| !self.edges[**e].kind.is_interprocedural())
            .count()
    }

    /// The function-exit node of the function containing `node`.
    pub fn exit_of(&self, node: NodeId) -> NodeId {
        self.functions[self.nodes[node].function].exit
    }

    pub fn is_function_exit(&self, node: NodeId) -> bool {
        self.exit_of(node) == node
    }
}

/// Incremental CFA construction with validation on `build`.
#[derive(Default)]
pub struct CfaBuilder {
    nodes: Vec<CfaNode>,
    edges: Vec<Edge>,
    functions: Vec<Function>,
    entry_function: Option<FunctionId>,
}

impl CfaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_function(
        &mut self,
        name: impl Into<String>,
        return_type: Option<String>,
        params: Vec<VarDecl>,
        signature: impl Into<String>,
    ) -> FunctionId {
        let id = self.functions.len();
        self.functions.push(Function {
            id,
            name: name.into(),
            return_type,
            params,
            // Patched in add_node via entry/exit setters below.
            entry: usize::MAX,
            exit: usize::MAX,
            signature: signature.into(),
        });
        if self.entry_function.is_none() {
            self.entry_function = Some(id);
        }
        id
    }

    pub fn add_node(&mut self, function: FunctionId) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(CfaNode {
            id,
            function,
            is_loop_head: false,
            label: None,
        });
        id
    }

    pub fn mark_loop_head(&mut self, node: NodeId) {
        self.nodes[node].is_loop_head = true;
    }

    pub fn set_label(&mut self, node: NodeId, label: impl Into<String>) {
        self.nodes[node].label = Some(label.into());
    }

    pub fn set_entry_exit(&mut self, function: FunctionId, entry: NodeId, exit: NodeId) {
        self.functions[function].entry = entry;
        self.functions[function].exit = exit;
    }

    pub fn set_entry_function(&mut self, function: FunctionId) {
        self.entry_function = Some(function);
    }

    pub fn add_edge(&mut self, source: NodeId, target: NodeId, kind: EdgeKind) -> EdgeId {
        let id = self.edges.len();
        self.edges.push(Edge {
            id,
            source,
            target,
            kind,
            problem_type: false,
        });
        id
    }

    pub fn mark_problem_type(&mut self, edge: EdgeId) {
        self.edges[edge].problem_type = true;
    }

    pub fn build(self) -> Result<Cfa, ModelError> {
        Cfa::from_parts(
            self.nodes,
            self.edges,
            self.functions,
            self.entry_function.unwrap_or(0),
        )
    }
}

impl Cfa {
    /// Assembles a CFA from fully described parts, validating every
    /// cross-reference. Ids must match positions.
    pub fn from_parts(
        nodes: Vec<CfaNode>,
        edges: Vec<Edge>,
        functions: Vec<Function>,
        entry_function: FunctionId,
    ) -> Result<Cfa, ModelError> {
        let node_count = nodes.len();
        for node in &nodes {
            if node.function >= functions.len() {
                return Err(ModelError::DanglingFunction {
                    node: node.id,
                    function: node.function,
                });
            }
        }
        for edge in &edges {
            for endpoint in [edge.source, edge.target] {
                if endpoint >= node_count {
                    return Err(ModelError::DanglingNode {
                        edge: edge.id,
                        node: endpoint,
                    });
                }
            }
            if let EdgeKind::Call { callee, .. } = &edge.kind {
                if *callee >= functions.len() {
                    return Err(ModelError::DanglingCallee {
                        edge: edge.id,
                        callee: *callee,
                    });
                }
            }
        }
        for function in &functions {
            if function.entry == usize::MAX || function.entry >= node_count {
                return Err(ModelError::MissingEntry { function: function.id });
            }
        }

        let mut outgoing = vec![Vec::new(); node_count];
        let mut incoming = vec![Vec::new(); node_count];
        for edge in &edges {
            outgoing[edge.source].push(edge.id);
            incoming[edge.target].push(edge.id);
        }
        for list in outgoing.iter_mut().chain(incoming.iter_mut()) {
            list.sort_unstable();
        }

        Ok(Cfa {
            nodes,
            edges,
            entry_function,
            functions,
            outgoing,
            incoming,
        })
    }
}
