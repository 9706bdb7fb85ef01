// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

//! Call inlining. Every call site becomes a nested block holding the
//! callee's body; frames keep the instances apart and return values travel
//! through per-frame temporaries.

use crate::block_tree::BlockId;
use crate::context::TranslationContext;
use crate::error::TranslationError;
use cfa_model::{Cfa, Edge, EdgeId, EdgeKind, NodeId};
use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};

/// Rejects CFAs whose call graph is cyclic. Frames are opened per call
/// site, so recursion would unfold forever.
pub fn check_no_recursion(cfa: &Cfa) -> Result<(), TranslationError> {
    let mut graph: DiGraph<(), ()> = DiGraph::new();
    let indices: Vec<NodeIndex> = cfa.functions().iter().map(|_| graph.add_node(())).collect();
    for edge in cfa.edges() {
        if let EdgeKind::Call { callee, .. } = &edge.kind {
            let caller = cfa.node(edge.source).function;
            graph.add_edge(indices[caller], indices[*callee], ());
        }
    }
    for component in kosaraju_scc(&graph) {
        let cyclic = component.len() > 1
            || graph.find_edge(component[0], component[0]).is_some();
        if cyclic {
            let function = indices
                .iter()
                .position(|ix| *ix == component[0])
                .unwrap_or(0);
            return Err(TranslationError::RecursiveCall {
                function: cfa.function(function).name.clone(),
            });
        }
    }
    Ok(())
}

/// Opens an inlined call: creates the callee block nested in `block`,
/// registers a fresh frame and emits the two-phase argument copy. Phase one
/// evaluates every actual into a temporary before phase two binds the
/// formals, so formals shadowing caller variables cannot corrupt actuals
/// that still mention them.
pub fn open_call(
    ctx: &mut TranslationContext<'_>,
    cfa: &Cfa,
    caller_frame: usize,
    edge: &Edge,
    block: BlockId,
) -> Result<(usize, BlockId), TranslationError> {
    let (callee, arguments) = match &edge.kind {
        EdgeKind::Call { callee, arguments } => (*callee, arguments),
        _ => return Err(TranslationError::MalformedMultiEdge { edge: edge.id }),
    };
    if edge.problem_type {
        return Err(TranslationError::UnresolvedType { edge: edge.id });
    }

    let body = ctx.arena.new_child(block);
    let frame = ctx.open_frame(caller_frame, callee, edge.id, block);

    let params = cfa.function(callee).params.clone();
    let mut temps = Vec::with_capacity(params.len());
    for (param, actual) in params.iter().zip(arguments) {
        let temp = ctx.fresh_temp();
        ctx.arena
            .push_edge_text(body, format!("{} {};", param.ty, temp), edge.id);
        ctx.arena
            .push_edge_text(body, format!("{} = {};", temp, actual), edge.id);
        temps.push(temp);
    }
    for (param, temp) in params.iter().zip(&temps) {
        ctx.arena
            .push_edge_text(body, format!("{};", param.text), edge.id);
        ctx.arena
            .push_edge_text(body, format!("{} = {};", param.name, temp), edge.id);
    }
    Ok((frame, body))
}

/// What `close_call` resolved at a callee exit node.
pub struct CallReturn {
    pub caller_frame: usize,
    pub resume_block: BlockId,
    /// Caller-side node after the call site.
    pub resume_node: NodeId,
    /// The FunctionReturn edge that was consumed.
    pub return_edge: EdgeId,
}

/// Closes the frame open at a callee exit node: finds the return transfer
/// matching the frame's call edge, performs the caller-side assignment and
/// picks the block where caller flow resumes.
pub fn close_call(
    ctx: &mut TranslationContext<'_>,
    cfa: &Cfa,
    frame: usize,
    exit_node: NodeId,
    current_block: BlockId,
) -> Result<CallReturn, TranslationError> {
    let call_edge = ctx
        .frame(frame)
        .call_edge
        .ok_or(TranslationError::UnstructuredFunctionExit { node: exit_node })?;
    let caller_frame = ctx
        .frame(frame)
        .caller
        .ok_or(TranslationError::UnstructuredFunctionExit { node: exit_node })?;
    let caller_block = ctx
        .frame(frame)
        .caller_block
        .ok_or(TranslationError::UnstructuredFunctionExit { node: exit_node })?;

    let return_edge = cfa
        .outgoing(exit_node)
        .iter()
        .map(|id| cfa.edge(*id))
        .find(|e| matches!(e.kind, EdgeKind::FunctionReturn { call_edge: c, .. } if c == call_edge))
        .ok_or(TranslationError::UnstructuredFunctionExit { node: exit_node })?;

    let resume_block = match ctx.options.function_end {
        crate::options::FunctionEndTreatment::CloseBlock => caller_block,
        crate::options::FunctionEndTreatment::AddNewBlock => ctx.arena.new_child(caller_block),
        crate::options::FunctionEndTreatment::KeepBlock => current_block,
    };

    if let EdgeKind::FunctionReturn {
        assign_to: Some(lhs),
        ..
    } = &return_edge.kind
    {
        if ctx.return_written(frame) {
            let function = cfa.function(ctx.frame(frame).function);
            if let Some(temp) = ctx.return_temp(frame, function) {
                ctx.arena
                    .push_edge_text(resume_block, format!("{} = {};", lhs, temp), return_edge.id);
            }
        }
    }

    Ok(CallReturn {
        caller_frame,
        resume_block,
        resume_node: return_edge.target,
        return_edge: return_edge.id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::TranslatorOptions;
    use cfa_model::{CfaBuilder, VarDecl};

    fn recursive_cfa(direct: bool) -> Cfa {
        let mut builder = CfaBuilder::new();
        let main = builder.add_function("main", None, vec![], "void main(void)");
        let helper = builder.add_function("spin", None, vec![], "void spin(void)");
        let m0 = builder.add_node(main);
        let m1 = builder.add_node(main);
        let h0 = builder.add_node(helper);
        let h1 = builder.add_node(helper);
        builder.set_entry_exit(main, m0, m1);
        builder.set_entry_exit(helper, h0, h1);
        builder.set_entry_function(main);
        builder.add_edge(
            m0,
            h0,
            EdgeKind::Call {
                callee: 1,
                arguments: vec![],
            },
        );
        let callee = if direct { 1 } else { 0 };
        builder.add_edge(
            h0,
            if direct { h0 } else { m0 },
            EdgeKind::Call {
                callee,
                arguments: vec![],
            },
        );
        builder.build().unwrap()
    }

    #[test]
    fn direct_recursion_is_rejected() {
        let err = check_no_recursion(&recursive_cfa(true)).unwrap_err();
        assert!(matches!(
            err,
            TranslationError::RecursiveCall { ref function } if function == "spin"
        ));
    }

    #[test]
    fn mutual_recursion_is_rejected() {
        assert!(check_no_recursion(&recursive_cfa(false)).is_err());
    }

    #[test]
    fn argument_copy_is_two_phase() {
        let mut builder = CfaBuilder::new();
        let main = builder.add_function("main", None, vec![], "void main(void)");
        let callee = builder.add_function(
            "inc",
            Some("int".to_string()),
            vec![VarDecl::new("x", "int", "int x")],
            "int inc(int x)",
        );
        let m0 = builder.add_node(main);
        let m1 = builder.add_node(main);
        let c0 = builder.add_node(callee);
        let c1 = builder.add_node(callee);
        builder.set_entry_exit(main, m0, m1);
        builder.set_entry_exit(callee, c0, c1);
        builder.set_entry_function(main);
        let call = builder.add_edge(
            m0,
            c0,
            EdgeKind::Call {
                callee: 1,
                arguments: vec!["x + 1".to_string()],
            },
        );
        let cfa = builder.build().unwrap();

        let options = TranslatorOptions::default();
        let mut ctx = TranslationContext::new(&options, 0);
        let root = ctx.arena.new_root();
        let edge = cfa.edge(call).clone();
        let (frame, body) = open_call(&mut ctx, &cfa, 0, &edge, root).unwrap();
        assert_eq!(frame, 1);

        let texts: Vec<String> = ctx
            .arena
            .block(body)
            .entries
            .iter()
            .filter_map(|s| match s {
                crate::block_tree::Statement::Simple { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(
            texts,
            vec![
                "int __tmp_0;",
                "__tmp_0 = x + 1;",
                "int x;",
                "x = __tmp_0;",
            ]
        );
    }
}
