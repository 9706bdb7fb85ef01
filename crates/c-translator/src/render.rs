// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

//! Rendering of sequential edge operations into statements.
//!
//! Branching (assume) and interprocedural edges never reach this module;
//! the translators route those through `branch` and `inline`.

use crate::block_tree::BlockId;
use crate::context::TranslationContext;
use crate::error::TranslationError;
use cfa_model::{Cfa, Edge, EdgeKind, VarDecl};

/// Emits the statements of a sequential edge into `block`, on behalf of
/// inlining frame `frame`.
pub fn emit_edge(
    ctx: &mut TranslationContext<'_>,
    cfa: &Cfa,
    frame: usize,
    edge: &Edge,
    block: BlockId,
) -> Result<(), TranslationError> {
    if edge.problem_type {
        return Err(TranslationError::UnresolvedType { edge: edge.id });
    }
    emit_kind(ctx, cfa, frame, edge, &edge.kind, true, block)
}

fn emit_kind(
    ctx: &mut TranslationContext<'_>,
    cfa: &Cfa,
    frame: usize,
    edge: &Edge,
    kind: &EdgeKind,
    top_level: bool,
    block: BlockId,
) -> Result<(), TranslationError> {
    match kind {
        EdgeKind::Blank => {}
        EdgeKind::Statement { text } => {
            ctx.arena.push_edge_text(block, format!("{};", text), edge.id);
        }
        EdgeKind::Declaration { decl, is_global } => {
            emit_declaration(ctx, edge, decl, *is_global, block);
        }
        EdgeKind::ReturnStatement { expr } => {
            emit_return(ctx, cfa, frame, edge, expr.as_deref(), block);
        }
        EdgeKind::Multi { inner } if top_level => {
            for part in inner {
                match part {
                    EdgeKind::Blank
                    | EdgeKind::Statement { .. }
                    | EdgeKind::Declaration { .. }
                    | EdgeKind::ReturnStatement { .. } => {
                        emit_kind(ctx, cfa, frame, edge, part, false, block)?;
                    }
                    _ => return Err(TranslationError::MalformedMultiEdge { edge: edge.id }),
                }
            }
        }
        // A nested multi, or an assume / interprocedural edge that the
        // caller failed to filter out.
        _ => return Err(TranslationError::MalformedMultiEdge { edge: edge.id }),
    }
    Ok(())
}

fn emit_declaration(
    ctx: &mut TranslationContext<'_>,
    edge: &Edge,
    decl: &VarDecl,
    is_global: bool,
    block: BlockId,
) {
    if is_global {
        ctx.add_global(format!("{};", decl.text));
    } else {
        ctx.arena
            .push_edge_text(block, format!("{};", decl.text), edge.id);
    }
}

/// A return statement stores its value into the frame's return temporary;
/// the actual transfer of control is handled at the function exit node.
fn emit_return(
    ctx: &mut TranslationContext<'_>,
    cfa: &Cfa,
    frame: usize,
    edge: &Edge,
    expr: Option<&str>,
    block: BlockId,
) {
    let function = cfa.function(ctx.frame(frame).function);
    if let (Some(expr), true) = (expr, function.returns_value()) {
        if let Some(temp) = ctx.return_temp(frame, function) {
            ctx.arena
                .push_edge_text(block, format!("{} = {};", temp, expr), edge.id);
        }
    }
}
