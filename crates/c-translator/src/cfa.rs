// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

//! Whole-program CFA translation.
//!
//! Produces a single C function, the entry function with every call
//! inlined. Traversal is frame-qualified: the same CFA node visited under
//! two call sites is two distinct locations with distinct labels. Cycles
//! are closed with gotos, or with `while` loops at marked loop heads when
//! structuring is enabled.

use crate::block_tree::{BlockId, Statement};
use crate::branch::{self, BranchShape};
use crate::context::TranslationContext;
use crate::error::TranslationError;
use crate::inline;
use crate::options::TranslatorOptions;
use crate::render;
use crate::scheduler::Waitlist;
use crate::writer;
use cfa_model::{Cfa, Edge, EdgeKind, NodeId};
use itertools::{Itertools, Position};
use std::collections::{BTreeMap, BTreeSet};

pub(crate) const NONDET_HELPER: &str = "extern int __VERIFIER_nondet_int(void);";
pub(crate) const ASSUME_HELPER: &str = "extern void __VERIFIER_assume(int);";

/// A program point under a specific inlining frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Loc {
    frame: usize,
    node: NodeId,
}

/// Translates the whole CFA, starting at its entry function.
pub fn translate_cfa(cfa: &Cfa, options: &TranslatorOptions) -> Result<String, TranslationError> {
    Translator::new(cfa, options, None).run()
}

/// Translates only the subgraph induced by `nodes`. Edges leaving the set
/// are dropped; locations left without successors return instead.
pub fn translate_cfa_restricted(
    cfa: &Cfa,
    options: &TranslatorOptions,
    nodes: &BTreeSet<NodeId>,
) -> Result<String, TranslationError> {
    Translator::new(cfa, options, Some(nodes.clone())).run()
}

struct Translator<'a> {
    cfa: &'a Cfa,
    ctx: TranslationContext<'a>,
    restriction: Option<BTreeSet<NodeId>>,
    waitlist: Waitlist<Loc>,
    emitted: BTreeSet<Loc>,
    /// In-scope intraprocedural predecessor count per node.
    pred_count: Vec<usize>,
    /// Structured loop heads: location -> loop body block.
    loops: BTreeMap<Loc, BlockId>,
}

impl<'a> Translator<'a> {
    fn new(cfa: &'a Cfa, options: &'a TranslatorOptions, restriction: Option<BTreeSet<NodeId>>) -> Self {
        let entry_function = cfa.entry_function().id;
        let mut pred_count = vec![0usize; cfa.node_count()];
        for edge in cfa.edges() {
            if edge.kind.is_interprocedural() {
                continue;
            }
            let in_scope = match &restriction {
                Some(allowed) => allowed.contains(&edge.source) && allowed.contains(&edge.target),
                None => true,
            };
            if in_scope {
                pred_count[edge.target] += 1;
            }
        }
        Self {
            cfa,
            ctx: TranslationContext::new(options, entry_function),
            restriction,
            waitlist: Waitlist::new(),
            emitted: BTreeSet::new(),
            pred_count,
            loops: BTreeMap::new(),
        }
    }

    fn run(mut self) -> Result<String, TranslationError> {
        inline::check_no_recursion(self.cfa)?;
        log::debug!(
            "translating CFA: {} nodes, {} edges, entry `{}`",
            self.cfa.node_count(),
            self.cfa.edges().len(),
            self.cfa.entry_function().name
        );

        let entry = self.cfa.entry_function();
        let header = entry.signature.clone();
        let body = self.ctx.arena.new_root();
        self.waitlist.discover(
            Loc {
                frame: 0,
                node: entry.entry,
            },
            body,
            false,
        );

        while !self.waitlist.is_empty() {
            let emitted = &self.emitted;
            let cfa = self.cfa;
            let restriction = &self.restriction;
            let item = self.waitlist.pop_ready(|loc| {
                incoming_in_scope(cfa, restriction, loc.node)
                    .all(|e| emitted.contains(&Loc { frame: loc.frame, node: e.source }))
            });
            let Some(item) = item else { break };
            self.process(item.loc, item.block)?;
        }

        let function = Statement::FunctionDefinition { header, body };
        Ok(writer::render_translation_unit(
            &self.ctx.arena,
            &self.ctx.globals(),
            &[function],
        ))
    }

    fn process(&mut self, loc: Loc, block: BlockId) -> Result<(), TranslationError> {
        if !self.emitted.insert(loc) {
            return Ok(());
        }

        if let Some(original) = &self.cfa.node(loc.node).label {
            self.ctx.arena.push_label(block, original.clone());
        }
        if self.needs_label(loc) {
            self.ctx.arena.push_label(block, label_for(loc));
        }

        if self.cfa.is_function_exit(loc.node)
            && self.cfa.node(loc.node).function == self.ctx.frame(loc.frame).function
        {
            return self.finish_function(loc, block);
        }

        let edges = self.successors(loc.node);
        if edges.is_empty() {
            self.emit_return(loc.frame, block);
            return Ok(());
        }
        if let [only] = edges.as_slice() {
            if let EdgeKind::Call { .. } = only.kind {
                let edge = (*only).clone();
                self.ctx.consume(loc.frame, edge.id);
                let (frame, body) =
                    inline::open_call(&mut self.ctx, self.cfa, loc.frame, &edge, block)?;
                let callee_entry = self.cfa.function(self.ctx.frame(frame).function).entry;
                self.follow(
                    Loc {
                        frame,
                        node: callee_entry,
                    },
                    body,
                );
                return Ok(());
            }
        }

        match branch::classify(&edges)? {
            BranchShape::Terminal => self.emit_return(loc.frame, block),
            BranchShape::Single(edge) => {
                let edge = edge.clone();
                self.take_edge(loc.frame, &edge, block)?;
            }
            BranchShape::Conditional {
                true_edge,
                false_edge,
            } => {
                let true_edge = true_edge.clone();
                let false_edge = false_edge.clone();
                if self.ctx.options.structure_loops && self.cfa.node(loc.node).is_loop_head {
                    self.emit_while(loc, &true_edge, &false_edge, block)?;
                } else {
                    self.emit_if(loc.frame, &true_edge, &false_edge, block)?;
                }
            }
            BranchShape::Nondet(branches) => {
                let branches: Vec<Edge> = branches.into_iter().cloned().collect();
                self.emit_nondet(loc.frame, &branches, block)?;
            }
        }
        Ok(())
    }

    /// In-scope successor edges of `node`, sorted by id. Summary edges are
    /// parallel shortcuts and never traversed; return transfers are
    /// consumed by `finish_function` at exit nodes only.
    fn successors(&self, node: NodeId) -> Vec<&'a Edge> {
        self.cfa
            .outgoing(node)
            .iter()
            .map(|id| self.cfa.edge(*id))
            .filter(|e| {
                !matches!(
                    e.kind,
                    EdgeKind::Summary { .. } | EdgeKind::FunctionReturn { .. }
                )
            })
            .filter(|e| match &self.restriction {
                Some(allowed) => allowed.contains(&e.target),
                None => true,
            })
            .collect()
    }

    fn finish_function(&mut self, loc: Loc, block: BlockId) -> Result<(), TranslationError> {
        if loc.frame == 0 {
            self.emit_return(0, block);
            return Ok(());
        }
        let closed = inline::close_call(&mut self.ctx, self.cfa, loc.frame, loc.node, block)?;
        self.ctx.consume(loc.frame, closed.return_edge);
        self.follow(
            Loc {
                frame: closed.caller_frame,
                node: closed.resume_node,
            },
            closed.resume_block,
        );
        Ok(())
    }

    fn emit_return(&mut self, frame: usize, block: BlockId) {
        let function = self.cfa.function(self.ctx.frame(frame).function);
        if function.returns_value() && self.ctx.return_written(frame) {
            // Only frame 0 reaches an actual C return; inlined frames close
            // through finish_function instead.
            let function = function.clone();
            if let Some(temp) = self.ctx.return_temp(frame, &function) {
                self.ctx.arena.push_text(block, format!("return {};", temp));
                return;
            }
        }
        self.ctx.arena.push_text(block, "return;");
    }

    fn take_edge(&mut self, frame: usize, edge: &Edge, block: BlockId) -> Result<(), TranslationError> {
        self.ctx.consume(frame, edge.id);
        if edge.kind.is_assume() {
            // A lone assume survives restriction pruning; keep the path
            // feasible with an explicit assumption.
            if self.ctx.options.assume_guards {
                if let Some(condition) = branch::render_condition(edge) {
                    self.ctx.require_helper(ASSUME_HELPER);
                    self.ctx.arena.push_edge_text(
                        block,
                        format!("__VERIFIER_assume({});", condition),
                        edge.id,
                    );
                }
            }
        } else {
            render::emit_edge(&mut self.ctx, self.cfa, frame, edge, block)?;
        }
        self.follow(
            Loc {
                frame,
                node: edge.target,
            },
            block,
        );
        Ok(())
    }

    fn emit_if(
        &mut self,
        frame: usize,
        true_edge: &Edge,
        false_edge: &Edge,
        block: BlockId,
    ) -> Result<(), TranslationError> {
        let condition = branch::render_condition(true_edge)
            .ok_or(TranslationError::MalformedMultiEdge { edge: true_edge.id })?;
        self.ctx.consume(frame, true_edge.id);
        self.ctx.consume(frame, false_edge.id);

        self.ctx.arena.push_edge_text(block, format!("if ({})", condition), true_edge.id);
        let then_block = self.ctx.arena.new_child(block);
        self.follow(
            Loc {
                frame,
                node: true_edge.target,
            },
            then_block,
        );
        self.ctx.arena.push_text(block, "else");
        let else_block = self.ctx.arena.new_child(block);
        self.follow(
            Loc {
                frame,
                node: false_edge.target,
            },
            else_block,
        );
        Ok(())
    }

    /// Structured loop: the true branch is the loop body; the back edge
    /// into the loop head renders as `continue`, and the false branch
    /// continues after the loop in the enclosing block.
    fn emit_while(
        &mut self,
        loc: Loc,
        true_edge: &Edge,
        false_edge: &Edge,
        block: BlockId,
    ) -> Result<(), TranslationError> {
        let condition = branch::render_condition(true_edge)
            .ok_or(TranslationError::MalformedMultiEdge { edge: true_edge.id })?;
        self.ctx.consume(loc.frame, true_edge.id);
        self.ctx.consume(loc.frame, false_edge.id);

        self.ctx
            .arena
            .push_edge_text(block, format!("while ({})", condition), true_edge.id);
        let body = self.ctx.arena.new_child(block);
        self.loops.insert(loc, body);
        self.follow(
            Loc {
                frame: loc.frame,
                node: true_edge.target,
            },
            body,
        );
        self.follow(
            Loc {
                frame: loc.frame,
                node: false_edge.target,
            },
            block,
        );
        Ok(())
    }

    fn emit_nondet(
        &mut self,
        frame: usize,
        branches: &[Edge],
        block: BlockId,
    ) -> Result<(), TranslationError> {
        self.ctx.require_helper(NONDET_HELPER);
        for (position, edge) in branches.iter().with_position() {
            self.ctx.consume(frame, edge.id);
            let header = match position {
                Position::First | Position::Only => "if (__VERIFIER_nondet_int())".to_string(),
                Position::Middle => "else if (__VERIFIER_nondet_int())".to_string(),
                Position::Last => "else".to_string(),
            };
            self.ctx.arena.push_edge_text(block, header, edge.id);
            let branch_block = self.ctx.arena.new_child(block);
            if edge.kind.is_assume() {
                if self.ctx.options.assume_guards {
                    if let Some(condition) = branch::render_condition(edge) {
                        self.ctx.require_helper(ASSUME_HELPER);
                        self.ctx.arena.push_edge_text(
                            branch_block,
                            format!("__VERIFIER_assume({});", condition),
                            edge.id,
                        );
                    }
                }
            } else {
                render::emit_edge(&mut self.ctx, self.cfa, frame, edge, branch_block)?;
            }
            self.follow(
                Loc {
                    frame,
                    node: edge.target,
                },
                branch_block,
            );
        }
        Ok(())
    }

    /// Continues at `loc` in `block`: inline for fresh locations, goto (or
    /// `continue` inside a structured loop body) for revisited ones.
    fn follow(&mut self, loc: Loc, block: BlockId) {
        if self.emitted.contains(&loc) || self.waitlist.is_discovered(&loc) {
            if let Some(body) = self.loops.get(&loc) {
                if self.ctx.arena.is_ancestor(*body, block) {
                    self.ctx.arena.push_text(block, "continue;");
                    return;
                }
            }
            self.ctx.arena.push_text(block, format!("goto {};", label_for(loc)));
            return;
        }
        let merge_point = self.needs_label(loc);
        self.waitlist.discover(loc, block, merge_point);
    }

    /// Whether `loc` needs a goto label. A frame's entry node is reached
    /// once without an intraprocedural edge, by the initial discovery or
    /// the call transfer; a back edge onto it is a merge even when the
    /// intraprocedural predecessor count is 1.
    fn needs_label(&self, loc: Loc) -> bool {
        let function = self.cfa.node(loc.node).function;
        let entry_arrival = usize::from(self.cfa.function(function).entry == loc.node);
        self.pred_count[loc.node] + entry_arrival > 1
    }
}

fn label_for(loc: Loc) -> String {
    format!("label_{}_{}", loc.frame, loc.node)
}

fn incoming_in_scope<'a>(
    cfa: &'a Cfa,
    restriction: &'a Option<BTreeSet<NodeId>>,
    node: NodeId,
) -> impl Iterator<Item = &'a Edge> + 'a {
    cfa.incoming(node)
        .iter()
        .map(move |id| cfa.edge(*id))
        .filter(|e| !e.kind.is_interprocedural())
        .filter(move |e| match restriction {
            Some(allowed) => allowed.contains(&e.source) && allowed.contains(&e.target),
            None => true,
        })
}
