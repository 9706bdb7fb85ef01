// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

//! ARG translation: emits the explored state space as one C function.
//!
//! The ARG is a DAG, so every cycle of the original program shows up as a
//! covered state whose flow is redirected to its covering representative
//! with a goto. Merge points become labels; scope conflicts across merges
//! are repaired with the shadow temporaries computed by the scope pass.

use crate::block_tree::{BlockId, Statement};
use crate::branch::{self, BranchShape};
use crate::cfa::{ASSUME_HELPER, NONDET_HELPER};
use crate::context::TranslationContext;
use crate::error::TranslationError;
use crate::inline;
use crate::options::{FunctionEndTreatment, TranslatorOptions};
use crate::render;
use crate::scheduler::Waitlist;
use crate::scope::{self, ScopeAnalysis};
use crate::target;
use crate::writer;
use cfa_model::{Arg, Cfa, Edge, EdgeKind, StateId};
use itertools::{Itertools, Position};
use std::collections::{BTreeMap, BTreeSet};

/// Translates the ARG rooted at its initial state. Violation markers are
/// taken from the states' own target flags.
pub fn translate_arg(
    cfa: &Cfa,
    arg: &Arg,
    options: &TranslatorOptions,
) -> Result<String, TranslationError> {
    let targets: BTreeSet<StateId> = arg
        .states()
        .iter()
        .filter(|s| s.is_target)
        .map(|s| s.id)
        .collect();
    ArgTranslator::new(cfa, arg, options, targets).run()
}

/// Like [`translate_arg`], but with an extra set of states to mark after
/// the fact. Marked states get a pragma marker independent of the
/// configured target strategy, so a caller can flag states found faulty
/// after exploration without rebuilding the ARG.
pub fn translate_arg_with_markers(
    cfa: &Cfa,
    arg: &Arg,
    options: &TranslatorOptions,
    markers: &BTreeSet<StateId>,
) -> Result<String, TranslationError> {
    let targets: BTreeSet<StateId> = arg
        .states()
        .iter()
        .filter(|s| s.is_target)
        .map(|s| s.id)
        .collect();
    let mut translator = ArgTranslator::new(cfa, arg, options, targets);
    translator.markers = markers.clone();
    translator.run()
}

struct ArgTranslator<'a> {
    cfa: &'a Cfa,
    arg: &'a Arg,
    ctx: TranslationContext<'a>,
    targets: BTreeSet<StateId>,
    markers: BTreeSet<StateId>,
    scopes: ScopeAnalysis,
    waitlist: Waitlist<StateId>,
    emitted: BTreeSet<StateId>,
    frame_of: BTreeMap<StateId, usize>,
}

impl<'a> ArgTranslator<'a> {
    fn new(
        cfa: &'a Cfa,
        arg: &'a Arg,
        options: &'a TranslatorOptions,
        targets: BTreeSet<StateId>,
    ) -> Self {
        let entry_function = cfa.entry_function().id;
        Self {
            cfa,
            arg,
            ctx: TranslationContext::new(options, entry_function),
            targets,
            markers: BTreeSet::new(),
            scopes: ScopeAnalysis::default(),
            waitlist: Waitlist::new(),
            emitted: BTreeSet::new(),
            frame_of: BTreeMap::new(),
        }
    }

    fn run(mut self) -> Result<String, TranslationError> {
        inline::check_no_recursion(self.cfa)?;
        self.scopes = ScopeAnalysis::compute(self.cfa, self.arg)?;
        log::debug!(
            "translating ARG: {} states, {} targets",
            self.arg.states().len(),
            self.targets.len()
        );

        let entry = self.cfa.entry_function();
        let header = entry.signature.clone();
        let body = self.ctx.arena.new_root();
        self.frame_of.insert(self.arg.root(), 0);
        self.waitlist.discover(self.arg.root(), body, false);

        while !self.waitlist.is_empty() {
            let emitted = &self.emitted;
            let arg = self.arg;
            let item = self.waitlist.pop_ready(|state| {
                arg.parents(*state).iter().all(|p| emitted.contains(p))
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

    fn process(&mut self, state: StateId, block: BlockId) -> Result<(), TranslationError> {
        if !self.emitted.insert(state) {
            return Ok(());
        }
        let frame = self.frame_of.get(&state).copied().unwrap_or(0);

        if let Some(original) = &self.cfa.node(self.arg.state(state).node).label {
            self.ctx.arena.push_label(block, original.clone());
        }
        if self.arg.is_join(state) {
            self.ctx.arena.push_label(block, state_label(state));
            self.emit_restores(state, block);
        }
        if self.targets.contains(&state) {
            target::emit_target_marker(&mut self.ctx, block);
        }
        if self.markers.contains(&state) {
            target::emit_post_hoc_marker(&mut self.ctx, block);
        }

        let children = self.arg.state(state).children.clone();
        if children.is_empty() {
            self.emit_return(block);
            return Ok(());
        }

        let edges: Vec<&Edge> = children.iter().map(|(e, _)| self.cfa.edge(*e)).collect();
        let child_of: BTreeMap<usize, StateId> = children.iter().map(|(e, s)| (*e, *s)).collect();

        match branch::classify(&edges)? {
            BranchShape::Terminal => self.emit_return(block),
            BranchShape::Single(edge) => {
                let child = child_of[&edge.id];
                self.translate_child(state, frame, edge.clone(), child, block)?;
            }
            BranchShape::Conditional {
                true_edge,
                false_edge,
            } => {
                let condition = branch::render_condition(true_edge)
                    .ok_or(TranslationError::MalformedMultiEdge { edge: true_edge.id })?;
                let (true_edge, false_edge) = (true_edge.clone(), false_edge.clone());
                self.ctx.consume(state, true_edge.id);
                self.ctx.consume(state, false_edge.id);

                self.ctx
                    .arena
                    .push_edge_text(block, format!("if ({})", condition), true_edge.id);
                let then_block = self.ctx.arena.new_child(block);
                self.continue_at(frame, child_of[&true_edge.id], then_block)?;
                self.ctx.arena.push_text(block, "else");
                let else_block = self.ctx.arena.new_child(block);
                self.continue_at(frame, child_of[&false_edge.id], else_block)?;
            }
            BranchShape::Nondet(branches) => {
                let branches: Vec<Edge> = branches.into_iter().cloned().collect();
                self.ctx.require_helper(NONDET_HELPER);
                for (position, edge) in branches.iter().with_position() {
                    let header = match position {
                        Position::First | Position::Only => {
                            "if (__VERIFIER_nondet_int())".to_string()
                        }
                        Position::Middle => "else if (__VERIFIER_nondet_int())".to_string(),
                        Position::Last => "else".to_string(),
                    };
                    self.ctx.arena.push_edge_text(block, header, edge.id);
                    let branch_block = self.ctx.arena.new_child(block);
                    self.translate_child(state, frame, edge.clone(), child_of[&edge.id], branch_block)?;
                }
            }
        }
        Ok(())
    }

    /// Emits one outgoing edge and schedules its child state.
    fn translate_child(
        &mut self,
        state: StateId,
        frame: usize,
        edge: Edge,
        child: StateId,
        block: BlockId,
    ) -> Result<(), TranslationError> {
        self.ctx.consume(state, edge.id);
        match &edge.kind {
            EdgeKind::Call { .. } => {
                let (callee_frame, body) =
                    inline::open_call(&mut self.ctx, self.cfa, frame, &edge, block)?;
                self.continue_at(callee_frame, child, body)
            }
            EdgeKind::FunctionReturn { assign_to, .. } => {
                let node = self.arg.state(state).node;
                self.close_frame(frame, node, &edge, assign_to.as_deref(), block, child)
            }
            EdgeKind::Assume { .. } => {
                if self.ctx.options.assume_guards {
                    if let Some(condition) = branch::render_condition(&edge) {
                        self.ctx.require_helper(ASSUME_HELPER);
                        self.ctx.arena.push_edge_text(
                            block,
                            format!("__VERIFIER_assume({});", condition),
                            edge.id,
                        );
                    }
                }
                self.continue_at(frame, child, block)
            }
            _ => {
                render::emit_edge(&mut self.ctx, self.cfa, frame, &edge, block)?;
                self.continue_at(frame, child, block)
            }
        }
    }

    /// Leaves an inlined function along an explicit return transfer.
    fn close_frame(
        &mut self,
        frame: usize,
        exit_node: usize,
        edge: &Edge,
        assign_to: Option<&str>,
        current_block: BlockId,
        child: StateId,
    ) -> Result<(), TranslationError> {
        let matches_frame = self.ctx.frame(frame).call_edge
            == match edge.kind {
                EdgeKind::FunctionReturn { call_edge, .. } => Some(call_edge),
                _ => None,
            };
        let (caller_frame, caller_block) = match (
            matches_frame,
            self.ctx.frame(frame).caller,
            self.ctx.frame(frame).caller_block,
        ) {
            (true, Some(caller), Some(block)) => (caller, block),
            _ => return Err(TranslationError::UnstructuredFunctionExit { node: exit_node }),
        };

        let resume_block = match self.ctx.options.function_end {
            FunctionEndTreatment::CloseBlock => caller_block,
            FunctionEndTreatment::AddNewBlock => self.ctx.arena.new_child(caller_block),
            FunctionEndTreatment::KeepBlock => current_block,
        };
        if let (Some(lhs), true) = (assign_to, self.ctx.return_written(frame)) {
            let function = self.cfa.function(self.ctx.frame(frame).function);
            if let Some(temp) = self.ctx.return_temp(frame, function) {
                self.ctx
                    .arena
                    .push_edge_text(resume_block, format!("{} = {};", lhs, temp), edge.id);
            }
        }
        self.continue_at(caller_frame, child, resume_block)
    }

    /// Schedules `child` in `block`, or closes the path with a goto when
    /// the child is covered or already placed. Every jump and every
    /// fallthrough into a join first saves the join's conflicted variables
    /// into their shadows.
    fn continue_at(
        &mut self,
        frame: usize,
        child: StateId,
        block: BlockId,
    ) -> Result<(), TranslationError> {
        if let Some(rep) = self.arg.covering_representative(child) {
            self.emit_saves(rep, block);
            self.check_frame(rep, frame)?;
            self.ctx
                .arena
                .push_text(block, format!("goto {};", state_label(rep)));
            return Ok(());
        }
        if self.emitted.contains(&child) || self.waitlist.is_discovered(&child) {
            self.emit_saves(child, block);
            self.check_frame(child, frame)?;
            self.ctx
                .arena
                .push_text(block, format!("goto {};", state_label(child)));
            return Ok(());
        }
        if self.arg.is_join(child) {
            self.emit_saves(child, block);
        }
        self.frame_of.insert(child, frame);
        self.waitlist.discover(child, block, self.arg.is_join(child));
        Ok(())
    }

    fn check_frame(&mut self, state: StateId, frame: usize) -> Result<(), TranslationError> {
        match self.frame_of.get(&state) {
            Some(existing) if *existing != frame => {
                Err(TranslationError::JoinFrameMismatch { state })
            }
            Some(_) => Ok(()),
            None => {
                self.frame_of.insert(state, frame);
                Ok(())
            }
        }
    }

    fn emit_saves(&mut self, join: StateId, block: BlockId) {
        let conflicts = self.scopes.conflicts_at(join).to_vec();
        for conflict in conflicts {
            let shadow = scope::shadow_name(join, &conflict.name);
            self.ctx.add_global(format!("{} {};", conflict.ty, shadow));
            self.ctx
                .arena
                .push_text(block, format!("{} = {};", shadow, conflict.name));
        }
    }

    fn emit_restores(&mut self, join: StateId, block: BlockId) {
        let conflicts = self.scopes.conflicts_at(join).to_vec();
        for conflict in conflicts {
            let shadow = scope::shadow_name(join, &conflict.name);
            self.ctx.add_global(format!("{} {};", conflict.ty, shadow));
            self.ctx
                .arena
                .push_text(block, format!("{} = {};", conflict.name, shadow));
        }
    }

    /// End of an explored path. The value computed for the entry function,
    /// if any, travels through the root frame's return temporary.
    fn emit_return(&mut self, block: BlockId) {
        let function = self.cfa.entry_function().clone();
        if function.returns_value() && self.ctx.return_written(0) {
            if let Some(temp) = self.ctx.return_temp(0, &function) {
                self.ctx.arena.push_text(block, format!("return {};", temp));
                return;
            }
        }
        self.ctx.arena.push_text(block, "return;");
    }
}

fn state_label(state: StateId) -> String {
    format!("label_{}", state)
}
