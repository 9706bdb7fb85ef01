// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

//! Per-run mutable state. One context is created per translation run and
//! discarded with it; nothing in here outlives the run or is shared between
//! runs, which is what makes independent runs safe to execute in parallel.

use crate::block_tree::{BlockArena, BlockId};
use crate::options::TranslatorOptions;
use cfa_model::{EdgeId, Function, FunctionId};
use std::collections::BTreeSet;

/// One inlining instance of a function. Frame 0 is the entry function;
/// every traversed Call edge opens a fresh frame, so two call sites of the
/// same function never share code or temporaries.
#[derive(Clone, Debug)]
pub struct Frame {
    pub id: usize,
    pub caller: Option<usize>,
    pub function: FunctionId,
    /// The Call edge that opened this frame, `None` for frame 0.
    pub call_edge: Option<EdgeId>,
    /// Block owning the flow at the call site.
    pub caller_block: Option<BlockId>,
    /// Name of the `__return_<id>` temporary, created on first use.
    pub return_temp: Option<String>,
}

/// Bookkeeping owned by a single translation run.
pub struct TranslationContext<'a> {
    pub options: &'a TranslatorOptions,
    pub arena: BlockArena,
    frames: Vec<Frame>,
    globals: Vec<String>,
    globals_seen: BTreeSet<String>,
    helpers: BTreeSet<&'static str>,
    temp_counter: usize,
    consumed: BTreeSet<(usize, EdgeId)>,
}

impl<'a> TranslationContext<'a> {
    pub fn new(options: &'a TranslatorOptions, entry_function: FunctionId) -> Self {
        let mut ctx = Self {
            options,
            arena: BlockArena::new(),
            frames: Vec::new(),
            globals: Vec::new(),
            globals_seen: BTreeSet::new(),
            helpers: BTreeSet::new(),
            temp_counter: 0,
            consumed: BTreeSet::new(),
        };
        ctx.frames.push(Frame {
            id: 0,
            caller: None,
            function: entry_function,
            call_edge: None,
            caller_block: None,
            return_temp: None,
        });
        ctx
    }

    pub fn frame(&self, id: usize) -> &Frame {
        &self.frames[id]
    }

    pub fn open_frame(
        &mut self,
        caller: usize,
        function: FunctionId,
        call_edge: EdgeId,
        caller_block: BlockId,
    ) -> usize {
        let id = self.frames.len();
        self.frames.push(Frame {
            id,
            caller: Some(caller),
            function,
            call_edge: Some(call_edge),
            caller_block: Some(caller_block),
            return_temp: None,
        });
        id
    }

    /// The per-frame return temporary, declaring it globally on first use.
    pub fn return_temp(&mut self, frame: usize, function: &Function) -> Option<String> {
        let return_type = function.return_type.clone()?;
        if self.frames[frame].return_temp.is_none() {
            let name = format!("__return_{}", frame);
            self.add_global(format!("{} {};", return_type, name));
            self.frames[frame].return_temp = Some(name);
        }
        self.frames[frame].return_temp.clone()
    }

    /// Whether a return value was computed in this frame on some path.
    pub fn return_written(&self, frame: usize) -> bool {
        self.frames[frame].return_temp.is_some()
    }

    pub fn fresh_temp(&mut self) -> String {
        let name = format!("__tmp_{}", self.temp_counter);
        self.temp_counter += 1;
        name
    }

    /// Appends a global declaration, silently deduplicating on raw text.
    pub fn add_global(&mut self, text: String) {
        if self.globals_seen.insert(text.clone()) {
            self.globals.push(text);
        }
    }

    /// Registers a fixed extern helper declaration (nondet, assume, ...).
    pub fn require_helper(&mut self, declaration: &'static str) {
        self.helpers.insert(declaration);
    }

    /// Prelude plus generated and program globals, in emission order.
    pub fn globals(&self) -> Vec<String> {
        let mut all = vec!["extern void abort(void);".to_string()];
        all.extend(self.helpers.iter().map(|h| h.to_string()));
        all.extend(self.globals.iter().cloned());
        all
    }

    /// Records that `edge` was consumed in `scope` (a frame for CFA
    /// translation, a parent state for ARG translation). Each edge is
    /// consumed at most once per scope; a repeat is a scheduler bug.
    pub fn consume(&mut self, scope: usize, edge: EdgeId) {
        let fresh = self.consumed.insert((scope, edge));
        debug_assert!(fresh, "edge {} consumed twice in scope {}", edge, scope);
        if !fresh {
            log::warn!("edge {} consumed twice in scope {}", edge, scope);
        }
    }
}
