// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

//! The nested-block statement model the translators build into.
//!
//! Compound blocks live in an arena and refer to each other by integer id,
//! with an upward parent link per block. This keeps the tree trivially
//! serializable and lets ancestor queries (needed for `continue` placement
//! inside structured loops) walk parent ids instead of a shared mutable
//! object graph.

use cfa_model::EdgeId;

pub type BlockId = usize;

/// One entry of a compound block, in emission order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Statement {
    /// A single rendered statement line. `origin` ties it back to the graph
    /// edge it came from, when there is one.
    Simple { text: String, origin: Option<EdgeId> },
    /// A C label, emitted as `name:;`.
    Label(String),
    /// A nested compound block.
    Block(BlockId),
    /// A function definition wrapping a body block.
    FunctionDefinition { header: String, body: BlockId },
}

#[derive(Clone, Debug, Default)]
pub struct CompoundBlock {
    pub parent: Option<BlockId>,
    pub entries: Vec<Statement>,
}

/// Arena of compound blocks. Parent links always form a tree: children are
/// only ever created from an existing block, so cycles cannot be built.
#[derive(Clone, Debug, Default)]
pub struct BlockArena {
    blocks: Vec<CompoundBlock>,
}

impl BlockArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a block with no parent (a function body).
    pub fn new_root(&mut self) -> BlockId {
        self.blocks.push(CompoundBlock::default());
        self.blocks.len() - 1
    }

    /// Creates a block nested in `parent` and appends it there.
    pub fn new_child(&mut self, parent: BlockId) -> BlockId {
        self.blocks.push(CompoundBlock {
            parent: Some(parent),
            entries: Vec::new(),
        });
        let id = self.blocks.len() - 1;
        self.blocks[parent].entries.push(Statement::Block(id));
        id
    }

    pub fn block(&self, id: BlockId) -> &CompoundBlock {
        &self.blocks[id]
    }

    pub fn push(&mut self, block: BlockId, statement: Statement) {
        self.blocks[block].entries.push(statement);
    }

    pub fn push_text(&mut self, block: BlockId, text: impl Into<String>) {
        self.push(
            block,
            Statement::Simple {
                text: text.into(),
                origin: None,
            },
        );
    }

    pub fn push_edge_text(&mut self, block: BlockId, text: impl Into<String>, origin: EdgeId) {
        self.push(
            block,
            Statement::Simple {
                text: text.into(),
                origin: Some(origin),
            },
        );
    }

    pub fn push_label(&mut self, block: BlockId, name: impl Into<String>) {
        self.push(block, Statement::Label(name.into()));
    }

    /// Whether `ancestor` encloses `block` (or is `block` itself).
    pub fn is_ancestor(&self, ancestor: BlockId, block: BlockId) -> bool {
        let mut current = Some(block);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.blocks[id].parent;
        }
        false
    }
}
