// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

//! Serialization of a finished block tree into C source text.
//!
//! One deterministic depth-first traversal, indenting by nesting depth;
//! identical arenas always serialize identically.

use crate::block_tree::{BlockArena, BlockId, Statement};
use std::fmt::Write as _;

/// Line/indent writer for generating C code.
pub struct CWriter {
    out: String,
    indent: usize,
    at_line_start: bool,
}

impl CWriter {
    pub fn new() -> Self {
        Self {
            out: String::new(),
            indent: 0,
            at_line_start: true,
        }
    }

    pub fn write(&mut self, s: &str) {
        for c in s.chars() {
            if c == '\n' {
                self.out.push('\n');
                self.at_line_start = true;
            } else {
                if self.at_line_start {
                    for _ in 0..self.indent {
                        self.out.push_str("  ");
                    }
                    self.at_line_start = false;
                }
                self.out.push(c);
            }
        }
    }

    pub fn line(&mut self, s: &str) {
        self.write(s);
        self.write("\n");
    }

    pub fn line_fmt(&mut self, args: std::fmt::Arguments<'_>) {
        let mut text = String::new();
        let _ = text.write_fmt(args);
        self.line(&text);
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        if self.indent > 0 {
            self.indent -= 1;
        }
    }

    pub fn newline(&mut self) {
        self.write("\n");
    }

    pub fn into_inner(self) -> String {
        self.out
    }
}

impl Default for CWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializes one translation unit: prelude and global declarations first,
/// then every function definition.
pub fn render_translation_unit(
    arena: &BlockArena,
    globals: &[String],
    functions: &[Statement],
) -> String {
    let mut w = CWriter::new();
    for global in globals {
        w.line(global);
    }
    for function in functions {
        w.newline();
        render_statement(&mut w, arena, function);
    }
    w.into_inner()
}

fn render_statement(w: &mut CWriter, arena: &BlockArena, statement: &Statement) {
    match statement {
        Statement::Simple { text, .. } => w.line(text),
        // The trailing empty statement keeps the label legal when nothing
        // follows it in the block.
        Statement::Label(name) => w.line_fmt(format_args!("{}:;", name)),
        Statement::Block(id) => render_block(w, arena, *id),
        Statement::FunctionDefinition { header, body } => {
            w.line(header);
            render_block(w, arena, *body);
        }
    }
}

fn render_block(w: &mut CWriter, arena: &BlockArena, id: BlockId) {
    w.line("{");
    w.indent();
    for entry in &arena.block(id).entries {
        render_statement(w, arena, entry);
    }
    w.dedent();
    w.line("}");
}
