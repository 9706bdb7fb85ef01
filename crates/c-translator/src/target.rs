// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

//! Rendering of property-violation markers.

use crate::block_tree::BlockId;
use crate::context::TranslationContext;
use crate::options::TargetStrategy;

const ASSERT_HELPER: &str = "extern void assert(int);";
const REACH_ERROR_HELPER: &str = "extern void reach_error(void);";

/// Emits the configured violation marker into `block`. Registers whatever
/// extern declarations or globals the strategy relies on.
pub fn emit_target_marker(ctx: &mut TranslationContext<'_>, block: BlockId) {
    match ctx.options.target_strategy {
        TargetStrategy::None => {}
        TargetStrategy::Assert => {
            ctx.require_helper(ASSERT_HELPER);
            ctx.arena.push_text(block, "assert(0);");
        }
        TargetStrategy::VerifierError => {
            ctx.require_helper(REACH_ERROR_HELPER);
            ctx.arena.push_text(block, "reach_error();");
        }
        TargetStrategy::MemoryFault => {
            ctx.arena.push_text(block, "*((int *) 0) = 0;");
        }
        TargetStrategy::Overflow => {
            ctx.add_global("int __overflow = 2147483647;".to_string());
            ctx.arena.push_text(block, "__overflow = __overflow + 1;");
        }
        TargetStrategy::InfiniteLoop => {
            ctx.arena.push_text(block, "while (1) { }");
        }
        TargetStrategy::Pragma => {
            ctx.arena.push_text(block, "#pragma __VERIFIER_target");
        }
    }
}

/// Marker for states selected after exploration. Always the pragma form,
/// independent of the configured strategy, so external tooling can locate
/// these states without parsing violation code.
pub fn emit_post_hoc_marker(ctx: &mut TranslationContext<'_>, block: BlockId) {
    ctx.arena.push_text(block, "#pragma __VERIFIER_target");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_tree::Statement;
    use crate::options::TranslatorOptions;

    fn emitted(strategy: TargetStrategy) -> (Vec<String>, Vec<Statement>) {
        let options = TranslatorOptions {
            target_strategy: strategy,
            ..TranslatorOptions::default()
        };
        let mut ctx = TranslationContext::new(&options, 0);
        let block = ctx.arena.new_root();
        emit_target_marker(&mut ctx, block);
        let entries = ctx.arena.block(block).entries.clone();
        (ctx.globals(), entries)
    }

    #[test]
    fn assert_strategy_declares_its_helper() {
        let (globals, entries) = emitted(TargetStrategy::Assert);
        assert!(globals.contains(&"extern void assert(int);".to_string()));
        assert_eq!(
            entries,
            vec![Statement::Simple {
                text: "assert(0);".to_string(),
                origin: None
            }]
        );
    }

    #[test]
    fn none_strategy_emits_nothing() {
        let (_, entries) = emitted(TargetStrategy::None);
        assert!(entries.is_empty());
    }

    #[test]
    fn overflow_strategy_adds_the_counter_global() {
        let (globals, entries) = emitted(TargetStrategy::Overflow);
        assert!(globals.contains(&"int __overflow = 2147483647;".to_string()));
        assert_eq!(entries.len(), 1);
    }
}
