// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

use c_translator::{
    translate_arg, translate_arg_with_markers, TargetStrategy, TranslatorOptions,
};
use cfa_model::{Arg, ArgState, Cfa, CfaBuilder, EdgeKind, VarDecl};
use std::collections::BTreeSet;

fn state(id: usize, node: usize, children: Vec<(usize, usize)>) -> ArgState {
    ArgState {
        id,
        node,
        children,
        covered_by: None,
        is_target: false,
    }
}

fn statement(text: &str) -> EdgeKind {
    EdgeKind::Statement {
        text: text.to_string(),
    }
}

fn assume(condition: &str, truth: bool) -> EdgeKind {
    EdgeKind::Assume {
        condition: condition.to_string(),
        truth,
        swapped: false,
    }
}

fn local(name: &str) -> EdgeKind {
    EdgeKind::Declaration {
        decl: VarDecl::new(name, "int", format!("int {}", name)),
        is_global: false,
    }
}

/// Both branches declare their own `x` before merging.
fn conflicting_diamond() -> (Cfa, Arg) {
    let mut b = CfaBuilder::new();
    let main = b.add_function("main", None, vec![], "void main(void)");
    let n: Vec<_> = (0..4).map(|_| b.add_node(main)).collect();
    b.set_entry_exit(main, n[0], n[3]);
    let left = b.add_edge(n[0], n[1], local("x"));
    let right = b.add_edge(n[0], n[2], local("x"));
    let jl = b.add_edge(n[1], n[3], EdgeKind::Blank);
    let jr = b.add_edge(n[2], n[3], EdgeKind::Blank);
    let cfa = b.build().unwrap();

    let arg = Arg::new(
        vec![
            state(0, 0, vec![(left, 1), (right, 2)]),
            state(1, 1, vec![(jl, 3)]),
            state(2, 2, vec![(jr, 3)]),
            state(3, 3, vec![]),
        ],
        0,
    )
    .unwrap();
    (cfa, arg)
}

/// One loop iteration explored, then covered back to the loop head state.
fn covered_loop() -> (Cfa, Arg) {
    let mut b = CfaBuilder::new();
    let main = b.add_function("main", None, vec![], "void main(void)");
    let n: Vec<_> = (0..4).map(|_| b.add_node(main)).collect();
    b.set_entry_exit(main, n[0], n[3]);
    let enter = b.add_edge(n[0], n[1], local("i"));
    let stay = b.add_edge(n[1], n[2], assume("i < 3", true));
    let leave = b.add_edge(n[1], n[3], assume("i < 3", false));
    let back = b.add_edge(n[2], n[1], statement("i = i + 1"));
    let cfa = b.build().unwrap();

    let mut covered = state(4, 1, vec![]);
    covered.covered_by = Some(1);
    let arg = Arg::new(
        vec![
            state(0, 0, vec![(enter, 1)]),
            state(1, 1, vec![(stay, 2), (leave, 3)]),
            state(2, 2, vec![(back, 4)]),
            state(3, 3, vec![]),
            covered,
        ],
        0,
    )
    .unwrap();
    (cfa, arg)
}

#[test]
fn conflicting_declarations_travel_through_shadows() {
    let (cfa, arg) = conflicting_diamond();
    let output = translate_arg(&cfa, &arg, &TranslatorOptions::default()).unwrap();

    assert!(output.contains("int __scope_3_x;"));
    assert_eq!(output.matches("__scope_3_x = x;").count(), 2);
    assert_eq!(output.matches("x = __scope_3_x;").count(), 1);
    assert_eq!(output.matches("label_3:;").count(), 1);
    assert_eq!(output.matches("goto label_3;").count(), 1);
    let save = output.find("goto label_3;").unwrap();
    let preceding = &output[..save];
    assert!(preceding.contains("__scope_3_x = x;"));
}

#[test]
fn covered_states_redirect_to_their_representative() {
    let (cfa, arg) = covered_loop();
    let output = translate_arg(&cfa, &arg, &TranslatorOptions::default()).unwrap();

    assert_eq!(output.matches("label_1:;").count(), 1);
    assert_eq!(output.matches("goto label_1;").count(), 1);
    assert!(output.contains("i = i + 1;"));
    assert!(output.contains("if (i < 3)"));
}

#[test]
fn target_states_get_violation_markers() {
    let (cfa, arg) = covered_loop();
    let mut states = arg.states().to_vec();
    states[3].is_target = true;
    let arg = Arg::new(states, 0).unwrap();

    let output = translate_arg(&cfa, &arg, &TranslatorOptions::default()).unwrap();
    assert!(output.contains("extern void assert(int);"));
    assert!(output.contains("assert(0);"));
}

#[test]
fn post_hoc_markers_emit_the_pragma_regardless_of_strategy() {
    let (cfa, arg) = covered_loop();
    let options = TranslatorOptions {
        target_strategy: TargetStrategy::VerifierError,
        ..TranslatorOptions::default()
    };
    let markers: BTreeSet<usize> = [3].into_iter().collect();

    let unmarked = translate_arg(&cfa, &arg, &options).unwrap();
    assert!(!unmarked.contains("#pragma __VERIFIER_target"));

    let marked = translate_arg_with_markers(&cfa, &arg, &options, &markers).unwrap();
    assert!(marked.contains("#pragma __VERIFIER_target"));
    // No state carries a target flag, so the strategy stays unused.
    assert!(!marked.contains("reach_error();"));
}

#[test]
fn assume_pairs_render_as_conditionals() {
    let (cfa, arg) = covered_loop();
    let options = TranslatorOptions {
        assume_guards: false,
        ..TranslatorOptions::default()
    };
    let output = translate_arg(&cfa, &arg, &options).unwrap();
    assert!(output.contains("if (i < 3)"));
    assert!(output.contains("else"));
    assert!(!output.contains("__VERIFIER_assume"));
}

#[test]
fn translation_is_deterministic() {
    let options = TranslatorOptions::default();
    let (cfa, arg) = conflicting_diamond();
    let first = translate_arg(&cfa, &arg, &options).unwrap();
    let second = translate_arg(&cfa, &arg, &options).unwrap();
    assert_eq!(first, second);
}

#[test]
fn inlined_calls_return_through_frame_temps() {
    let mut b = CfaBuilder::new();
    let main = b.add_function("main", None, vec![], "void main(void)");
    let inc = b.add_function("inc", Some("int".to_string()), vec![], "int inc(void)");
    let m0 = b.add_node(main);
    let m1 = b.add_node(main);
    let m2 = b.add_node(main);
    let c0 = b.add_node(inc);
    let c1 = b.add_node(inc);
    b.set_entry_exit(main, m0, m2);
    b.set_entry_exit(inc, c0, c1);
    b.set_entry_function(main);
    let call = b.add_edge(
        m0,
        c0,
        EdgeKind::Call {
            callee: 1,
            arguments: vec![],
        },
    );
    let ret_stmt = b.add_edge(
        c0,
        c1,
        EdgeKind::ReturnStatement {
            expr: Some("9".to_string()),
        },
    );
    let ret = b.add_edge(
        c1,
        m1,
        EdgeKind::FunctionReturn {
            call_edge: call,
            assign_to: Some("a".to_string()),
        },
    );
    let done = b.add_edge(m1, m2, EdgeKind::Blank);
    let cfa = b.build().unwrap();

    let arg = Arg::new(
        vec![
            state(0, 0, vec![(call, 1)]),
            state(1, 3, vec![(ret_stmt, 2)]),
            state(2, 4, vec![(ret, 3)]),
            state(3, 1, vec![(done, 4)]),
            state(4, 2, vec![]),
        ],
        0,
    )
    .unwrap();

    let output = translate_arg(&cfa, &arg, &TranslatorOptions::default()).unwrap();
    assert!(output.contains("int __return_1;"));
    assert!(output.contains("__return_1 = 9;"));
    assert!(output.contains("a = __return_1;"));
    assert!(output.contains("return;"));
}
