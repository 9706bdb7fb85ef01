// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

use cfa_model::loader::load_program;
use cfa_model::ModelError;

const DIAMOND_WITH_ARG: &str = r#"{
  "functions": [
    {"id": 0, "name": "main", "return_type": null, "params": [],
     "entry": 0, "exit": 3, "signature": "void main(void)"}
  ],
  "nodes": [
    {"id": 0, "function": 0},
    {"id": 1, "function": 0},
    {"id": 2, "function": 0},
    {"id": 3, "function": 0}
  ],
  "edges": [
    {"id": 0, "source": 0, "target": 1,
     "kind": "assume", "condition": "x < 10", "truth": true, "swapped": false},
    {"id": 1, "source": 0, "target": 2,
     "kind": "assume", "condition": "x < 10", "truth": false, "swapped": false},
    {"id": 2, "source": 1, "target": 3, "kind": "statement", "text": "y = 1"},
    {"id": 3, "source": 2, "target": 3, "kind": "statement", "text": "y = 2"}
  ],
  "arg": {
    "root": 0,
    "states": [
      {"id": 0, "node": 0, "children": [[0, 1], [1, 2]]},
      {"id": 1, "node": 1, "children": [[2, 3]]},
      {"id": 2, "node": 2, "children": [[3, 3]]},
      {"id": 3, "node": 3, "children": [], "is_target": true}
    ]
  }
}"#;

#[test]
fn loads_a_full_description() {
    let program = load_program(DIAMOND_WITH_ARG).unwrap();
    assert_eq!(program.cfa.functions().len(), 1);
    assert_eq!(program.cfa.node_count(), 4);
    assert_eq!(program.cfa.edges().len(), 4);
    assert_eq!(program.cfa.entry_function().name, "main");
    assert_eq!(program.cfa.outgoing(0), &[0, 1]);
    assert_eq!(program.cfa.intra_pred_count(3), 2);

    let arg = program.arg.unwrap();
    assert_eq!(arg.root(), 0);
    assert!(arg.is_join(3));
    assert!(!arg.is_join(1));
    assert!(arg.state(3).is_target);
    assert_eq!(arg.parents(3), &[1, 2]);
}

#[test]
fn rejects_mismatched_positional_ids() {
    let json = r#"{
      "functions": [
        {"id": 0, "name": "main", "return_type": null, "params": [],
         "entry": 0, "exit": 0, "signature": "void main(void)"}
      ],
      "nodes": [{"id": 1, "function": 0}],
      "edges": []
    }"#;
    assert!(matches!(
        load_program(json),
        Err(ModelError::MisplacedId {
            what: "node",
            id: 1,
            position: 0,
        })
    ));
}

#[test]
fn rejects_dangling_edge_endpoints() {
    let json = r#"{
      "functions": [
        {"id": 0, "name": "main", "return_type": null, "params": [],
         "entry": 0, "exit": 0, "signature": "void main(void)"}
      ],
      "nodes": [{"id": 0, "function": 0}],
      "edges": [{"id": 0, "source": 0, "target": 7, "kind": "blank"}]
    }"#;
    assert!(matches!(
        load_program(json),
        Err(ModelError::DanglingNode { edge: 0, node: 7 })
    ));
}

#[test]
fn rejects_cyclic_covering_chains() {
    let json = r#"{
      "functions": [
        {"id": 0, "name": "main", "return_type": null, "params": [],
         "entry": 0, "exit": 0, "signature": "void main(void)"}
      ],
      "nodes": [{"id": 0, "function": 0}],
      "edges": [],
      "arg": {
        "root": 0,
        "states": [
          {"id": 0, "node": 0, "children": []},
          {"id": 1, "node": 0, "children": [], "covered_by": 2},
          {"id": 2, "node": 0, "children": [], "covered_by": 1}
        ]
      }
    }"#;
    assert!(matches!(
        load_program(json),
        Err(ModelError::CyclicCovering { .. })
    ));
}

#[test]
fn rejects_covered_states_with_children() {
    let json = r#"{
      "functions": [
        {"id": 0, "name": "main", "return_type": null, "params": [],
         "entry": 0, "exit": 0, "signature": "void main(void)"}
      ],
      "nodes": [{"id": 0, "function": 0}],
      "edges": [{"id": 0, "source": 0, "target": 0, "kind": "blank"}],
      "arg": {
        "root": 0,
        "states": [
          {"id": 0, "node": 0, "children": []},
          {"id": 1, "node": 0, "children": [[0, 0]], "covered_by": 0}
        ]
      }
    }"#;
    assert!(matches!(
        load_program(json),
        Err(ModelError::CoveredStateWithChildren { state: 1, .. })
    ));
}

#[test]
fn rejects_cycles_in_the_explicit_state_graph() {
    let json = r#"{
      "functions": [
        {"id": 0, "name": "main", "return_type": null, "params": [],
         "entry": 0, "exit": 0, "signature": "void main(void)"}
      ],
      "nodes": [{"id": 0, "function": 0}],
      "edges": [{"id": 0, "source": 0, "target": 0, "kind": "blank"}],
      "arg": {
        "root": 0,
        "states": [
          {"id": 0, "node": 0, "children": [[0, 1]]},
          {"id": 1, "node": 0, "children": [[0, 0]]}
        ]
      }
    }"#;
    assert!(matches!(
        load_program(json),
        Err(ModelError::CyclicStateGraph)
    ));
}
