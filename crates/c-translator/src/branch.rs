// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

//! Classification of a location's outgoing edges into a renderable shape.

use crate::error::TranslationError;
use cfa_model::{Edge, EdgeKind};

/// What the successor set of a location looks like structurally.
#[derive(Clone, Debug)]
pub enum BranchShape<'a> {
    /// No successors in scope.
    Terminal,
    /// Exactly one successor, taken unconditionally.
    Single(&'a Edge),
    /// The classic assume pair: both edges test the same condition with
    /// opposite truth values. `true_edge` is the canonical branch, the one
    /// whose rendered condition is the condition text itself.
    Conditional {
        true_edge: &'a Edge,
        false_edge: &'a Edge,
    },
    /// Anything else with two or more successors. Rendered as a
    /// nondeterministic dispatch chain.
    Nondet(Vec<&'a Edge>),
}

/// Classifies `edges`, the in-scope successors of one location. The slice
/// arrives sorted by edge id, which fixes the branch order in the output.
pub fn classify<'a>(edges: &[&'a Edge]) -> Result<BranchShape<'a>, TranslationError> {
    for edge in edges {
        if let EdgeKind::Summary { .. } = edge.kind {
            return Err(TranslationError::UnexpectedSummaryEdge { edge: edge.id });
        }
    }
    match edges {
        [] => Ok(BranchShape::Terminal),
        &[only] => Ok(BranchShape::Single(only)),
        &[a, b] => {
            if let Some((true_edge, false_edge)) = assume_pair(a, b) {
                Ok(BranchShape::Conditional {
                    true_edge,
                    false_edge,
                })
            } else {
                Ok(BranchShape::Nondet(edges.to_vec()))
            }
        }
        _ => Ok(BranchShape::Nondet(edges.to_vec())),
    }
}

/// Recognizes two assume edges over the same condition with complementary
/// truth values and orients them as (true branch, false branch).
fn assume_pair<'a>(a: &'a Edge, b: &'a Edge) -> Option<(&'a Edge, &'a Edge)> {
    let (cond_a, holds_a) = assume_parts(a)?;
    let (cond_b, holds_b) = assume_parts(b)?;
    if cond_a != cond_b || holds_a == holds_b {
        return None;
    }
    if holds_a {
        Some((a, b))
    } else {
        Some((b, a))
    }
}

/// Condition text and the effective truth value of an assume edge. A
/// swapped edge tests the negation, so truth and swapped cancel out.
fn assume_parts(edge: &Edge) -> Option<(&str, bool)> {
    match &edge.kind {
        EdgeKind::Assume {
            condition,
            truth,
            swapped,
        } => Some((condition.as_str(), truth != swapped)),
        _ => None,
    }
}

/// The condition under which `edge` is taken, as a C expression.
pub fn render_condition(edge: &Edge) -> Option<String> {
    let (condition, holds) = assume_parts(edge)?;
    if holds {
        Some(condition.to_string())
    } else {
        Some(format!("!({})", condition))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfa_model::{Edge, EdgeKind};

    fn assume(id: usize, condition: &str, truth: bool, swapped: bool) -> Edge {
        Edge {
            id,
            source: 0,
            target: id,
            kind: EdgeKind::Assume {
                condition: condition.to_string(),
                truth,
                swapped,
            },
            problem_type: false,
        }
    }

    #[test]
    fn complementary_assumes_form_a_conditional() {
        let t = assume(0, "x < 10", true, false);
        let f = assume(1, "x < 10", false, false);
        match classify(&[&t, &f]).unwrap() {
            BranchShape::Conditional {
                true_edge,
                false_edge,
            } => {
                assert_eq!(true_edge.id, 0);
                assert_eq!(false_edge.id, 1);
            }
            other => panic!("expected conditional, got {:?}", other),
        }
    }

    #[test]
    fn swapped_assume_flips_the_canonical_branch() {
        // truth=false but swapped: this edge is the one where the
        // condition actually holds.
        let t = assume(0, "p == 0", false, true);
        let f = assume(1, "p == 0", true, true);
        match classify(&[&t, &f]).unwrap() {
            BranchShape::Conditional { true_edge, .. } => assert_eq!(true_edge.id, 0),
            other => panic!("expected conditional, got {:?}", other),
        }
        assert_eq!(render_condition(&t).unwrap(), "p == 0");
        assert_eq!(render_condition(&f).unwrap(), "!(p == 0)");
    }

    #[test]
    fn mismatched_conditions_fall_back_to_nondet() {
        let a = assume(0, "x < 10", true, false);
        let b = assume(1, "y < 10", false, false);
        assert!(matches!(
            classify(&[&a, &b]).unwrap(),
            BranchShape::Nondet(_)
        ));
    }

    #[test]
    fn summary_edges_are_rejected() {
        let s = Edge {
            id: 3,
            source: 0,
            target: 1,
            kind: EdgeKind::Summary { call_edge: 2 },
            problem_type: false,
        };
        assert!(matches!(
            classify(&[&s]),
            Err(TranslationError::UnexpectedSummaryEdge { edge: 3 })
        ));
    }
}
