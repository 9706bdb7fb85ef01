// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

/// What to emit at a node flagged as reaching a property violation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetStrategy {
    /// Emit nothing; the path is still present in the output.
    None,
    /// `assert(0);`
    Assert,
    /// `reach_error();` with the matching extern declaration.
    VerifierError,
    /// A null-pointer write, for checkers that trap memory faults.
    MemoryFault,
    /// A signed-integer overflow on a generated global.
    Overflow,
    /// `while (1) { }` so the violation point never terminates.
    InfiniteLoop,
    /// A pragma marker recognized by external tooling.
    Pragma,
}

/// Which block receives control after an inlined call returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FunctionEndTreatment {
    /// Resume in the block that owned the flow at the call site.
    CloseBlock,
    /// Open a fresh child of the caller's block and resume there.
    AddNewBlock,
    /// Keep emitting in the current (inner) block. Valid because scope
    /// conflicts across merges are repaired with shadow temporaries.
    KeepBlock,
}

/// Per-run configuration, read once at the start of a translation.
#[derive(Clone, Debug)]
pub struct TranslatorOptions {
    pub target_strategy: TargetStrategy,
    pub function_end: FunctionEndTreatment,
    /// Emit `__VERIFIER_assume(...)` guards inside nondeterministic
    /// dispatch branches (and for pruned single assume edges).
    pub assume_guards: bool,
    /// Render loop-head conditionals as `while (...)` instead of closing
    /// every back edge with a goto. CFA translation only.
    pub structure_loops: bool,
}

impl Default for TranslatorOptions {
    fn default() -> Self {
        Self {
            target_strategy: TargetStrategy::Assert,
            function_end: FunctionEndTreatment::CloseBlock,
            assume_guards: true,
            structure_loops: false,
        }
    }
}
