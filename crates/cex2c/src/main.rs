// Copyright (c) Asymptotic
// SPDX-License-Identifier: Apache-2.0

use std::fs;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use c_translator::{
    translate_arg, translate_cfa, FunctionEndTreatment, TargetStrategy, TranslatorOptions,
};
use cfa_model::loader;
use clap::*;
use colored::Colorize;
use log::{debug, info, LevelFilter};
use simplelog::{Config, TermLogger, TerminalMode};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum TargetStrategyArg {
    None,
    Assert,
    VerifierError,
    MemoryFault,
    Overflow,
    InfiniteLoop,
    Pragma,
}

impl From<TargetStrategyArg> for TargetStrategy {
    fn from(value: TargetStrategyArg) -> Self {
        match value {
            TargetStrategyArg::None => TargetStrategy::None,
            TargetStrategyArg::Assert => TargetStrategy::Assert,
            TargetStrategyArg::VerifierError => TargetStrategy::VerifierError,
            TargetStrategyArg::MemoryFault => TargetStrategy::MemoryFault,
            TargetStrategyArg::Overflow => TargetStrategy::Overflow,
            TargetStrategyArg::InfiniteLoop => TargetStrategy::InfiniteLoop,
            TargetStrategyArg::Pragma => TargetStrategy::Pragma,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FunctionEndArg {
    CloseBlock,
    AddNewBlock,
    KeepBlock,
}

impl From<FunctionEndArg> for FunctionEndTreatment {
    fn from(value: FunctionEndArg) -> Self {
        match value {
            FunctionEndArg::CloseBlock => FunctionEndTreatment::CloseBlock,
            FunctionEndArg::AddNewBlock => FunctionEndTreatment::AddNewBlock,
            FunctionEndArg::KeepBlock => FunctionEndTreatment::KeepBlock,
        }
    }
}

#[derive(Parser)]
#[clap(
    name = env!("CARGO_BIN_NAME"),
    about = "Translates a CFA or ARG graph description (JSON) into a compilable C program. \
             When the description carries an ARG section the explored state space is emitted, \
             otherwise the whole control-flow automaton",
    rename_all = "kebab-case",
    author,
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Args {
    /// Path to the JSON graph description; reads stdin when omitted
    #[clap(long = "input", short = 'i')]
    pub input: Option<PathBuf>,

    /// Path for the generated C file; writes stdout when omitted
    #[clap(long = "output", short = 'o')]
    pub output: Option<PathBuf>,

    /// What to emit at states flagged as property violations
    #[clap(long, value_enum, default_value = "assert")]
    pub target_strategy: TargetStrategyArg,

    /// Where control resumes after an inlined call returns
    #[clap(long, value_enum, default_value = "close-block")]
    pub function_end: FunctionEndArg,

    /// Render marked loop heads as `while` loops (CFA translation only)
    #[clap(long)]
    pub structure_loops: bool,

    /// Do not emit __VERIFIER_assume guards on nondeterministic branches
    #[clap(long)]
    pub no_assume_guards: bool,

    /// Translate the CFA even when the description carries an ARG
    #[clap(long)]
    pub ignore_arg: bool,

    /// Log debug output
    #[clap(long, short = 'v')]
    pub verbose: bool,
}

fn run(args: &Args) -> Result<()> {
    let json = match &args.input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("reading graph description {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("reading graph description from stdin")?;
            buffer
        }
    };

    let program = loader::load_program(&json).context("invalid graph description")?;
    debug!(
        "loaded {} functions, {} nodes, {} edges",
        program.cfa.functions().len(),
        program.cfa.node_count(),
        program.cfa.edges().len()
    );

    let options = TranslatorOptions {
        target_strategy: args.target_strategy.into(),
        function_end: args.function_end.into(),
        assume_guards: !args.no_assume_guards,
        structure_loops: args.structure_loops,
    };
    if args.structure_loops && program.arg.is_some() && !args.ignore_arg {
        bail!("--structure-loops applies to CFA translation; pass --ignore-arg to use it here");
    }

    let output = match (&program.arg, args.ignore_arg) {
        (Some(arg), false) => {
            info!("translating ARG with {} states", arg.states().len());
            translate_arg(&program.cfa, arg, &options)?
        }
        _ => {
            info!("translating CFA");
            translate_cfa(&program.cfa, &options)?
        }
    };

    match &args.output {
        Some(path) => fs::write(path, output)
            .with_context(|| format!("writing generated C to {}", path.display()))?,
        None => print!("{}", output),
    }
    Ok(())
}

fn main() {
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).unwrap();

    let args = Args::parse();
    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let _ = TermLogger::init(level, Config::default(), TerminalMode::Stderr);

    if let Err(err) = run(&args) {
        let err = format!("{:?}", err);
        println!("{}", err.bold().red());
        std::process::exit(1);
    }
}
