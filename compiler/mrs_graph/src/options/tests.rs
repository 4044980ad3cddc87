#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::PathBuf;

use pretty_assertions::assert_eq;

use super::*;

fn lookup(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
    move |key| {
        pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| (*v).to_owned())
    }
}

#[test]
fn test_defaults() {
    let options = EngineOptions::from_lookup(|_| None);
    assert_eq!(options, EngineOptions::default());
    assert_eq!(options.strategy, EvalStrategy::Native);
    assert_eq!(options.max_compile_slots, 64);
    assert_eq!(options.cascade, CascadePolicy::Converge);
    assert!(options.warn_on_cycles);
}

#[test]
fn test_environment_overrides() {
    let options = EngineOptions::from_lookup(lookup(&[
        ("MRS_EVAL_STRATEGY", "Interpreted"),
        ("MRS_EXCOMPILER", "/opt/mrs/excompile.sh"),
        ("MRS_COMPILE_DIR", "/tmp/mrs"),
        ("MRS_MAX_COMPILE_SLOTS", "8"),
        ("MRS_MAX_CASCADE_DEPTH", "32"),
    ]));
    assert_eq!(options.strategy, EvalStrategy::Interpreted);
    assert_eq!(
        options.compiler,
        CompilerCommand::Script {
            path: PathBuf::from("/opt/mrs/excompile.sh")
        }
    );
    assert_eq!(options.scratch_dir, Some(PathBuf::from("/tmp/mrs")));
    assert_eq!(options.max_compile_slots, 8);
    assert_eq!(options.cascade, CascadePolicy::DepthLimit(32));
}

#[test]
fn test_script_wins_over_cc() {
    let options = EngineOptions::from_lookup(lookup(&[
        ("MRS_CC", "clang"),
        ("MRS_EXCOMPILER", "./build.sh"),
    ]));
    assert!(matches!(options.compiler, CompilerCommand::Script { .. }));

    let options = EngineOptions::from_lookup(lookup(&[("MRS_CC", "clang")]));
    assert_eq!(
        options.compiler,
        CompilerCommand::Cc {
            program: "clang".into()
        }
    );
}

#[test]
fn test_invalid_values_are_ignored() {
    let options = EngineOptions::from_lookup(lookup(&[
        ("MRS_EVAL_STRATEGY", "jit"),
        ("MRS_MAX_COMPILE_SLOTS", "many"),
        ("MRS_MAX_CASCADE_DEPTH", "0"),
    ]));
    assert_eq!(options, EngineOptions::default());
}
