//! `probe`: does the native tier work on this machine?

use mrs_graph::EngineOptions;
use mrs_native::{probe, NativeBackend, NativeCompiler};

pub fn probe_native() {
    let options = EngineOptions::from_env();
    let mut compiler = NativeCompiler::new(options.compiler);
    if let Some(dir) = options.scratch_dir {
        compiler = compiler.with_scratch_dir(dir);
    }
    let backend = compiler.describe();
    match probe(&mut compiler) {
        Ok(()) => println!("{backend}: available"),
        Err(err) => {
            println!("{backend}: unavailable, formulas will be interpreted");
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
