//! Content-keyed cache of compiled formulas.

use std::path::{Path, PathBuf};

use mrs_formula::CSource;
use rustc_hash::FxHashMap;
use tempfile::TempDir;
use tracing::{debug, info};

use crate::compiler::CompilerCommand;
use crate::error::NativeError;
use crate::library::CompiledFunction;

/// Turns C sources into callable functions.
///
/// The engine talks to the native tier only through this trait, so a
/// context can run with a real compiler, a disabled tier, or a test double.
pub trait NativeBackend {
    fn compile(&mut self, source: &CSource) -> Result<CompiledFunction, NativeError>;

    /// Short description for logs.
    fn describe(&self) -> String;
}

/// Where sources and shared objects are written.
#[derive(Debug)]
enum Scratch {
    Owned(TempDir),
    Borrowed(PathBuf),
}

impl Scratch {
    fn path(&self) -> &Path {
        match self {
            Scratch::Owned(dir) => dir.path(),
            Scratch::Borrowed(path) => path.as_path(),
        }
    }
}

/// Counters for the native tier.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct NativeStats {
    /// Compiler invocations.
    pub compilations: u64,
    /// Requests answered from the cache.
    pub cache_hits: u64,
    /// Failed compilations or loads.
    pub failures: u64,
}

/// The native tier: external compiler, scratch directory, loaded functions.
///
/// Identical C sources are compiled once per process and share the loaded
/// library.
#[derive(Debug)]
pub struct NativeCompiler {
    command: CompilerCommand,
    scratch: Option<Scratch>,
    scratch_override: Option<PathBuf>,
    loaded: FxHashMap<String, CompiledFunction>,
    next_unit: u64,
    stats: NativeStats,
}

impl NativeCompiler {
    pub fn new(command: CompilerCommand) -> Self {
        NativeCompiler {
            command,
            scratch: None,
            scratch_override: None,
            loaded: FxHashMap::default(),
            next_unit: 0,
            stats: NativeStats::default(),
        }
    }

    /// Write sources under `dir` instead of a private temporary directory.
    #[must_use]
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_override = Some(dir.into());
        self
    }

    pub fn command(&self) -> &CompilerCommand {
        &self.command
    }

    pub fn stats(&self) -> NativeStats {
        self.stats
    }

    fn scratch_dir(&mut self) -> Result<PathBuf, NativeError> {
        if let Some(scratch) = &self.scratch {
            return Ok(scratch.path().to_owned());
        }
        let scratch = match &self.scratch_override {
            Some(dir) => {
                std::fs::create_dir_all(dir).map_err(|e| NativeError::io(dir.clone(), &e))?;
                Scratch::Borrowed(dir.clone())
            }
            None => Scratch::Owned(
                tempfile::Builder::new()
                    .prefix("mrs-native-")
                    .tempdir()
                    .map_err(|e| NativeError::io(std::env::temp_dir(), &e))?,
            ),
        };
        let path = scratch.path().to_owned();
        debug!(dir = %path.display(), "native scratch directory");
        self.scratch = Some(scratch);
        Ok(path)
    }

    fn build(&mut self, source: &CSource) -> Result<CompiledFunction, NativeError> {
        let dir = self.scratch_dir()?;
        let unit = self.next_unit;
        self.next_unit += 1;

        let path = dir.join(format!("mrs_{}_{unit}.c", std::process::id()));
        std::fs::write(&path, &source.code).map_err(|e| NativeError::io(path.clone(), &e))?;

        self.stats.compilations += 1;
        let library = self.command.compile(&path)?;
        CompiledFunction::load(&library, source.arity, source.complex)
    }
}

impl Default for NativeCompiler {
    fn default() -> Self {
        NativeCompiler::new(CompilerCommand::default())
    }
}

impl NativeBackend for NativeCompiler {
    fn compile(&mut self, source: &CSource) -> Result<CompiledFunction, NativeError> {
        if let Some(function) = self.loaded.get(&source.code) {
            self.stats.cache_hits += 1;
            return Ok(function.clone());
        }

        match self.build(source) {
            Ok(function) => {
                info!(
                    arity = source.arity,
                    complex = source.complex,
                    "compiled formula to native code"
                );
                self.loaded.insert(source.code.clone(), function.clone());
                Ok(function)
            }
            Err(err) => {
                self.stats.failures += 1;
                Err(err)
            }
        }
    }

    fn describe(&self) -> String {
        format!("native ({})", self.command.program())
    }
}

/// A backend that never compiles.
#[derive(Copy, Clone, Debug, Default)]
pub struct DisabledBackend;

impl NativeBackend for DisabledBackend {
    fn compile(&mut self, _source: &CSource) -> Result<CompiledFunction, NativeError> {
        Err(NativeError::Disabled)
    }

    fn describe(&self) -> String {
        "disabled".to_owned()
    }
}
