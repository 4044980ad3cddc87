use std::path::PathBuf;

use mrs_formula::CodegenError;
use thiserror::Error;

/// Failure anywhere between C emission and a callable function.
#[derive(Debug, Error)]
pub enum NativeError {
    /// The formula could not be rendered as C.
    #[error(transparent)]
    Codegen(#[from] CodegenError),

    /// Compiler executable not found.
    #[error("compiler '{program}' not found: {message}")]
    CompilerNotFound { program: String, message: String },

    /// Compiler ran and failed.
    #[error(
        "compiling with '{program}' failed{}{}\n\nCommand: {command}",
        exit_suffix(.exit_code),
        stderr_suffix(.stderr)
    )]
    CompileFailed {
        program: String,
        exit_code: Option<i32>,
        stderr: String,
        command: String,
    },

    /// Compiler reported success but produced nothing.
    #[error("compiler did not produce '{}'", .path.display())]
    MissingOutput { path: PathBuf },

    /// Scratch directory or source file I/O.
    #[error("I/O error at '{}': {message}", .path.display())]
    Io { path: PathBuf, message: String },

    /// The shared object could not be loaded.
    #[error("failed to load '{}': {message}", .path.display())]
    Load { path: PathBuf, message: String },

    /// The shared object lacks an expected entry point.
    #[error("'{}' does not export `{symbol}`", .path.display())]
    MissingSymbol { path: PathBuf, symbol: &'static str },

    /// The backend refuses to compile (disabled tier).
    #[error("native compilation is disabled")]
    Disabled,
}

impl NativeError {
    pub(crate) fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        NativeError::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

fn exit_suffix(code: &Option<i32>) -> String {
    code.map(|code| format!(" (exit code {code})"))
        .unwrap_or_default()
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!("\n\nCompiler stderr:\n{stderr}")
    }
}
