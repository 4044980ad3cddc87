//! External compiler invocation.
//!
//! Two forms are supported. `Cc` drives a C compiler directly; `Script`
//! calls an executable with the source path as its only argument and
//! expects it to produce `<source>.so` next to it.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracing::{debug, trace};

use crate::error::NativeError;

/// How C sources become shared objects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompilerCommand {
    /// `<program> -x c -O2 -fPIC -shared -o <source>.so <source> -lm`
    Cc { program: String },
    /// `<path> <source>`, producing `<source>.so`
    Script { path: PathBuf },
}

impl Default for CompilerCommand {
    fn default() -> Self {
        CompilerCommand::Cc {
            program: "cc".to_owned(),
        }
    }
}

impl CompilerCommand {
    /// Pick the first C compiler that answers `--version`.
    pub fn detect() -> Self {
        for program in ["cc", "gcc", "clang"] {
            if Command::new(program).arg("--version").output().is_ok() {
                return CompilerCommand::Cc {
                    program: program.to_owned(),
                };
            }
        }
        CompilerCommand::default()
    }

    pub fn program(&self) -> String {
        match self {
            CompilerCommand::Cc { program } => program.clone(),
            CompilerCommand::Script { path } => path.display().to_string(),
        }
    }

    /// The shared object produced for `source`.
    pub fn output_path(source: &Path) -> PathBuf {
        let mut name = source.as_os_str().to_owned();
        name.push(".so");
        PathBuf::from(name)
    }

    fn command(&self, source: &Path, output: &Path) -> Command {
        match self {
            CompilerCommand::Cc { program } => {
                let mut cmd = Command::new(program);
                cmd.args(["-x", "c", "-O2", "-fPIC", "-shared", "-o"])
                    .arg(output)
                    .arg(source)
                    .arg("-lm");
                cmd
            }
            CompilerCommand::Script { path } => {
                let mut cmd = Command::new(path);
                cmd.arg(source);
                cmd
            }
        }
    }

    /// Compile `source` and return the shared object path.
    pub fn compile(&self, source: &Path) -> Result<PathBuf, NativeError> {
        let output_path = Self::output_path(source);
        let mut cmd = self.command(source, &output_path);
        debug!(command = ?cmd, "invoking native compiler");

        let output = run(&mut cmd)?;
        if !output.status.success() {
            return Err(NativeError::CompileFailed {
                program: cmd.get_program().to_string_lossy().into(),
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_owned(),
                command: format!("{cmd:?}"),
            });
        }
        if !output_path.exists() {
            return Err(NativeError::MissingOutput { path: output_path });
        }

        trace!(path = %output_path.display(), "native compiler succeeded");
        Ok(output_path)
    }
}

fn run(cmd: &mut Command) -> Result<Output, NativeError> {
    cmd.output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            NativeError::CompilerNotFound {
                program: cmd.get_program().to_string_lossy().into(),
                message: e.to_string(),
            }
        } else {
            NativeError::Io {
                path: PathBuf::from(cmd.get_program()),
                message: e.to_string(),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_appends_suffix() {
        assert_eq!(
            CompilerCommand::output_path(Path::new("/tmp/x/mrs_3.c")),
            PathBuf::from("/tmp/x/mrs_3.c.so")
        );
    }

    #[test]
    fn test_cc_arguments() {
        let compiler = CompilerCommand::default();
        let cmd = compiler.command(Path::new("f.c"), Path::new("f.c.so"));
        let args: Vec<String> = cmd
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        assert_eq!(cmd.get_program(), "cc");
        assert_eq!(
            args,
            ["-x", "c", "-O2", "-fPIC", "-shared", "-o", "f.c.so", "f.c", "-lm"]
        );
    }

    #[test]
    fn test_script_takes_source_only() {
        let compiler = CompilerCommand::Script {
            path: PathBuf::from("/opt/excompiler.sh"),
        };
        let cmd = compiler.command(Path::new("f.c"), Path::new("f.c.so"));
        assert_eq!(cmd.get_args().count(), 1);
        assert_eq!(compiler.program(), "/opt/excompiler.sh");
    }

    #[test]
    fn test_missing_compiler_is_reported() {
        let compiler = CompilerCommand::Cc {
            program: "/nonexistent/mrs-cc".to_owned(),
        };
        let dir = tempfile::tempdir().map_err(|e| e.to_string());
        let Ok(dir) = dir else { return };
        let source = dir.path().join("f.c");
        let result = compiler.compile(&source);
        assert!(matches!(
            result,
            Err(NativeError::CompilerNotFound { .. })
        ));
    }
}
