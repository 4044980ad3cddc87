//! Command handlers for the `mrsc` CLI.
//!
//! Handlers print their result and exit with status 1 on failure.

mod demo;
mod formula;
mod native;

pub use demo::demo;
pub use formula::{diff_formula, emit_c, eval_formula};
pub use native::probe_native;

use mrs_formula::{parse, Formula};

/// Print `message` to stderr and exit with status 1.
pub(crate) fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {message}");
    std::process::exit(1);
}

pub(crate) fn parse_or_exit(text: &str) -> Formula {
    match parse(text) {
        Ok(formula) => formula,
        Err(err) => fail(format_args!("cannot parse `{text}`: {err}")),
    }
}

/// Parse `name=value` command-line bindings.
pub(crate) fn parse_assignments(args: &[String]) -> Result<Vec<(String, f64)>, String> {
    args.iter()
        .map(|arg| {
            let (name, value) = arg
                .split_once('=')
                .ok_or_else(|| format!("expected symbol=value, found `{arg}`"))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(format!("missing symbol name in `{arg}`"));
            }
            let value = value
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("`{}` is not a number", value.trim()))?;
            Ok((name.to_owned(), value))
        })
        .collect()
}
