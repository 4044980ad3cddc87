//! `mrsc`: evaluate, differentiate and compile formulas, or run a demo graph.

mod commands;

use commands::{demo, diff_formula, emit_c, eval_formula, probe_native};

fn main() {
    init_logging();
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    match args[1].as_str() {
        "eval" => {
            if args.len() < 3 {
                eprintln!("Usage: mrsc eval \"<formula>\" [symbol=value ...]");
                std::process::exit(1);
            }
            eval_formula(&args[2], &args[3..]);
        }
        "diff" => {
            if args.len() < 4 {
                eprintln!("Usage: mrsc diff \"<formula>\" <symbol> [order]");
                std::process::exit(1);
            }
            diff_formula(&args[2], &args[3], args.get(4).map(String::as_str));
        }
        "emit-c" => {
            if args.len() < 4 {
                eprintln!("Usage: mrsc emit-c \"<formula>\" <free-symbol> [symbol=value ...]");
                std::process::exit(1);
            }
            emit_c(&args[2], &args[3], &args[4..]);
        }
        "probe" => probe_native(),
        "demo" => demo(),
        "help" | "--help" | "-h" => print_usage(),
        "version" | "--version" | "-V" => {
            println!("mrsc {}", env!("CARGO_PKG_VERSION"));
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}

/// Logging is off unless `RUST_LOG` is set; `MRS_LOG_TREE` nests cascade
/// spans.
fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_err() {
        return;
    }
    let filter = EnvFilter::from_default_env();
    if std::env::var_os("MRS_LOG_TREE").is_some() {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_tree::HierarchicalLayer::new(2)
                    .with_targets(true)
                    .with_writer(std::io::stderr),
            )
            .try_init();
    } else {
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .try_init();
    }
}

fn print_usage() {
    println!("mrsc - sequence-module formula engine");
    println!();
    println!("Usage: mrsc <command> [arguments]");
    println!();
    println!("Commands:");
    println!("  eval \"<formula>\" [sym=value ...]              Evaluate a formula");
    println!("  diff \"<formula>\" <symbol> [order]             Print the n-th derivative");
    println!("  emit-c \"<formula>\" <free> [sym=value ...]     Print C for a specialization");
    println!("  probe                                         Check the native compiler");
    println!("  demo                                          Run a small module graph");
    println!();
    println!("Environment:");
    println!("  RUST_LOG             Enable logging (e.g. mrs_graph=debug)");
    println!("  MRS_LOG_TREE         Render nested spans as a tree");
    println!("  MRS_EVAL_STRATEGY    interpreted | native");
    println!("  MRS_CC               C compiler (default: cc)");
    println!("  MRS_EXCOMPILER       Script turning <source> into <source>.so");
    println!("  MRS_COMPILE_DIR      Scratch directory for native code");
}
