//! Formula commands: `eval`, `diff` and `emit-c`.

use mrs_formula::{to_c, unbound_symbols, Bindings, Formula};

use super::{fail, parse_assignments, parse_or_exit};

fn bindings_from_args(formula: &Formula, args: &[String]) -> Bindings {
    let assignments = parse_assignments(args).unwrap_or_else(|err| fail(err));
    let mut bindings = Bindings::for_formula(formula);
    for (name, value) in assignments {
        if !bindings.set_by_name(formula, &name, value) {
            eprintln!("warning: `{name}` does not occur in the formula");
        }
    }
    bindings
}

pub fn eval_formula(text: &str, args: &[String]) {
    let formula = parse_or_exit(text);
    let bindings = bindings_from_args(&formula, args);

    let unbound = unbound_symbols(&formula, &bindings);
    if !unbound.is_empty() {
        let names: Vec<&str> = unbound.iter().map(|s| formula.symbol_name(*s)).collect();
        fail(format_args!("unbound symbols: {}", names.join(", ")));
    }
    match formula.eval(&bindings) {
        Ok(value) if value.im == 0.0 => println!("{}", value.re),
        Ok(value) => println!("{} + {}*I", value.re, value.im),
        Err(err) => fail(err),
    }
}

pub fn diff_formula(text: &str, symbol: &str, order: Option<&str>) {
    let formula = parse_or_exit(text);
    let order = match order {
        None => 1,
        Some(raw) => raw
            .parse::<u32>()
            .unwrap_or_else(|_| fail(format_args!("`{raw}` is not a derivative order"))),
    };
    println!("{}", formula.derivative(symbol, order));
}

pub fn emit_c(text: &str, free: &str, args: &[String]) {
    let formula = parse_or_exit(text);
    let bindings = bindings_from_args(&formula, args);
    let mut specialized = formula.specialize(&bindings);
    let param = specialized.intern_symbol(free);
    match to_c(&specialized, &[param], &[]) {
        Ok(source) => {
            println!("/* {specialized} */");
            print!("{}", source.code);
        }
        Err(err) => fail(err),
    }
}
