use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_intern_symbol_is_stable() {
    let mut arena = ExprArena::new();
    let a = arena.intern_symbol("g1_duration");
    let b = arena.intern_symbol("g2_area");
    assert_eq!(arena.intern_symbol("g1_duration"), a);
    assert_ne!(a, b);
    assert_eq!(arena.symbol_name(b), "g2_area");
    assert_eq!(arena.lookup_symbol("nope"), None);
    assert_eq!(arena.symbol_count(), 2);
}

#[test]
fn test_numeric_folding() {
    let mut arena = ExprArena::new();
    let two = arena.num(2.0);
    let three = arena.num(3.0);
    let sum = arena.add(two, three);
    assert_eq!(arena.as_num(sum), Some(5.0));
    let product = arena.mul(sum, three);
    assert_eq!(arena.as_num(product), Some(15.0));
    let power = arena.pow(two, three);
    assert_eq!(arena.as_num(power), Some(8.0));
    let negated = arena.neg(power);
    assert_eq!(arena.as_num(negated), Some(-8.0));
}

#[test]
fn test_identities() {
    let mut arena = ExprArena::new();
    let x = arena.named("x");
    let zero = arena.num(0.0);
    let one = arena.num(1.0);

    assert_eq!(arena.add(x, zero), x);
    assert_eq!(arena.add(zero, x), x);
    assert_eq!(arena.sub(x, zero), x);
    assert_eq!(arena.mul(x, one), x);
    assert_eq!(arena.div(x, one), x);
    assert_eq!(arena.pow(x, one), x);

    let product = arena.mul(zero, x);
    assert_eq!(arena.as_num(product), Some(0.0));
    let power = arena.pow(x, zero);
    assert_eq!(arena.as_num(power), Some(1.0));
    let diff = arena.sub(x, x);
    assert_eq!(arena.as_num(diff), Some(0.0));
}

#[test]
fn test_double_negation_cancels() {
    let mut arena = ExprArena::new();
    let x = arena.named("x");
    let neg = arena.neg(x);
    assert_eq!(arena.neg(neg), x);
}

#[test]
fn test_division_by_literal_zero_stays_symbolic() {
    let mut arena = ExprArena::new();
    let one = arena.num(1.0);
    let zero = arena.num(0.0);
    let quotient = arena.div(one, zero);
    assert!(matches!(
        arena.get(quotient),
        ExprKind::Binary {
            op: BinaryOp::Div,
            ..
        }
    ));
}

#[test]
fn test_negative_base_fractional_power_stays_symbolic() {
    let mut arena = ExprArena::new();
    let base = arena.num(-4.0);
    let half = arena.num(0.5);
    let root = arena.pow(base, half);
    assert_eq!(arena.as_num(root), None);
}

#[test]
fn test_call_arguments_are_contiguous() {
    let mut arena = ExprArena::new();
    let x = arena.named("x");
    let y = arena.named("y");
    let call = arena.call(Builtin::Atan2, &[x, y]);
    let ExprKind::Call { func, args } = *arena.get(call) else {
        panic!("expected a call");
    };
    assert_eq!(func, Builtin::Atan2);
    assert_eq!(arena.args(args), &[x, y]);
}

#[test]
fn test_free_symbols_ignores_folded_away_symbols() {
    let mut arena = ExprArena::new();
    let x = arena.named("x");
    let y = arena.named("y");
    let zero = arena.num(0.0);
    let dead = arena.mul(y, zero);
    let root = arena.add(x, dead);
    let formula = Formula::new(arena, root);

    let free = formula.free_symbols();
    assert_eq!(free.len(), 1);
    assert_eq!(formula.symbol_name(free[0]), "x");
    assert!(formula.mentions("x"));
    assert!(!formula.mentions("y"));
}

#[test]
fn test_imaginary_and_vector_detection() {
    let mut arena = ExprArena::new();
    let i = arena.constant(Constant::I);
    let idx = arena.num(2.0);
    let element = arena.call(Builtin::Vector, &[idx]);
    let root = arena.mul(i, element);
    let formula = Formula::new(arena, root);
    assert!(formula.uses_imaginary());
    assert!(formula.uses_vector());
    assert!(!Formula::number(1.0).uses_imaginary());
}
