//! Symbolic differentiation.
//!
//! Derivatives are built in place in a copy of the formula's arena through
//! the folding constructors, then compacted. Piecewise-constant builtins
//! (`csgn`, `floor`, `equal`, `gt`, `lt`, `Vector`) differentiate to zero.

use smallvec::SmallVec;
use tracing::debug;

use crate::builtins::Builtin;
use crate::ir::{BinaryOp, ExprArena, ExprId, ExprKind, Formula, SymbolId};
use crate::stack::ensure_sufficient_stack;

impl Formula {
    /// The `order`-th derivative with respect to the symbol `var`.
    ///
    /// Order 0 returns a copy. A formula that does not mention `var`
    /// differentiates to 0.
    pub fn derivative(&self, var: &str, order: u32) -> Formula {
        let mut current = self.clone();
        for _ in 0..order {
            let Some(symbol) = current.symbol(var) else {
                return Formula::number(0.0);
            };
            let mut arena = current.arena.clone();
            let root = differentiate(&mut arena, current.root, symbol);
            current = Formula::new(arena, root).compact();
        }
        debug!(var, order, result = %current, "differentiated formula");
        current
    }
}

fn is_zero(arena: &ExprArena, id: ExprId) -> bool {
    arena.as_num(id) == Some(0.0)
}

fn differentiate(arena: &mut ExprArena, id: ExprId, var: SymbolId) -> ExprId {
    let kind = *arena.get(id);
    ensure_sufficient_stack(|| match kind {
        ExprKind::Num(_) | ExprKind::Const(_) => arena.num(0.0),
        ExprKind::Sym(symbol) => arena.num(if symbol == var { 1.0 } else { 0.0 }),
        ExprKind::Neg(operand) => {
            let d = differentiate(arena, operand, var);
            arena.neg(d)
        }
        ExprKind::Binary { op, left, right } => {
            let du = differentiate(arena, left, var);
            let dv = differentiate(arena, right, var);
            match op {
                BinaryOp::Add => arena.add(du, dv),
                BinaryOp::Sub => arena.sub(du, dv),
                BinaryOp::Mul => {
                    let a = arena.mul(du, right);
                    let b = arena.mul(left, dv);
                    arena.add(a, b)
                }
                BinaryOp::Div => {
                    if is_zero(arena, dv) {
                        return arena.div(du, right);
                    }
                    let a = arena.mul(du, right);
                    let b = arena.mul(left, dv);
                    let numerator = arena.sub(a, b);
                    let two = arena.num(2.0);
                    let denominator = arena.pow(right, two);
                    arena.div(numerator, denominator)
                }
                BinaryOp::Pow => diff_pow(arena, id, left, right, du, dv),
            }
        }
        ExprKind::Call { func, args } => {
            let args: SmallVec<[ExprId; 4]> = arena.args(args).iter().copied().collect();
            diff_call(arena, func, &args, var)
        }
    })
}

fn diff_pow(
    arena: &mut ExprArena,
    whole: ExprId,
    base: ExprId,
    exponent: ExprId,
    dbase: ExprId,
    dexponent: ExprId,
) -> ExprId {
    if is_zero(arena, dexponent) {
        // v * u^(v-1) * u'
        let one = arena.num(1.0);
        let reduced = arena.sub(exponent, one);
        let power = arena.pow(base, reduced);
        let scaled = arena.mul(exponent, power);
        return arena.mul(scaled, dbase);
    }
    // u^v * (v' * log(u) + v * u' / u)
    let log = arena.call(Builtin::Log, &[base]);
    let a = arena.mul(dexponent, log);
    let b = arena.mul(exponent, dbase);
    let b = arena.div(b, base);
    let inner = arena.add(a, b);
    arena.mul(whole, inner)
}

fn diff_call(arena: &mut ExprArena, func: Builtin, args: &[ExprId], var: SymbolId) -> ExprId {
    if func.is_step_like() {
        return arena.num(0.0);
    }

    let u = args[0];
    let du = differentiate(arena, u, var);

    match func {
        Builtin::Mod => {
            // x - floor(x/y)*y
            let y = args[1];
            let dy = differentiate(arena, y, var);
            let ratio = arena.div(u, y);
            let floor = arena.call(Builtin::Floor, &[ratio]);
            let term = arena.mul(floor, dy);
            return arena.sub(du, term);
        }
        Builtin::Ite => {
            let dx = differentiate(arena, args[2], var);
            let dy = differentiate(arena, args[3], var);
            if is_zero(arena, dx) && is_zero(arena, dy) {
                return arena.num(0.0);
            }
            return arena.call(Builtin::Ite, &[args[0], args[1], dx, dy]);
        }
        Builtin::Atan2 => {
            // atan2(y, x)' = (x*y' - y*x') / (x^2 + y^2)
            let x = args[1];
            let dx = differentiate(arena, x, var);
            let a = arena.mul(x, du);
            let b = arena.mul(u, dx);
            let numerator = arena.sub(a, b);
            let two = arena.num(2.0);
            let xx = arena.pow(x, two);
            let yy = arena.pow(u, two);
            let denominator = arena.add(xx, yy);
            return arena.div(numerator, denominator);
        }
        _ => {}
    }

    if is_zero(arena, du) {
        return arena.num(0.0);
    }

    let outer = match func {
        Builtin::Sin => arena.call(Builtin::Cos, &[u]),
        Builtin::Cos => {
            let sin = arena.call(Builtin::Sin, &[u]);
            arena.neg(sin)
        }
        Builtin::Tan => {
            let tan = arena.call(Builtin::Tan, &[u]);
            let two = arena.num(2.0);
            let sq = arena.pow(tan, two);
            let one = arena.num(1.0);
            arena.add(one, sq)
        }
        Builtin::Asin | Builtin::Acos => {
            let two = arena.num(2.0);
            let sq = arena.pow(u, two);
            let one = arena.num(1.0);
            let inner = arena.sub(one, sq);
            let root = arena.call(Builtin::Sqrt, &[inner]);
            let one = arena.num(1.0);
            let inv = arena.div(one, root);
            if func == Builtin::Acos {
                arena.neg(inv)
            } else {
                inv
            }
        }
        Builtin::Atan => {
            let two = arena.num(2.0);
            let sq = arena.pow(u, two);
            let one = arena.num(1.0);
            let denominator = arena.add(one, sq);
            let one = arena.num(1.0);
            arena.div(one, denominator)
        }
        Builtin::Sinh => arena.call(Builtin::Cosh, &[u]),
        Builtin::Cosh => arena.call(Builtin::Sinh, &[u]),
        Builtin::Tanh => {
            let tanh = arena.call(Builtin::Tanh, &[u]);
            let two = arena.num(2.0);
            let sq = arena.pow(tanh, two);
            let one = arena.num(1.0);
            arena.sub(one, sq)
        }
        Builtin::Exp => arena.call(Builtin::Exp, &[u]),
        Builtin::Log => {
            let one = arena.num(1.0);
            arena.div(one, u)
        }
        Builtin::Sqrt => {
            let root = arena.call(Builtin::Sqrt, &[u]);
            let two = arena.num(2.0);
            let denominator = arena.mul(two, root);
            let one = arena.num(1.0);
            arena.div(one, denominator)
        }
        Builtin::Abs => arena.call(Builtin::Csgn, &[u]),
        // Handled above.
        Builtin::Atan2
        | Builtin::Mod
        | Builtin::Ite
        | Builtin::Csgn
        | Builtin::Floor
        | Builtin::Equal
        | Builtin::Gt
        | Builtin::Lt
        | Builtin::Vector => return arena.num(0.0),
    };
    arena.mul(outer, du)
}
