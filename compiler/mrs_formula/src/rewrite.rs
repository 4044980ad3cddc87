//! Substitution and specialization.
//!
//! Both rebuild the formula into a fresh arena through the folding
//! constructors, so substituted numbers collapse every constant subtree they
//! feed into.

use num_complex::Complex64;
use tracing::trace;

use crate::builtins::Constant;
use crate::eval::{apply_builtin, Bindings};
use crate::ir::{ExprArena, ExprId, ExprKind, Formula, SymbolId};
use crate::stack::ensure_sufficient_stack;

impl Formula {
    /// Replace every bound symbol by its value and fold.
    ///
    /// Unbound symbols stay free. Complex values become `re + im*I`. Calls
    /// whose arguments all folded to numbers are evaluated when the result
    /// is real, `Vector(i)` included.
    pub fn specialize(&self, bindings: &Bindings) -> Formula {
        let mut target = ExprArena::new();
        let root = self.rebuild(self.root, &mut target, Some(bindings));
        trace!(
            before = self.arena.len(),
            after = target.len(),
            "specialized formula"
        );
        Formula::new(target, root)
    }

    /// Copy only the reachable nodes into a fresh arena.
    ///
    /// Symbol ids are renumbered; symbols no longer referenced are dropped.
    pub fn compact(&self) -> Formula {
        let mut target = ExprArena::new();
        let root = self.rebuild(self.root, &mut target, None);
        Formula::new(target, root)
    }

    fn rebuild(&self, id: ExprId, target: &mut ExprArena, bindings: Option<&Bindings>) -> ExprId {
        ensure_sufficient_stack(|| match *self.arena.get(id) {
            ExprKind::Num(value) => target.num(value),
            ExprKind::Const(constant) => target.constant(constant),
            ExprKind::Sym(symbol) => match bindings.and_then(|b| b.get(symbol)) {
                Some(value) => complex_literal(target, value),
                None => target.named(self.arena.symbol_name(symbol)),
            },
            ExprKind::Neg(operand) => {
                let operand = self.rebuild(operand, target, bindings);
                target.neg(operand)
            }
            ExprKind::Binary { op, left, right } => {
                let left = self.rebuild(left, target, bindings);
                let right = self.rebuild(right, target, bindings);
                let folded = target.fold_binary(op, left, right);
                // A substituted 0 or 1 never absorbs an operand that is still
                // symbolic: its poles have to reach evaluation.
                let absorbed = target.as_num(folded).is_some()
                    && (target.as_num(left).is_none() || target.as_num(right).is_none());
                if bindings.is_some() && absorbed {
                    target.binary(op, left, right)
                } else {
                    folded
                }
            }
            ExprKind::Call { func, args } => {
                let args: smallvec::SmallVec<[ExprId; 4]> = self
                    .arena
                    .args(args)
                    .iter()
                    .map(|&arg| self.rebuild(arg, target, bindings))
                    .collect();

                if let Some(bindings) = bindings {
                    let numeric: Option<smallvec::SmallVec<[Complex64; 4]>> = args
                        .iter()
                        .map(|&arg| target.as_num(arg).map(|v| Complex64::new(v, 0.0)))
                        .collect();
                    if let Some(numeric) = numeric {
                        if let Ok(value) = apply_builtin(func, &numeric, bindings.vector()) {
                            if value.im == 0.0 && !value.re.is_nan() {
                                return target.num(value.re);
                            }
                        }
                    }
                }
                target.call(func, &args)
            }
        })
    }
}

/// Literal for a substituted value.
fn complex_literal(target: &mut ExprArena, value: Complex64) -> ExprId {
    let re = target.num(value.re);
    if value.im == 0.0 {
        return re;
    }
    let im = target.num(value.im);
    let unit = target.constant(Constant::I);
    let imaginary = target.mul(im, unit);
    target.add(re, imaginary)
}

/// Symbols of `formula` that `bindings` leaves free.
pub fn unbound_symbols(formula: &Formula, bindings: &Bindings) -> Vec<SymbolId> {
    formula
        .free_symbols()
        .into_iter()
        .filter(|&symbol| bindings.get(symbol).is_none())
        .collect()
}
