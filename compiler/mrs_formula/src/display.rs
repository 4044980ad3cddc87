//! Rendering formulas back to text.
//!
//! Output re-parses to an equivalent formula: parentheses are inserted
//! where precedence or associativity requires them and nowhere else.

use std::fmt::{self, Write};

use crate::ir::{BinaryOp, ExprId, ExprKind, Formula};
use crate::stack::ensure_sufficient_stack;

const PREC_NEG: u8 = 3;
const PREC_ATOM: u8 = 5;

impl Formula {
    fn precedence(&self, id: ExprId) -> u8 {
        match *self.arena.get(id) {
            ExprKind::Num(value) if value.is_sign_negative() => PREC_NEG,
            ExprKind::Neg(_) => PREC_NEG,
            ExprKind::Binary { op, .. } => op.precedence(),
            _ => PREC_ATOM,
        }
    }

    fn write_expr(&self, id: ExprId, out: &mut String) {
        ensure_sufficient_stack(|| match *self.arena.get(id) {
            ExprKind::Num(value) => write_number(value, out),
            ExprKind::Const(constant) => out.push_str(constant.name()),
            ExprKind::Sym(symbol) => out.push_str(self.arena.symbol_name(symbol)),
            ExprKind::Neg(operand) => {
                out.push('-');
                self.write_operand(operand, self.precedence(operand) < PREC_NEG, out);
            }
            ExprKind::Binary { op, left, right } => {
                let prec = op.precedence();
                let left_parens = if op == BinaryOp::Pow {
                    self.precedence(left) <= prec
                } else {
                    self.precedence(left) < prec
                };
                let right_prec = self.precedence(right);
                let right_parens = right_prec == PREC_NEG
                    || match op {
                        BinaryOp::Add | BinaryOp::Mul | BinaryOp::Pow => right_prec < prec,
                        BinaryOp::Sub | BinaryOp::Div => right_prec <= prec,
                    };
                self.write_operand(left, left_parens, out);
                out.push_str(op.symbol());
                self.write_operand(right, right_parens, out);
            }
            ExprKind::Call { func, args } => {
                out.push_str(func.name());
                out.push('(');
                for (i, &arg) in self.arena.args(args).iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write_expr(arg, out);
                }
                out.push(')');
            }
        });
    }

    fn write_operand(&self, id: ExprId, parens: bool, out: &mut String) {
        if parens {
            out.push('(');
            self.write_expr(id, out);
            out.push(')');
        } else {
            self.write_expr(id, out);
        }
    }
}

fn write_number(value: f64, out: &mut String) {
    if value.is_nan() {
        out.push_str("NaN");
    } else if value.is_infinite() {
        out.push_str(if value > 0.0 { "inf" } else { "-inf" });
    } else {
        let _ = write!(out, "{value}");
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.write_expr(self.root, &mut out);
        f.write_str(&out)
    }
}
