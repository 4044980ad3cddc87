//! Evaluating a bound formula against the current subject values.

use mrs_formula::EvalError;
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::arena::AttrId;
use crate::context::SimContext;
use crate::value::{Value, ValueKind};

/// Outcome of [`SimContext::eval_expression`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Evaluation {
    /// Nothing is bound; the value is a literal.
    Literal,
    /// A subject was NaN and the previous value was kept.
    SkippedNan,
    /// The result was written; `changed` when it differed from the backup.
    Written { changed: bool },
}

impl SimContext {
    /// Recompute `attr` from its subjects and write the result.
    ///
    /// The real part is cast to the attribute's kind; the imaginary part of
    /// a complex formula is kept for [`imaginary`](Self::imaginary). On error
    /// the previous value stays in place.
    pub fn eval_expression(&mut self, attr: AttrId) -> Result<Evaluation, EvalError> {
        let Some(attribute) = self.attrs.get(attr) else {
            return Ok(Evaluation::Literal);
        };
        if attribute.value.kind() == ValueKind::Str {
            if attribute.formula.is_empty() {
                return Ok(Evaluation::Literal);
            }
            let text = attribute.formula.clone();
            let changed = self.assign(attr, Value::Str(text));
            return Ok(Evaluation::Written { changed });
        }
        let Some(bound) = &attribute.bound else {
            return Ok(Evaluation::Literal);
        };

        let mut values: SmallVec<[f64; 4]> = SmallVec::with_capacity(attribute.subjects.len());
        for subject in &attribute.subjects {
            match self.attrs.get(*subject).and_then(|s| s.value.as_f64()) {
                Some(value) if value.is_nan() => {
                    trace!(attr = %attribute.name, "subject is NaN, evaluation skipped");
                    self.stats.skipped_nan += 1;
                    return Ok(Evaluation::SkippedNan);
                }
                Some(value) => values.push(value),
                None => {
                    let name = self.symbol_of(*subject).unwrap_or_default();
                    self.stats.eval_errors += 1;
                    return Err(EvalError::UnboundSymbol { name });
                }
            }
        }
        let vector = if bound.uses_vector {
            self.modules
                .get(attribute.module)
                .map(|m| m.vector.clone())
                .unwrap_or_default()
        } else {
            Vec::new()
        };

        let Some(attribute) = self.attrs.get_mut(attr) else {
            return Ok(Evaluation::Literal);
        };
        let Some(bound) = attribute.bound.as_mut() else {
            return Ok(Evaluation::Literal);
        };
        for (symbol, value) in bound.symbols.iter().zip(&values) {
            if let Some(symbol) = symbol {
                bound.bindings.set(*symbol, *value);
            }
        }
        if bound.uses_vector {
            bound.bindings.set_vector(&vector);
        }

        match bound.expression.eval(&bound.bindings) {
            Ok(result) => {
                if attribute.complex {
                    attribute.imaginary = result.im;
                }
                let value = Value::from_f64(attribute.value.kind(), result.re);
                trace!(attr = %attribute.name, %value, "evaluated");
                self.stats.evaluations += 1;
                let changed = self.assign(attr, value);
                Ok(Evaluation::Written { changed })
            }
            Err(err) => {
                debug!(attr = %attribute.name, formula = %attribute.formula, %err, "evaluation failed");
                self.stats.eval_errors += 1;
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests;
