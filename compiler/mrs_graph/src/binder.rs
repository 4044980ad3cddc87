//! Binding formula text to an attribute.
//!
//! Placeholders are whole identifier tokens: with candidates `a1` and `a10`,
//! `a10*2` references only the second. Each placeholder is replaced by the
//! subject's symbol, the text is parsed, and the attribute is linked to its
//! subjects in both directions.

use mrs_formula::{lexer::rewrite_identifiers, parse, Bindings};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::arena::AttrId;
use crate::attribute::{BoundExpr, ConfigSource};
use crate::behavior::PrepareMode;
use crate::context::SimContext;
use crate::diagnostics::Severity;
use crate::error::{AttrError, BindError};
use crate::module::ObserveCandidate;
use crate::value::{PulseAxis, Value, ValueKind};

impl SimContext {
    /// Bind `text` to `attr`, with `candidates` as the possible subjects.
    ///
    /// Any previous binding is dropped first. String attributes take the
    /// text verbatim and enum attributes parse it as an axis name. For
    /// numeric attributes, [`BindError::NotSymbolic`] means no placeholder
    /// occurs in the text and the attribute is left as a literal.
    pub fn set_member(
        &mut self,
        attr: AttrId,
        text: &str,
        candidates: &[ObserveCandidate],
    ) -> Result<(), BindError> {
        let kind = self
            .attrs
            .get(attr)
            .ok_or(AttrError::StaleAttribute(attr))?
            .value
            .kind();
        self.detach_subjects(attr);

        match kind {
            ValueKind::Str => {
                if let Some(attribute) = self.attrs.get_mut(attr) {
                    text.clone_into(&mut attribute.formula);
                }
                self.assign(attr, Value::Str(text.to_owned()));
                return Ok(());
            }
            ValueKind::Enum => {
                self.assign(attr, Value::Enum(PulseAxis::from_name(text)));
                return Ok(());
            }
            _ => {}
        }

        let offered: Vec<(String, AttrId, String)> = candidates
            .iter()
            .filter_map(|c| {
                let symbol = self.symbol_of(c.subject)?;
                Some((c.placeholder.clone(), c.subject, symbol))
            })
            .collect();
        let mut used = vec![false; offered.len()];
        let (rewritten, _) = rewrite_identifiers(text, |ident| {
            let index = offered.iter().position(|(placeholder, _, _)| placeholder == ident)?;
            used[index] = true;
            Some(offered[index].2.clone())
        })
        .map_err(|err| BindError::Parse {
            formula: text.to_owned(),
            source: err.into(),
        })?;

        let mut subjects: SmallVec<[AttrId; 4]> = SmallVec::new();
        let mut subject_symbols: SmallVec<[&str; 4]> = SmallVec::new();
        for (index, (_, subject, symbol)) in offered.iter().enumerate() {
            if !used[index] || subjects.contains(subject) {
                continue;
            }
            if let Some(clash) = subject_symbols.iter().position(|s| *s == symbol.as_str()) {
                return Err(BindError::AmbiguousSymbol {
                    name: symbol.clone(),
                    first: self.qualified_name(subjects[clash]),
                    second: self.qualified_name(*subject),
                });
            }
            subjects.push(*subject);
            subject_symbols.push(symbol);
        }
        if subjects.is_empty() {
            return Err(BindError::NotSymbolic);
        }

        for subject in &subjects {
            let Some(attribute) = self.attrs.get(*subject) else {
                return Err(AttrError::StaleAttribute(*subject).into());
            };
            if !attribute.is_observable() {
                return Err(BindError::NotObservable {
                    subject: self.qualified_name(*subject),
                });
            }
            if !attribute.value.kind().is_numeric() {
                return Err(BindError::NotNumeric {
                    subject: self.qualified_name(*subject),
                });
            }
        }

        let mut expression = parse(&rewritten).map_err(|source| BindError::Parse {
            formula: rewritten.clone(),
            source,
        })?;
        for symbol in expression.free_symbols() {
            let name = expression.symbol_name(symbol);
            if !subject_symbols.contains(&name) {
                return Err(BindError::UnknownSymbol {
                    name: name.to_owned(),
                });
            }
        }

        let mut formula_text = rewritten;
        if let Some((variable, order)) = self.diff_variable(attr) {
            expression = expression.derivative(&variable, order);
            formula_text = expression.to_string();
            debug!(%variable, order, derivative = %formula_text, "differentiated formula");
        }

        let symbols = subject_symbols
            .iter()
            .map(|name| expression.symbol(name))
            .collect();
        let complex = expression.uses_imaginary();
        let bound = BoundExpr {
            bindings: Bindings::for_formula(&expression),
            uses_vector: expression.uses_vector(),
            symbols,
            expression,
        };

        for subject in &subjects {
            if let Some(attribute) = self.attrs.get_mut(*subject) {
                if !attribute.observers.contains(&attr) {
                    attribute.observers.push(attr);
                }
            }
        }
        if let Some(attribute) = self.attrs.get_mut(attr) {
            attribute.complex = complex;
            attribute.imaginary = 0.0;
            attribute.formula = formula_text;
            attribute.subjects = subjects;
            attribute.bound = Some(bound);
            attribute.slots.clear();
            debug!(attribute = %attribute.name, formula = %attribute.formula, "bound formula");
        }
        self.stats.binds += 1;

        self.eval_expression(attr)
            .map(|_| ())
            .map_err(|source| BindError::Eval {
                formula: self.attrs.get(attr).map(|a| a.formula.clone()).unwrap_or_default(),
                source,
            })
    }

    /// Drop the formula and every subject edge of `attr`.
    pub(crate) fn detach_subjects(&mut self, attr: AttrId) {
        let Some(attribute) = self.attrs.get_mut(attr) else {
            return;
        };
        let subjects = std::mem::take(&mut attribute.subjects);
        attribute.formula.clear();
        attribute.bound = None;
        attribute.complex = false;
        attribute.slots.clear();
        for subject in subjects {
            if let Some(subject) = self.attrs.get_mut(subject) {
                subject.observers.retain(|o| *o != attr);
            }
        }
    }

    fn diff_variable(&self, attr: AttrId) -> Option<(String, u32)> {
        let attribute = self.attrs.get(attr)?;
        let request = attribute.diff.as_ref()?;
        let variable = self
            .find_attribute(attribute.module, &request.variable)
            .and_then(|target| self.symbol_of(target))
            .unwrap_or_else(|| request.variable.to_lowercase());
        Some((variable, request.order))
    }

    /// [`set_member`](Self::set_member) with the literal fallback, reporting
    /// failures in VERBOSE mode.
    pub(crate) fn bind_reported(
        &mut self,
        attr: AttrId,
        text: &str,
        candidates: &[ObserveCandidate],
        mode: PrepareMode,
    ) -> bool {
        match self.set_member(attr, text, candidates) {
            Ok(()) => true,
            Err(BindError::NotSymbolic) => self.assign_literal(attr, text, mode),
            Err(err) => {
                self.report_attr(mode, Severity::Error, attr, format!("cannot bind `{text}`: {err}"));
                false
            }
        }
    }

    /// Configuration binding that skips re-parsing when neither the text,
    /// the candidates nor the derivative request changed since the last
    /// successful bind.
    pub(crate) fn bind_config(
        &mut self,
        attr: AttrId,
        text: &str,
        candidates: &[ObserveCandidate],
        mode: PrepareMode,
    ) -> bool {
        if self.config_unchanged(attr, text, candidates) {
            trace!(attr = ?attr, "configuration unchanged, re-evaluating");
            return self.reevaluate_reported(attr, text, mode);
        }
        let ok = self.bind_reported(attr, text, candidates, mode);
        self.record_source(attr, text, candidates, ok);
        ok
    }

    pub(crate) fn config_unchanged(&self, attr: AttrId, text: &str, candidates: &[ObserveCandidate]) -> bool {
        self.attrs.get(attr).is_some_and(|a| {
            a.bound.is_some()
                && a.source.as_ref().is_some_and(|s| {
                    s.ok && s.text == text && s.candidates == candidates && s.diff == a.diff
                })
        })
    }

    /// Remember what `attr` was bound from, with its current derivative
    /// request.
    pub(crate) fn record_source(&mut self, attr: AttrId, text: &str, candidates: &[ObserveCandidate], ok: bool) {
        if let Some(attribute) = self.attrs.get_mut(attr) {
            attribute.source = Some(ConfigSource {
                text: text.to_owned(),
                candidates: candidates.to_vec(),
                diff: attribute.diff.clone(),
                ok,
            });
        }
    }

    pub(crate) fn reevaluate_reported(&mut self, attr: AttrId, text: &str, mode: PrepareMode) -> bool {
        match self.eval_expression(attr) {
            Ok(_) => true,
            Err(err) => {
                self.report_attr(mode, Severity::Error, attr, format!("cannot evaluate `{text}`: {err}"));
                false
            }
        }
    }

    /// Literal text, or a formula without subjects such as `2*Pi`.
    pub(crate) fn assign_literal(&mut self, attr: AttrId, text: &str, mode: PrepareMode) -> bool {
        let Some(attribute) = self.attrs.get(attr) else {
            return false;
        };
        let kind = attribute.value.kind();
        let module = attribute.module;
        if let Some(value) = Value::parse_literal(kind, text) {
            self.assign(attr, value);
            return true;
        }

        let formula = match parse(text) {
            Ok(formula) => formula,
            Err(err) => {
                self.report_attr(mode, Severity::Error, attr, format!("cannot parse `{text}`: {err}"));
                return false;
            }
        };
        if let Some(symbol) = formula.free_symbols().first() {
            let name = formula.symbol_name(*symbol).to_owned();
            self.report_attr(
                mode,
                Severity::Error,
                attr,
                format!("`{name}` is neither an observed attribute nor a known constant"),
            );
            return false;
        }

        let vector = self.modules.get(module).map(|m| m.vector.clone()).unwrap_or_default();
        let bindings = Bindings::for_formula(&formula).with_vector(vector);
        match formula.eval(&bindings) {
            Ok(result) => {
                if let Some(attribute) = self.attrs.get_mut(attr) {
                    attribute.imaginary = result.im;
                }
                self.assign(attr, Value::from_f64(kind, result.re));
                true
            }
            Err(err) => {
                self.report_attr(mode, Severity::Error, attr, format!("cannot evaluate `{text}`: {err}"));
                false
            }
        }
    }

    pub(crate) fn report_attr(&mut self, mode: PrepareMode, severity: Severity, attr: AttrId, message: String) {
        let Some(attribute) = self.attrs.get(attr) else {
            return;
        };
        let module = attribute.module;
        let name = attribute.name.clone();
        self.report(mode, severity, module, Some(&name), message);
    }
}
