//! Flat expression IR.
//!
//! Nodes live in an [`ExprArena`] and refer to each other through
//! [`ExprId`] indices; call arguments are stored contiguously and addressed
//! by an [`ExprRange`]. Symbols are interned per arena as [`SymbolId`]s so
//! numeric bindings can be a plain indexed table.
//!
//! The arithmetic constructors fold numeric operands and the usual 0/1
//! identities. Parsing, substitution and differentiation all build through
//! them, so every formula handed out is already in folded form.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::builtins::{Builtin, Constant};

/// Index into an [`ExprArena`].
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct ExprId(u32);

impl ExprId {
    #[inline]
    pub const fn new(index: u32) -> Self {
        ExprId(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExprId({})", self.0)
    }
}

/// Interned symbol within one arena.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct SymbolId(u32);

impl SymbolId {
    #[inline]
    pub const fn new(index: u32) -> Self {
        SymbolId(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymbolId({})", self.0)
    }
}

/// Contiguous run of call arguments in [`ExprArena::args`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct ExprRange {
    pub start: u32,
    pub len: u16,
}

impl ExprRange {
    pub const EMPTY: ExprRange = ExprRange { start: 0, len: 0 };

    #[inline]
    pub const fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
        }
    }

    /// Binding strength, higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Add | BinaryOp::Sub => 1,
            BinaryOp::Mul | BinaryOp::Div => 2,
            BinaryOp::Pow => 4,
        }
    }
}

/// One node.
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum ExprKind {
    Num(f64),
    Const(Constant),
    Sym(SymbolId),
    Neg(ExprId),
    Binary {
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
    },
    Call {
        func: Builtin,
        args: ExprRange,
    },
}

/// Storage for the nodes and symbols of one formula.
#[derive(Clone, Debug, Default)]
pub struct ExprArena {
    exprs: Vec<ExprKind>,
    args: Vec<ExprId>,
    symbols: Vec<String>,
    symbol_index: FxHashMap<String, SymbolId>,
}

impl ExprArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of allocated nodes, reachable or not.
    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    #[inline]
    pub fn get(&self, id: ExprId) -> &ExprKind {
        &self.exprs[id.index()]
    }

    #[inline]
    pub fn args(&self, range: ExprRange) -> &[ExprId] {
        let start = range.start as usize;
        &self.args[start..start + range.len()]
    }

    /// Numeric value of a node, if it is a literal.
    #[inline]
    pub fn as_num(&self, id: ExprId) -> Option<f64> {
        match *self.get(id) {
            ExprKind::Num(value) => Some(value),
            _ => None,
        }
    }

    fn alloc(&mut self, kind: ExprKind) -> ExprId {
        let index = u32::try_from(self.exprs.len()).unwrap_or(u32::MAX);
        self.exprs.push(kind);
        ExprId::new(index)
    }

    // Symbols

    pub fn intern_symbol(&mut self, name: &str) -> SymbolId {
        if let Some(&id) = self.symbol_index.get(name) {
            return id;
        }
        let id = SymbolId::new(u32::try_from(self.symbols.len()).unwrap_or(u32::MAX));
        self.symbols.push(name.to_owned());
        self.symbol_index.insert(name.to_owned(), id);
        id
    }

    pub fn lookup_symbol(&self, name: &str) -> Option<SymbolId> {
        self.symbol_index.get(name).copied()
    }

    pub fn symbol_name(&self, id: SymbolId) -> &str {
        &self.symbols[id.index()]
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    /// All interned symbols in interning order.
    pub fn symbols(&self) -> impl Iterator<Item = (SymbolId, &str)> {
        self.symbols.iter().enumerate().map(|(i, name)| {
            (
                SymbolId::new(u32::try_from(i).unwrap_or(u32::MAX)),
                name.as_str(),
            )
        })
    }

    // Leaves

    pub fn num(&mut self, value: f64) -> ExprId {
        self.alloc(ExprKind::Num(value))
    }

    pub fn constant(&mut self, constant: Constant) -> ExprId {
        self.alloc(ExprKind::Const(constant))
    }

    pub fn sym(&mut self, id: SymbolId) -> ExprId {
        self.alloc(ExprKind::Sym(id))
    }

    /// Intern `name` and allocate a reference to it.
    pub fn named(&mut self, name: &str) -> ExprId {
        let id = self.intern_symbol(name);
        self.sym(id)
    }

    // Folding constructors

    pub fn neg(&mut self, operand: ExprId) -> ExprId {
        let kind = *self.get(operand);
        match kind {
            ExprKind::Num(value) => self.num(-value),
            ExprKind::Neg(inner) => inner,
            _ => self.alloc(ExprKind::Neg(operand)),
        }
    }

    pub fn add(&mut self, left: ExprId, right: ExprId) -> ExprId {
        match (self.as_num(left), self.as_num(right)) {
            (Some(a), Some(b)) => self.num(a + b),
            (Some(a), None) if a == 0.0 => right,
            (None, Some(b)) if b == 0.0 => left,
            _ => self.binary(BinaryOp::Add, left, right),
        }
    }

    pub fn sub(&mut self, left: ExprId, right: ExprId) -> ExprId {
        if left == right {
            return self.num(0.0);
        }
        match (self.as_num(left), self.as_num(right)) {
            (Some(a), Some(b)) => self.num(a - b),
            (Some(a), None) if a == 0.0 => self.neg(right),
            (None, Some(b)) if b == 0.0 => left,
            _ => self.binary(BinaryOp::Sub, left, right),
        }
    }

    pub fn mul(&mut self, left: ExprId, right: ExprId) -> ExprId {
        match (self.as_num(left), self.as_num(right)) {
            (Some(a), Some(b)) => self.num(a * b),
            (Some(a), _) | (_, Some(a)) if a == 0.0 => self.num(0.0),
            (Some(a), None) if a == 1.0 => right,
            (None, Some(b)) if b == 1.0 => left,
            (Some(a), None) if a == -1.0 => self.neg(right),
            (None, Some(b)) if b == -1.0 => self.neg(left),
            (Some(a), None) => {
                // Collect numeric coefficients: 3*(2*t) -> 6*t
                let kind = *self.get(right);
                if let ExprKind::Binary {
                    op: BinaryOp::Mul,
                    left: inner,
                    right: rest,
                } = kind
                {
                    if let Some(b) = self.as_num(inner) {
                        let coefficient = self.num(a * b);
                        return self.binary(BinaryOp::Mul, coefficient, rest);
                    }
                }
                self.binary(BinaryOp::Mul, left, right)
            }
            _ => self.binary(BinaryOp::Mul, left, right),
        }
    }

    pub fn div(&mut self, left: ExprId, right: ExprId) -> ExprId {
        match (self.as_num(left), self.as_num(right)) {
            // A zero denominator stays symbolic so evaluation reports it.
            (_, Some(b)) if b == 0.0 => self.binary(BinaryOp::Div, left, right),
            (Some(a), Some(b)) => self.num(a / b),
            (Some(a), None) if a == 0.0 => self.num(0.0),
            (None, Some(b)) if b == 1.0 => left,
            _ => self.binary(BinaryOp::Div, left, right),
        }
    }

    pub fn pow(&mut self, base: ExprId, exponent: ExprId) -> ExprId {
        match (self.as_num(base), self.as_num(exponent)) {
            (Some(a), Some(b)) if a >= 0.0 || b.fract() == 0.0 => {
                let value = a.powf(b);
                if value.is_finite() {
                    self.num(value)
                } else {
                    self.binary(BinaryOp::Pow, base, exponent)
                }
            }
            (_, Some(b)) if b == 0.0 => self.num(1.0),
            (_, Some(b)) if b == 1.0 => base,
            (Some(a), None) if a == 1.0 => self.num(1.0),
            _ => self.binary(BinaryOp::Pow, base, exponent),
        }
    }

    pub fn binary(&mut self, op: BinaryOp, left: ExprId, right: ExprId) -> ExprId {
        self.alloc(ExprKind::Binary { op, left, right })
    }

    /// Apply the folding constructor for `op`.
    pub fn fold_binary(&mut self, op: BinaryOp, left: ExprId, right: ExprId) -> ExprId {
        match op {
            BinaryOp::Add => self.add(left, right),
            BinaryOp::Sub => self.sub(left, right),
            BinaryOp::Mul => self.mul(left, right),
            BinaryOp::Div => self.div(left, right),
            BinaryOp::Pow => self.pow(left, right),
        }
    }

    pub fn call(&mut self, func: Builtin, args: &[ExprId]) -> ExprId {
        let start = u32::try_from(self.args.len()).unwrap_or(u32::MAX);
        let len = u16::try_from(args.len()).unwrap_or(u16::MAX);
        self.args.extend_from_slice(args);
        self.alloc(ExprKind::Call {
            func,
            args: ExprRange { start, len },
        })
    }
}

/// A parsed formula: an arena plus the root node.
#[derive(Clone, Debug)]
pub struct Formula {
    pub(crate) arena: ExprArena,
    pub(crate) root: ExprId,
}

impl Formula {
    pub fn new(arena: ExprArena, root: ExprId) -> Self {
        Formula { arena, root }
    }

    /// A formula that is a single number.
    pub fn number(value: f64) -> Self {
        let mut arena = ExprArena::new();
        let root = arena.num(value);
        Formula { arena, root }
    }

    #[inline]
    pub fn arena(&self) -> &ExprArena {
        &self.arena
    }

    #[inline]
    pub fn root(&self) -> ExprId {
        self.root
    }

    /// Literal value of the whole formula, if it folded to a number.
    pub fn as_number(&self) -> Option<f64> {
        self.arena.as_num(self.root)
    }

    pub fn symbol(&self, name: &str) -> Option<SymbolId> {
        self.arena.lookup_symbol(name)
    }

    pub fn symbol_name(&self, id: SymbolId) -> &str {
        self.arena.symbol_name(id)
    }

    pub fn symbol_count(&self) -> usize {
        self.arena.symbol_count()
    }

    /// Id of `name`, interning it when the formula does not mention it yet.
    ///
    /// Used to give a compiled function a parameter that folding removed.
    pub fn intern_symbol(&mut self, name: &str) -> SymbolId {
        self.arena.intern_symbol(name)
    }

    /// Symbols reachable from the root, in ascending id order.
    pub fn free_symbols(&self) -> Vec<SymbolId> {
        let mut seen = vec![false; self.arena.symbol_count()];
        self.walk(self.root, &mut |kind| {
            if let ExprKind::Sym(id) = kind {
                seen[id.index()] = true;
            }
        });
        seen.iter()
            .enumerate()
            .filter(|(_, used)| **used)
            .map(|(i, _)| SymbolId::new(u32::try_from(i).unwrap_or(u32::MAX)))
            .collect()
    }

    /// Whether `name` is referenced by the formula.
    pub fn mentions(&self, name: &str) -> bool {
        self.symbol(name)
            .is_some_and(|id| self.free_symbols().contains(&id))
    }

    /// Whether the imaginary unit appears anywhere.
    pub fn uses_imaginary(&self) -> bool {
        self.any(|kind| matches!(kind, ExprKind::Const(Constant::I)))
    }

    /// Whether `Vector(..)` appears anywhere.
    pub fn uses_vector(&self) -> bool {
        self.any(|kind| {
            matches!(
                kind,
                ExprKind::Call {
                    func: Builtin::Vector,
                    ..
                }
            )
        })
    }

    fn any(&self, pred: impl Fn(&ExprKind) -> bool) -> bool {
        let mut found = false;
        self.walk(self.root, &mut |kind| found |= pred(kind));
        found
    }

    fn walk<F: FnMut(&ExprKind)>(&self, id: ExprId, visit: &mut F) {
        crate::stack::ensure_sufficient_stack(|| {
            let kind = self.arena.get(id);
            visit(kind);
            match *kind {
                ExprKind::Num(_) | ExprKind::Const(_) | ExprKind::Sym(_) => {}
                ExprKind::Neg(operand) => self.walk(operand, visit),
                ExprKind::Binary { left, right, .. } => {
                    self.walk(left, visit);
                    self.walk(right, visit);
                }
                ExprKind::Call { args, .. } => {
                    for &arg in self.arena.args(args) {
                        self.walk(arg, visit);
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests;
