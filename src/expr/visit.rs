//! Structural traversals over expressions: substitution, shadowing and
//! variable queries.

use std::collections::{BTreeMap, BTreeSet};

use crate::expr::{Array, BinaryOp, Expr, ExprData};

impl Expr {
    /// Rebuilds this node over new `children`, using the smart constructors so
    /// that the result is folded again.
    ///
    /// The children must be given in the order of [`Expr::children`].
    #[must_use]
    pub fn rebuild(&self, mut children: Vec<Expr>) -> Expr {
        let mut next = || children.remove(0);
        match self.data() {
            ExprData::Constant { .. } | ExprData::Read { .. } => self.clone(),
            ExprData::Not { .. } => Expr::not(next()),
            ExprData::ZExt { width, .. } => Expr::zext(next(), *width),
            ExprData::SExt { width, .. } => Expr::sext(next(), *width),
            ExprData::Binary { op, .. } => {
                let left = next();
                let right = next();
                Expr::binary(*op, left, right)
            }
            ExprData::Select { .. } => {
                let condition = next();
                let true_value = next();
                let false_value = next();
                Expr::select(condition, true_value, false_value)
            }
            ExprData::Exists { variables, .. } => Expr::exists(variables.clone(), next()),
        }
    }

    /// Replaces every occurrence of a key of `substitution` by its value.
    #[must_use]
    pub fn substitute(&self, substitution: &BTreeMap<Expr, Expr>) -> Expr {
        if substitution.is_empty() {
            return self.clone();
        }
        if let Some(replacement) = substitution.get(self) {
            return replacement.clone();
        }
        let children = self.children();
        if children.is_empty() {
            return self.clone();
        }
        let new_children: Vec<Expr> = children.into_iter().map(|c| c.substitute(substitution)).collect();
        if new_children.iter().zip(self.children()).all(|(new, old)| new == old) {
            return self.clone();
        }
        self.rebuild(new_children)
    }

    /// Replaces every occurrence of `target` by `replacement`.
    #[must_use]
    pub fn replace(&self, target: &Expr, replacement: &Expr) -> Expr {
        let substitution = BTreeMap::from([(target.clone(), replacement.clone())]);
        self.substitute(&substitution)
    }

    /// Renames every array read by the expression to its shadow array, adding
    /// the shadow arrays to `replacements`.
    #[must_use]
    pub fn shadow(&self, replacements: &mut BTreeSet<Array>) -> Expr {
        match self.data() {
            ExprData::Constant { .. } => self.clone(),
            ExprData::Read { array, width } => {
                if array.is_shadow() {
                    return self.clone();
                }
                let shadow = array.shadow();
                replacements.insert(shadow.clone());
                Expr::read(shadow, *width)
            }
            _ => {
                let children = self.children().into_iter().map(|c| c.shadow(replacements)).collect();
                self.rebuild(children)
            }
        }
    }

    /// Collects every array read by the expression.
    #[must_use]
    pub fn arrays(&self) -> BTreeSet<Array> {
        let mut arrays = BTreeSet::new();
        let mut work = vec![self];
        while let Some(expr) = work.pop() {
            if let ExprData::Read { array, .. } = expr.data() {
                arrays.insert(array.clone());
            }
            work.extend(expr.children());
        }
        arrays
    }

    /// Checks whether the expression reads any of `arrays`.
    #[must_use]
    pub fn reads_any_of(&self, arrays: &BTreeSet<Array>) -> bool {
        self.arrays().iter().any(|a| arrays.contains(a))
    }

    /// Checks whether the expression reads an array that is not in `arrays`.
    #[must_use]
    pub fn reads_other_than(&self, arrays: &BTreeSet<Array>) -> bool {
        self.arrays().iter().any(|a| !arrays.contains(a))
    }

    /// Checks whether `sub` occurs anywhere within the expression.
    #[must_use]
    pub fn has_subexpression(&self, sub: &Expr) -> bool {
        let mut work = vec![self];
        while let Some(expr) = work.pop() {
            if expr == sub {
                return true;
            }
            work.extend(expr.children());
        }
        false
    }

    /// Splits a boolean expression into its top-level conjuncts.
    #[must_use]
    pub fn conjuncts(&self) -> Vec<Expr> {
        let mut result = vec![];
        let mut work = vec![self.clone()];
        while let Some(expr) = work.pop() {
            match expr.as_binary() {
                Some((BinaryOp::And, left, right)) if expr.width() == crate::expr::BOOL => {
                    work.push(right.clone());
                    work.push(left.clone());
                }
                _ => result.push(expr),
            }
        }
        result
    }

    /// Conjoins `exprs`, yielding [`None`] for an empty sequence.
    #[must_use]
    pub fn conjunction(exprs: impl IntoIterator<Item = Expr>) -> Option<Expr> {
        exprs.into_iter().reduce(Expr::and)
    }
}
