//! Algebraic simplification of subsumption queries, applied before any solver
//! call.
//!
//! A query has the shape `exists V. interpolant && equalities`, where `V` are
//! the shadow variables of the tabled entry, the interpolant is over `V`, and
//! each equality relates a tabled value (over `V`) to a value of the candidate
//! state (over ordinary variables). Most of the time the equalities determine
//! the shadow variables outright, and the quantifier can be eliminated.

use std::collections::{BTreeMap, BTreeSet};

use crate::expr::{Array, BinaryOp, Expr, ExprData, BOOL};

/// The result of simplifying an existential query.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Simplified {
    /// The simplified query.
    pub query: Expr,

    /// Whether the query is existentially quantified and reads nothing but
    /// its bound variables, so that its validity is the satisfiability of its
    /// body.
    pub closed: bool,
}

impl Simplified {
    fn open(query: Expr) -> Self {
        Self {
            query,
            closed: false,
        }
    }
}

/// Simplifies `exists variables. interpolant && equalities`.
#[must_use]
pub fn simplify_exists(variables: &BTreeSet<Array>, interpolant: &Expr, equalities: &Expr) -> Simplified {
    let mut substitution = BTreeMap::new();
    let mut equalities = collect_substitution(variables, equalities, &mut substitution);
    let interpolant = interpolant.substitute(&substitution);
    if equalities.reads_any_of(variables) {
        equalities = equalities.substitute(&substitution);
    }

    let body = Expr::and(interpolant.clone(), equalities.clone());
    if !body.reads_any_of(variables) {
        return Simplified::open(body);
    }

    simplify_body(variables, &interpolant, &equalities)
}

/// Simplifies the body of a query whose shadow variables could not all be
/// substituted away.
fn simplify_body(variables: &BTreeSet<Array>, interpolant: &Expr, equalities: &Expr) -> Simplified {
    let quantified = |body: Expr| {
        if body.reads_any_of(variables) {
            Expr::exists(variables.clone(), body)
        } else {
            body
        }
    };

    // A disjunctive constraint cannot be taken apart conjunct by conjunct.
    if matches!(equalities.as_binary(), Some((BinaryOp::Or, ..))) {
        return Simplified::open(quantified(Expr::and(interpolant.clone(), equalities.clone())));
    }

    let equalities = simplify_equalities(equalities);
    if equalities.is_false() {
        return Simplified::open(equalities);
    }

    let interpolant = simplify_interpolant(interpolant);
    if interpolant.is_false() {
        return Simplified::open(interpolant);
    }
    let equalities = drop_private_equalities(variables, &interpolant, &equalities);
    if interpolant.is_true() {
        return Simplified::open(quantified(equalities));
    }

    if equalities.is_true() {
        let closed = !interpolant.reads_other_than(variables);
        return Simplified {
            query: quantified(interpolant),
            closed,
        };
    }

    Simplified::open(quantified(Expr::and(interpolant, equalities)))
}

/// Extracts `variable == expr` equalities over the bound `variables` into
/// `substitution`, returning what remains of `equalities`.
fn collect_substitution(
    variables: &BTreeSet<Array>,
    equalities: &Expr,
    substitution: &mut BTreeMap<Expr, Expr>,
) -> Expr {
    match equalities.as_binary() {
        Some((BinaryOp::Eq, left, right))
            if left.is_variable()
                && left.reads_any_of(variables)
                && !substitution.contains_key(left)
                && !right.reads_any_of(variables) =>
        {
            substitution.insert(left.clone(), right.clone());
            Expr::true_()
        }
        Some((BinaryOp::And, left, right)) if equalities.width() == BOOL => {
            let left = collect_substitution(variables, left, substitution);
            let right = collect_substitution(variables, right, substitution);
            Expr::and(left, right)
        }
        _ => equalities.clone(),
    }
}

/// Folds equalities between constants in a conjunction of equalities and
/// disjunctive clauses.
fn simplify_equalities(expr: &Expr) -> Expr {
    match expr.as_binary() {
        Some((BinaryOp::Eq, left, right)) => match (left.constant_value(), right.constant_value()) {
            (Some(l), Some(r)) => Expr::bool(l == r),
            _ => expr.clone(),
        },
        Some((BinaryOp::And, left, right)) if expr.width() == BOOL => {
            let left = simplify_equalities(left);
            if left.is_false() {
                return left;
            }
            Expr::and(left, simplify_equalities(right))
        }
        Some((BinaryOp::Or, left, right)) if expr.width() == BOOL => {
            let left = simplify_equalities(left);
            if left.is_true() {
                return left;
            }
            Expr::or(left, simplify_equalities(right))
        }
        _ => expr.clone(),
    }
}

/// Folds constant comparisons in the interpolant, and turns negated
/// comparisons `false == (a < b)` into their positive form `a >= b`.
#[must_use]
pub fn simplify_interpolant(expr: &Expr) -> Expr {
    match expr.as_binary() {
        Some((BinaryOp::And, left, right)) if expr.width() == BOOL => {
            let left = simplify_interpolant(left);
            if left.is_false() {
                return left;
            }
            Expr::and(left, simplify_interpolant(right))
        }
        Some((op @ (BinaryOp::Eq | BinaryOp::Ne), left, right)) if left.is_constant() && right.is_constant() => {
            Expr::bool((left == right) == (op == BinaryOp::Eq))
        }
        Some((BinaryOp::Eq, left, right)) if left.is_false() => match right.as_binary() {
            Some((op, a, b)) if op != BinaryOp::Eq => match op.negated() {
                Some(negated) => Expr::binary(negated, a.clone(), b.clone()),
                None => expr.clone(),
            },
            _ => expr.clone(),
        },
        _ => expr.clone(),
    }
}

/// Removes the conjuncts of `equalities` that can always be satisfied by
/// choosing their own bound variables, which occur nowhere else.
///
/// Only equalities `v == e` and `v +/- c == e` qualify, where `v` is a bound
/// variable and `c` and `e` read no bound variable, as these always have a
/// solution for `v`.
fn drop_private_equalities(variables: &BTreeSet<Array>, interpolant: &Expr, equalities: &Expr) -> Expr {
    let conjuncts = equalities.conjuncts();
    let kept: Vec<Expr> = conjuncts
        .iter()
        .enumerate()
        .filter(|(index, conjunct)| {
            let Some(variable) = solvable_variable(variables, conjunct) else {
                return true;
            };
            let single = BTreeSet::from([variable]);
            let elsewhere = interpolant.reads_any_of(&single)
                || conjuncts
                    .iter()
                    .enumerate()
                    .any(|(other, expr)| other != *index && expr.reads_any_of(&single));
            elsewhere
        })
        .map(|(_, conjunct)| conjunct.clone())
        .collect();

    Expr::conjunction(kept).unwrap_or_else(Expr::true_)
}

/// Gets the bound variable that `equality` can always be solved for, if any.
fn solvable_variable(variables: &BTreeSet<Array>, equality: &Expr) -> Option<Array> {
    let (BinaryOp::Eq, left, right) = equality.as_binary()? else {
        return None;
    };
    if right.reads_any_of(variables) {
        return None;
    }

    let variable = match left.as_binary() {
        None => left,
        Some((BinaryOp::Add, a, b)) if !b.reads_any_of(variables) => a,
        Some((BinaryOp::Add, a, b)) if !a.reads_any_of(variables) => b,
        Some((BinaryOp::Sub, a, b)) if !b.reads_any_of(variables) => a,
        _ => return None,
    };
    match variable.data() {
        ExprData::Read { array, .. } if variables.contains(array) => Some(array.clone()),
        _ => None,
    }
}

/// Checks the query for equalities that directly contradict an equality of the
/// candidate's path condition, returning `false` if one is found.
///
/// An equality between two distinct constants in the query is a conflict too.
#[must_use]
pub fn detect_conflict_primitives(state_constraints: &[Expr], query: &Expr) -> bool {
    if matches!(query.data(), ExprData::Exists { .. }) {
        return true;
    }

    let mut equalities = vec![];
    for conjunct in query.conjuncts() {
        if let Some((BinaryOp::Eq, left, right)) = conjunct.as_binary() {
            if left.is_constant() && right.is_constant() && left != right {
                return false;
            }
            equalities.push(conjunct);
        }
    }

    for state in state_constraints {
        if !matches!(state.as_binary(), Some((BinaryOp::Eq, ..))) {
            continue;
        }
        for equality in &equalities {
            if state == equality {
                continue;
            }
            if *state == Expr::negate(equality.clone()) || Expr::negate(state.clone()) == *equality {
                return false;
            }
        }
    }

    true
}

#[cfg(test)]
mod test {
    use std::collections::BTreeSet;

    use crate::{
        expr::{Array, BinaryOp, Expr},
        subsumption::simplify::{detect_conflict_primitives, simplify_exists, simplify_interpolant},
    };

    fn var(name: &str) -> Expr {
        Expr::read(Array::new(name), 32)
    }

    fn shadow(name: &str) -> Expr {
        Expr::read(Array::new(name).shadow(), 32)
    }

    fn bound(names: &[&str]) -> BTreeSet<Array> {
        names.iter().map(|n| Array::new(*n).shadow()).collect()
    }

    #[test]
    fn determined_variables_are_substituted_away() {
        let interpolant = Expr::ult(shadow("x"), Expr::constant(10, 32));
        let equalities = Expr::eq(shadow("x"), var("y"));

        let simplified = simplify_exists(&bound(&["x"]), &interpolant, &equalities);

        assert_eq!(simplified.query, Expr::ult(var("y"), Expr::constant(10, 32)));
        assert!(!simplified.closed);
    }

    #[test]
    fn reflexive_queries_become_true() {
        let interpolant = Expr::eq(shadow("x"), Expr::constant(5, 32));
        let equalities = Expr::eq(shadow("x"), Expr::constant(5, 32));

        let simplified = simplify_exists(&bound(&["x"]), &interpolant, &equalities);
        assert!(simplified.query.is_true());
    }

    #[test]
    fn contradicting_constants_become_false() {
        let interpolant = Expr::eq(shadow("x"), Expr::constant(5, 32));
        let equalities = Expr::eq(shadow("x"), Expr::constant(6, 32));

        let simplified = simplify_exists(&bound(&["x"]), &interpolant, &equalities);
        assert!(simplified.query.is_false());
    }

    #[test]
    fn unconstrained_interpolants_are_closed() {
        let interpolant = Expr::ult(shadow("x"), shadow("y"));
        let equalities = Expr::true_();

        let simplified = simplify_exists(&bound(&["x", "y"]), &interpolant, &equalities);
        assert!(simplified.closed);
        assert!(matches!(simplified.query.data(), crate::expr::ExprData::Exists { .. }));
    }

    #[test]
    fn private_offset_equalities_are_dropped() {
        let interpolant = Expr::ult(shadow("x"), Expr::constant(3, 32));
        let equalities = Expr::and(
            Expr::eq(Expr::add(shadow("x"), Expr::constant(1, 32)), var("a")),
            Expr::eq(Expr::add(shadow("z"), Expr::constant(1, 32)), var("b")),
        );

        let simplified = simplify_exists(&bound(&["x", "z"]), &interpolant, &equalities);
        assert!(!simplified.query.reads_any_of(&bound(&["z"])));
        assert!(simplified.query.reads_any_of(&bound(&["x"])));
    }

    #[test]
    fn negated_comparisons_are_normalised() {
        let negated = Expr::negate(Expr::binary(BinaryOp::Slt, var("a"), var("b")));
        assert_eq!(
            simplify_interpolant(&negated),
            Expr::binary(BinaryOp::Sge, var("a"), var("b"))
        );
    }

    #[test]
    fn conflicting_equalities_are_detected() {
        let equality = Expr::eq(var("a"), Expr::constant(1, 32));
        let state = vec![Expr::negate(equality.clone())];

        assert!(!detect_conflict_primitives(&state, &equality));
        assert!(detect_conflict_primitives(&[], &equality));
        assert!(!detect_conflict_primitives(
            &[],
            &Expr::binary_unfolded(BinaryOp::Eq, Expr::constant(1, 32), Expr::constant(2, 32))
        ));
    }
}
