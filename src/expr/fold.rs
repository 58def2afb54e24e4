//! Constant folding and trivial-term absorption for binary expressions.

use crate::expr::{BinaryOp, Expr, Width, BOOL};

/// Truncates `value` to `width` bits.
#[must_use]
pub fn mask(value: u64, width: Width) -> u64 {
    if width >= 64 {
        value
    } else {
        value & ((1u64 << width) - 1)
    }
}

/// Interprets the low `width` bits of `value` as a two's complement number.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn to_signed(value: u64, width: Width) -> i64 {
    if width == 0 || width >= 64 {
        return value as i64;
    }
    let shift = 64 - width;
    ((value << shift) as i64) >> shift
}

/// Builds `op(left, right)`, folding constants and absorbing trivial terms.
pub(crate) fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    let width = left.width();
    if let (Some(l), Some(r)) = (left.constant_value(), right.constant_value()) {
        if let Some(result) = fold_constants(op, l, r, width) {
            let result_width = if op.is_comparison() { BOOL } else { width };
            return Expr::constant(result, result_width);
        }
    }

    match op {
        BinaryOp::And if width == BOOL => {
            if left.is_false() || right.is_false() {
                return Expr::false_();
            }
            if left.is_true() {
                return right;
            }
            if right.is_true() || left == right {
                return left;
            }
        }
        BinaryOp::Or if width == BOOL => {
            if left.is_true() || right.is_true() {
                return Expr::true_();
            }
            if left.is_false() {
                return right;
            }
            if right.is_false() || left == right {
                return left;
            }
        }
        BinaryOp::Add => {
            if right.constant_value() == Some(0) {
                return left;
            }
            if left.constant_value() == Some(0) {
                return right;
            }
        }
        BinaryOp::Sub => {
            if right.constant_value() == Some(0) {
                return left;
            }
            if left == right {
                return Expr::constant(0, width);
            }
        }
        BinaryOp::Eq => {
            if left == right {
                return Expr::true_();
            }
            if left.is_true() && right.width() == BOOL {
                return right;
            }
        }
        BinaryOp::Ne => {
            if left == right {
                return Expr::false_();
            }
        }
        _ => {}
    }

    Expr::binary_unfolded(op, left, right)
}

/// Evaluates `op` on two constants of `width` bits, returning [`None`] when
/// the operation has no defined result (division by zero, oversized shifts).
fn fold_constants(op: BinaryOp, l: u64, r: u64, width: Width) -> Option<u64> {
    let sl = to_signed(l, width);
    let sr = to_signed(r, width);
    #[allow(clippy::cast_sign_loss)]
    let result = match op {
        BinaryOp::Add => l.wrapping_add(r),
        BinaryOp::Sub => l.wrapping_sub(r),
        BinaryOp::Mul => l.wrapping_mul(r),
        BinaryOp::UDiv => l.checked_div(r)?,
        BinaryOp::SDiv => sl.checked_div(sr)? as u64,
        BinaryOp::URem => l.checked_rem(r)?,
        BinaryOp::SRem => sl.checked_rem(sr)? as u64,
        BinaryOp::And => l & r,
        BinaryOp::Or => l | r,
        BinaryOp::Xor => l ^ r,
        BinaryOp::Shl if r < u64::from(width) => l << r,
        BinaryOp::LShr if r < u64::from(width) => l >> r,
        BinaryOp::AShr if r < u64::from(width) => (sl >> r) as u64,
        BinaryOp::Shl | BinaryOp::LShr | BinaryOp::AShr => return None,
        BinaryOp::Eq => u64::from(l == r),
        BinaryOp::Ne => u64::from(l != r),
        BinaryOp::Ult => u64::from(l < r),
        BinaryOp::Ule => u64::from(l <= r),
        BinaryOp::Ugt => u64::from(l > r),
        BinaryOp::Uge => u64::from(l >= r),
        BinaryOp::Slt => u64::from(sl < sr),
        BinaryOp::Sle => u64::from(sl <= sr),
        BinaryOp::Sgt => u64::from(sl > sr),
        BinaryOp::Sge => u64::from(sl >= sr),
    };
    Some(mask(result, width))
}
