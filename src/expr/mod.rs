//! This module contains the symbolic expression handle used throughout the
//! engine.
//!
//! Expressions are immutable trees that share their subtrees, so cloning an
//! [`Expr`] is cheap. They are hashable and totally ordered, which allows them
//! to be used as keys in the engine's stores. All construction goes through
//! smart constructors that fold constants and absorb trivial boolean terms.

pub mod fold;
pub mod visit;

use std::{
    collections::BTreeSet,
    fmt::{Display, Formatter},
    sync::Arc,
};

use itertools::Itertools;

/// The width of an expression in bits.
pub type Width = u32;

/// The width of a boolean expression.
pub const BOOL: Width = 1;

/// The width of a pointer-typed expression.
pub const POINTER_WIDTH: Width = 64;

/// A symbolic array, the source of symbolic variables.
///
/// Every array has a shadow counterpart that is used to rename the variables
/// of an interpolant so that they can be quantified existentially.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Array {
    name:   Arc<str>,
    shadow: bool,
}

impl Array {
    /// Creates a new array with the provided `name`.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        let name = name.into();
        Self {
            name,
            shadow: false,
        }
    }

    /// Gets the name of the array.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Checks if this array is the shadow of another.
    #[must_use]
    pub fn is_shadow(&self) -> bool {
        self.shadow
    }

    /// Gets the shadow counterpart of this array.
    #[must_use]
    pub fn shadow(&self) -> Self {
        Self {
            name:   self.name.clone(),
            shadow: true,
        }
    }
}

impl Display for Array {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.shadow {
            write!(f, "{}__shadow", self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// The binary operators of the expression language.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    UDiv,
    SDiv,
    URem,
    SRem,
    And,
    Or,
    Xor,
    Shl,
    LShr,
    AShr,
    Eq,
    Ne,
    Ult,
    Ule,
    Ugt,
    Uge,
    Slt,
    Sle,
    Sgt,
    Sge,
}

impl BinaryOp {
    /// Checks if the operator produces a boolean.
    #[must_use]
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq
                | Self::Ne
                | Self::Ult
                | Self::Ule
                | Self::Ugt
                | Self::Uge
                | Self::Slt
                | Self::Sle
                | Self::Sgt
                | Self::Sge
        )
    }

    /// Gets the comparison that holds exactly when `self` does not.
    #[must_use]
    pub fn negated(self) -> Option<Self> {
        let negated = match self {
            Self::Eq => Self::Ne,
            Self::Ne => Self::Eq,
            Self::Ult => Self::Uge,
            Self::Ule => Self::Ugt,
            Self::Ugt => Self::Ule,
            Self::Uge => Self::Ult,
            Self::Slt => Self::Sge,
            Self::Sle => Self::Sgt,
            Self::Sgt => Self::Sle,
            Self::Sge => Self::Slt,
            _ => return None,
        };
        Some(negated)
    }

    /// Gets the printable name of the operator.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Add => "Add",
            Self::Sub => "Sub",
            Self::Mul => "Mul",
            Self::UDiv => "UDiv",
            Self::SDiv => "SDiv",
            Self::URem => "URem",
            Self::SRem => "SRem",
            Self::And => "And",
            Self::Or => "Or",
            Self::Xor => "Xor",
            Self::Shl => "Shl",
            Self::LShr => "LShr",
            Self::AShr => "AShr",
            Self::Eq => "Eq",
            Self::Ne => "Ne",
            Self::Ult => "Ult",
            Self::Ule => "Ule",
            Self::Ugt => "Ugt",
            Self::Uge => "Uge",
            Self::Slt => "Slt",
            Self::Sle => "Sle",
            Self::Sgt => "Sgt",
            Self::Sge => "Sge",
        }
    }
}

/// The node kinds of an expression tree.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ExprData {
    /// A constant of the given width. The value is always masked to the width.
    Constant { value: u64, width: Width },

    /// A symbolic variable.
    Read { array: Array, width: Width },

    /// Bitwise negation.
    Not { expr: Expr },

    /// Zero extension to `width`.
    ZExt { expr: Expr, width: Width },

    /// Sign extension to `width`.
    SExt { expr: Expr, width: Width },

    Binary {
        op:    BinaryOp,
        left:  Expr,
        right: Expr,
    },

    Select {
        condition:   Expr,
        true_value:  Expr,
        false_value: Expr,
    },

    /// Existential quantification of `body` over the variables of the arrays.
    Exists {
        variables: BTreeSet<Array>,
        body:      Expr,
    },
}

/// A handle to an immutable, shared, symbolic expression.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Expr {
    data: Arc<ExprData>,
}

impl Expr {
    fn wrap(data: ExprData) -> Self {
        Self {
            data: Arc::new(data),
        }
    }

    /// Gets the node at the root of this expression.
    #[must_use]
    pub fn data(&self) -> &ExprData {
        &self.data
    }

    /// Creates a constant of `width` bits. The value is truncated to the width.
    #[must_use]
    pub fn constant(value: u64, width: Width) -> Self {
        Self::wrap(ExprData::Constant {
            value: fold::mask(value, width),
            width,
        })
    }

    /// Creates a boolean constant.
    #[must_use]
    pub fn bool(value: bool) -> Self {
        Self::constant(u64::from(value), BOOL)
    }

    /// Creates the constant `true`.
    #[must_use]
    pub fn true_() -> Self {
        Self::bool(true)
    }

    /// Creates the constant `false`.
    #[must_use]
    pub fn false_() -> Self {
        Self::bool(false)
    }

    /// Creates a pointer-width constant.
    #[must_use]
    pub fn pointer(value: u64) -> Self {
        Self::constant(value, POINTER_WIDTH)
    }

    /// Creates a symbolic variable reading `width` bits from `array`.
    #[must_use]
    pub fn read(array: Array, width: Width) -> Self {
        Self::wrap(ExprData::Read { array, width })
    }

    /// Creates a bitwise negation.
    #[must_use]
    pub fn not(expr: Expr) -> Self {
        match expr.data() {
            ExprData::Constant { value, width } => Self::constant(!value, *width),
            ExprData::Not { expr } => expr.clone(),
            _ => Self::wrap(ExprData::Not { expr }),
        }
    }

    /// Creates a zero extension of `expr` to `width` bits.
    #[must_use]
    pub fn zext(expr: Expr, width: Width) -> Self {
        if expr.width() == width {
            return expr;
        }
        match expr.data() {
            ExprData::Constant { value, .. } => Self::constant(*value, width),
            _ => Self::wrap(ExprData::ZExt { expr, width }),
        }
    }

    /// Creates a sign extension of `expr` to `width` bits.
    #[must_use]
    pub fn sext(expr: Expr, width: Width) -> Self {
        if expr.width() == width {
            return expr;
        }
        match expr.data() {
            #[allow(clippy::cast_sign_loss)]
            ExprData::Constant { value, width: from } => {
                Self::constant(fold::to_signed(*value, *from) as u64, width)
            }
            _ => Self::wrap(ExprData::SExt { expr, width }),
        }
    }

    /// Creates the binary expression `op(left, right)`, folding it where
    /// possible.
    #[must_use]
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        fold::binary(op, left, right)
    }

    /// Creates the binary expression `op(left, right)` without any folding.
    ///
    /// This is used where the caller relies on the shape of the result, such as
    /// when assembling a query whose top-level conjunction is taken apart
    /// later.
    #[must_use]
    pub fn binary_unfolded(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Self::wrap(ExprData::Binary { op, left, right })
    }

    #[must_use]
    pub fn add(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Add, left, right)
    }

    #[must_use]
    pub fn sub(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Sub, left, right)
    }

    #[must_use]
    pub fn eq(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Eq, left, right)
    }

    #[must_use]
    pub fn ult(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Ult, left, right)
    }

    #[must_use]
    pub fn and(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::And, left, right)
    }

    #[must_use]
    pub fn or(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Or, left, right)
    }

    /// Creates the logical negation of a boolean expression, in the form
    /// `false == expr`.
    #[must_use]
    pub fn negate(expr: Expr) -> Self {
        if let Some(value) = expr.constant_value() {
            return Self::bool(value == 0);
        }
        if let ExprData::Binary {
            op: BinaryOp::Eq,
            left,
            right,
        } = expr.data()
        {
            if left.is_false() {
                return right.clone();
            }
        }
        Self::binary_unfolded(BinaryOp::Eq, Self::false_(), expr)
    }

    /// Creates an if-then-else expression.
    #[must_use]
    pub fn select(condition: Expr, true_value: Expr, false_value: Expr) -> Self {
        if let Some(value) = condition.constant_value() {
            return if value == 0 { false_value } else { true_value };
        }
        if true_value == false_value {
            return true_value;
        }
        Self::wrap(ExprData::Select {
            condition,
            true_value,
            false_value,
        })
    }

    /// Quantifies `body` existentially over `variables`. Quantifying over
    /// nothing, or quantifying a constant, yields the body itself.
    #[must_use]
    pub fn exists(variables: BTreeSet<Array>, body: Expr) -> Self {
        if variables.is_empty() || body.is_constant() {
            return body;
        }
        Self::wrap(ExprData::Exists { variables, body })
    }

    /// Gets the width of the expression in bits.
    #[must_use]
    pub fn width(&self) -> Width {
        match self.data() {
            ExprData::Constant { width, .. }
            | ExprData::Read { width, .. }
            | ExprData::ZExt { width, .. }
            | ExprData::SExt { width, .. } => *width,
            ExprData::Not { expr } => expr.width(),
            ExprData::Binary { op, left, .. } => {
                if op.is_comparison() {
                    BOOL
                } else {
                    left.width()
                }
            }
            ExprData::Select { true_value, .. } => true_value.width(),
            ExprData::Exists { .. } => BOOL,
        }
    }

    /// Checks if the expression is a constant.
    #[must_use]
    pub fn is_constant(&self) -> bool {
        matches!(self.data(), ExprData::Constant { .. })
    }

    /// Gets the zero-extended value of the expression if it is a constant.
    #[must_use]
    pub fn constant_value(&self) -> Option<u64> {
        match self.data() {
            ExprData::Constant { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// Checks if the expression is the boolean constant `true`.
    #[must_use]
    pub fn is_true(&self) -> bool {
        matches!(self.data(), ExprData::Constant { value: 1, width: BOOL })
    }

    /// Checks if the expression is the boolean constant `false`.
    #[must_use]
    pub fn is_false(&self) -> bool {
        matches!(self.data(), ExprData::Constant { value: 0, width: BOOL })
    }

    /// Checks if the expression is a symbolic variable.
    #[must_use]
    pub fn is_variable(&self) -> bool {
        matches!(self.data(), ExprData::Read { .. })
    }

    /// Gets the operator and operands if the expression is a binary one.
    #[must_use]
    pub fn as_binary(&self) -> Option<(BinaryOp, &Expr, &Expr)> {
        match self.data() {
            ExprData::Binary { op, left, right } => Some((*op, left, right)),
            _ => None,
        }
    }

    /// Gets the direct children of the expression.
    #[must_use]
    pub fn children(&self) -> Vec<&Expr> {
        match self.data() {
            ExprData::Constant { .. } | ExprData::Read { .. } => vec![],
            ExprData::Not { expr } | ExprData::ZExt { expr, .. } | ExprData::SExt { expr, .. } => {
                vec![expr]
            }
            ExprData::Binary { left, right, .. } => vec![left, right],
            ExprData::Select {
                condition,
                true_value,
                false_value,
            } => vec![condition, true_value, false_value],
            ExprData::Exists { body, .. } => vec![body],
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.data() {
            ExprData::Constant { value, width } => {
                if *width == BOOL {
                    write!(f, "{}", if *value == 0 { "false" } else { "true" })
                } else {
                    write!(f, "{value}")
                }
            }
            ExprData::Read { array, width } => write!(f, "(Read w{width} {array})"),
            ExprData::Not { expr } => write!(f, "(Not {expr})"),
            ExprData::ZExt { expr, width } => write!(f, "(ZExt w{width} {expr})"),
            ExprData::SExt { expr, width } => write!(f, "(SExt w{width} {expr})"),
            ExprData::Binary { op, left, right } => {
                if op.is_comparison() {
                    write!(f, "({} {left} {right})", op.name())
                } else {
                    write!(f, "({} w{} {left} {right})", op.name(), self.width())
                }
            }
            ExprData::Select {
                condition,
                true_value,
                false_value,
            } => write!(f, "(Select {condition} {true_value} {false_value})"),
            ExprData::Exists { variables, body } => {
                write!(f, "(Exists [{}] {body})", variables.iter().join(", "))
            }
        }
    }
}
