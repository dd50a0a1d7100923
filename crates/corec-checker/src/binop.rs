//! Binary-operator classification and per-class operand legality.
//!
//! `BinOpKind` covers five operator families that each check operands
//! differently: arithmetic (numeric operands, result same type),
//! bitwise (integer operands only), logical (bool operands only),
//! comparison (numeric or bool operands, `bool` result), and assignment
//! (checked separately by the caller — its legality is "can the right side
//! `ctypecast` into the left side's type", not a fixed operand-code set).

use corec_ast::{BinOpKind, TypeCode};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOpClass {
    Arithmetic,
    Bitwise,
    Logical,
    Comparison,
}

/// Classify `op`. Panics on `BinOpKind::Assign`, which the checker
/// dispatches before ever reaching `classify`.
#[must_use]
pub fn classify(op: BinOpKind) -> BinOpClass {
    match op {
        BinOpKind::Add | BinOpKind::Sub | BinOpKind::Mul | BinOpKind::Div | BinOpKind::Rem => {
            BinOpClass::Arithmetic
        }
        BinOpKind::BitAnd | BinOpKind::BitOr | BinOpKind::BitXor | BinOpKind::Shl | BinOpKind::Shr => {
            BinOpClass::Bitwise
        }
        BinOpKind::LogAnd | BinOpKind::LogOr => BinOpClass::Logical,
        BinOpKind::Eq | BinOpKind::Ne | BinOpKind::Lt | BinOpKind::Le | BinOpKind::Gt | BinOpKind::Ge => {
            BinOpClass::Comparison
        }
        BinOpKind::Assign => unreachable!("Assign is checked as its own path, not classified"),
    }
}

/// Whether `code` is a legal operand type for operators of `class`.
///
/// Shift right's arithmetic-vs-logical distinction needs no entry here:
/// this only gates which `TypeCode`s a shift accepts (any integer), not how
/// the shift behaves. The SSA builder derives sign-extending-vs-zero-filling
/// from the left operand's signedness once it lowers the already-checked
/// node — `i128`'s own `>>` is sign-extending for negative values and
/// behaves identically to a logical shift for the nonnegative values this
/// system stores for unsigned codes, so there's nothing extra to record.
#[must_use]
pub fn accepts(class: BinOpClass, code: TypeCode) -> bool {
    match class {
        BinOpClass::Arithmetic => code.is_numeric(),
        BinOpClass::Bitwise => code.is_integer(),
        BinOpClass::Logical => matches!(code, TypeCode::Bool),
        BinOpClass::Comparison => code.is_numeric() || matches!(code, TypeCode::Bool),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_accepts_numeric_only() {
        assert!(accepts(BinOpClass::Arithmetic, TypeCode::I32));
        assert!(accepts(BinOpClass::Arithmetic, TypeCode::F64));
        assert!(!accepts(BinOpClass::Arithmetic, TypeCode::Bool));
    }

    #[test]
    fn bitwise_rejects_floats() {
        assert!(accepts(BinOpClass::Bitwise, TypeCode::U32));
        assert!(!accepts(BinOpClass::Bitwise, TypeCode::F32));
    }

    #[test]
    fn logical_accepts_bool_only() {
        assert!(accepts(BinOpClass::Logical, TypeCode::Bool));
        assert!(!accepts(BinOpClass::Logical, TypeCode::I8));
    }

    #[test]
    fn comparison_accepts_numeric_and_bool() {
        assert!(accepts(BinOpClass::Comparison, TypeCode::I64));
        assert!(accepts(BinOpClass::Comparison, TypeCode::Bool));
        assert!(!accepts(BinOpClass::Comparison, TypeCode::Nil));
    }

    #[test]
    fn classify_groups_operators_correctly() {
        assert_eq!(classify(BinOpKind::Mul), BinOpClass::Arithmetic);
        assert_eq!(classify(BinOpKind::Shr), BinOpClass::Bitwise);
        assert_eq!(classify(BinOpKind::LogOr), BinOpClass::Logical);
        assert_eq!(classify(BinOpKind::Ge), BinOpClass::Comparison);
    }

    #[test]
    #[should_panic]
    fn classify_rejects_assign() {
        let _ = classify(BinOpKind::Assign);
    }
}
