//! Pratt precedence tables.
//!
//! Levels follow the base spec's operator-precedence ordering, lowest to
//! highest: `assign < comma < null-join < || < && < | < ^ < & < eq < cmp <
//! shift < add < mul < unary prefix < unary postfix < member`. Tuple/array/
//! call-argument commas are each handled by their own list production
//! rather than as a binary operator at "comma" level, and there is no
//! token for "null-join" in this surface grammar, so both levels are
//! documented here but have no entry in [`infix_binding`].

use corec_ast::BinOpKind;
use corec_scanner::Tok;

/// Binding power of an infix/postfix-assignment operator. Higher binds
/// tighter. `Assign` is the only right-associative level; everything else
/// is left-associative.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Prec {
    Lowest,
    Assign,
    LogOr,
    LogAnd,
    BitOr,
    BitXor,
    BitAnd,
    Equality,
    Comparison,
    Shift,
    Additive,
    Multiplicative,
}

impl Prec {
    #[must_use]
    pub const fn is_right_assoc(self) -> bool {
        matches!(self, Prec::Assign)
    }

    /// One level tighter than `self`, for climbing past a left-associative
    /// operator so same-precedence operators nest to the left. Saturates
    /// at `Multiplicative`, the tightest level this table defines.
    #[must_use]
    pub const fn next(self) -> Prec {
        match self {
            Prec::Lowest => Prec::Assign,
            Prec::Assign => Prec::LogOr,
            Prec::LogOr => Prec::LogAnd,
            Prec::LogAnd => Prec::BitOr,
            Prec::BitOr => Prec::BitXor,
            Prec::BitXor => Prec::BitAnd,
            Prec::BitAnd => Prec::Equality,
            Prec::Equality => Prec::Comparison,
            Prec::Comparison => Prec::Shift,
            Prec::Shift => Prec::Additive,
            Prec::Additive => Prec::Multiplicative,
            Prec::Multiplicative => Prec::Multiplicative,
        }
    }
}

/// Look up the binding power and [`BinOpKind`] for a token appearing in
/// infix position, if any.
#[must_use]
pub fn infix_binding(tok: Tok) -> Option<(Prec, BinOpKind)> {
    use BinOpKind as B;
    use Prec as P;
    Some(match tok {
        Tok::Assign => (P::Assign, B::Assign),
        Tok::PipePipe => (P::LogOr, B::LogOr),
        Tok::AmpAmp => (P::LogAnd, B::LogAnd),
        Tok::Pipe => (P::BitOr, B::BitOr),
        Tok::Caret => (P::BitXor, B::BitXor),
        Tok::Amp => (P::BitAnd, B::BitAnd),
        Tok::EqEq => (P::Equality, B::Eq),
        Tok::NotEq => (P::Equality, B::Ne),
        Tok::Lt => (P::Comparison, B::Lt),
        Tok::Le => (P::Comparison, B::Le),
        Tok::Gt => (P::Comparison, B::Gt),
        Tok::Ge => (P::Comparison, B::Ge),
        Tok::Shl => (P::Shift, B::Shl),
        Tok::Shr => (P::Shift, B::Shr),
        Tok::Plus => (P::Additive, B::Add),
        Tok::Minus => (P::Additive, B::Sub),
        Tok::Star => (P::Multiplicative, B::Mul),
        Tok::Slash => (P::Multiplicative, B::Div),
        Tok::Percent => (P::Multiplicative, B::Rem),
        _ => return None,
    })
}

/// `x op= y` desugars to `x = x op y` (the parser reuses `x`'s `NodeId` on
/// both sides and marks it [`corec_ast::NodeFlags::SHARED`], the same flag
/// template instantiation uses for structurally-shared subtrees).
#[must_use]
pub fn compound_assign_op(tok: Tok) -> Option<BinOpKind> {
    use BinOpKind as B;
    Some(match tok {
        Tok::PlusAssign => B::Add,
        Tok::MinusAssign => B::Sub,
        Tok::StarAssign => B::Mul,
        Tok::SlashAssign => B::Div,
        Tok::PercentAssign => B::Rem,
        Tok::AmpAssign => B::BitAnd,
        Tok::PipeAssign => B::BitOr,
        Tok::CaretAssign => B::BitXor,
        Tok::ShlAssign => B::Shl,
        Tok::ShrAssign => B::Shr,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplicative_binds_tighter_than_additive() {
        let (mul, _) = infix_binding(Tok::Star).unwrap();
        let (add, _) = infix_binding(Tok::Plus).unwrap();
        assert!(mul > add);
    }

    #[test]
    fn assign_is_lowest_and_right_associative() {
        let (assign, _) = infix_binding(Tok::Assign).unwrap();
        assert_eq!(assign, Prec::Assign);
        assert!(assign.is_right_assoc());
        let (shift, _) = infix_binding(Tok::Shl).unwrap();
        assert!(!shift.is_right_assoc());
    }

    #[test]
    fn compound_assign_maps_to_underlying_op() {
        assert_eq!(compound_assign_op(Tok::PlusAssign), Some(BinOpKind::Add));
        assert_eq!(compound_assign_op(Tok::Assign), None);
    }
}
