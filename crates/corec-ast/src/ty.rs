//! Type codes and type identity (typeid) computation.
//!
//! Two types are equal iff their typeids are the identical interned
//! [`Sym`] — pointer equality, not string comparison, per the base spec's
//! invariant 2. Typeids are computed structurally and cached on the type
//! node the first time they're requested.

use crate::arena::NodeArena;
use crate::node::{NodeId, NodeKind, NodePayload};
use bitflags::bitflags;
use corec_common::symbol::Sym;

/// A small enumeration of basic numeric kinds plus sentinels for
/// composite-type encoding, per the base spec's "Type code (TypeCode)".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeCode {
    Bool,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    I128,
    U128,
    F32,
    F64,
    F128,
    Int,
    Uint,
    Nil,
    /// Placeholder type of an untyped literal awaiting context-driven
    /// coercion. Never survives to a successful type-check (invariant 4).
    Ideal,
    /// Target-inferred placeholder for a declaration with no type
    /// annotation; resolved by the checker before `Ideal` would be, so it
    /// never reaches the typeid stage either.
    Auto,
    // Composite sentinels: typeid for these is computed structurally from
    // the owning node's payload, not from a single encoding character.
    Ref,
    Fun,
    Array,
    Tuple,
    Struct,
}

impl TypeCode {
    /// The stable, single-byte printable encoding character for basic
    /// types, per the base spec's "Typeid alphabet" (§6).
    #[must_use]
    pub const fn encoding_char(self) -> Option<char> {
        Some(match self {
            TypeCode::Bool => 'b',
            TypeCode::I8 => 'c',
            TypeCode::U8 => 'B',
            TypeCode::I16 => 's',
            TypeCode::U16 => 'S',
            TypeCode::I32 => 'w',
            TypeCode::U32 => 'W',
            TypeCode::I64 => 'd',
            TypeCode::U64 => 'D',
            TypeCode::I128 => 'e',
            TypeCode::U128 => 'E',
            TypeCode::F32 => 'f',
            TypeCode::F64 => 'F',
            TypeCode::Int => 'i',
            TypeCode::Uint => 'u',
            TypeCode::Nil => '0',
            // f128 has no base-spec alphabet entry; reuse 'F' with a
            // distinguishing composite marker is wrong, so we extend the
            // alphabet minimally with 'q' (quad precision) rather than
            // collide with f64.
            TypeCode::F128 => 'q',
            _ => return None,
        })
    }

    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            TypeCode::I8
                | TypeCode::U8
                | TypeCode::I16
                | TypeCode::U16
                | TypeCode::I32
                | TypeCode::U32
                | TypeCode::I64
                | TypeCode::U64
                | TypeCode::I128
                | TypeCode::U128
                | TypeCode::Int
                | TypeCode::Uint
        )
    }

    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, TypeCode::F32 | TypeCode::F64 | TypeCode::F128)
    }

    #[must_use]
    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            TypeCode::I8
                | TypeCode::I16
                | TypeCode::I32
                | TypeCode::I64
                | TypeCode::I128
                | TypeCode::Int
                | TypeCode::F32
                | TypeCode::F64
                | TypeCode::F128
        )
    }

    #[must_use]
    pub const fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Bit width of an integer or float type; `0` for non-numeric kinds.
    /// `int`/`uint` are treated as 64-bit (the target word size assumed by
    /// this implementation).
    #[must_use]
    pub const fn bit_width(self) -> u32 {
        match self {
            TypeCode::I8 | TypeCode::U8 => 8,
            TypeCode::I16 | TypeCode::U16 => 16,
            TypeCode::I32 | TypeCode::U32 | TypeCode::F32 => 32,
            TypeCode::I64 | TypeCode::U64 | TypeCode::F64 | TypeCode::Int | TypeCode::Uint => 64,
            TypeCode::I128 | TypeCode::U128 | TypeCode::F128 => 128,
            _ => 0,
        }
    }

    /// `min_signed(T)..=max_unsigned(T)`: the inclusive range an integer
    /// literal must fall within to `ctypecast` into `T` without overflow,
    /// per the base spec's testable property 6. Only meaningful for
    /// integer kinds.
    #[must_use]
    pub fn literal_range(self) -> Option<(i128, i128)> {
        if !self.is_integer() {
            return None;
        }
        let width = if matches!(self, TypeCode::Int | TypeCode::Uint) {
            64
        } else {
            self.bit_width()
        };
        let min_signed: i128 = -(1i128 << (width - 1));
        let max_unsigned: i128 = (1i128 << width) - 1;
        Some((min_signed, max_unsigned))
    }
}

bitflags! {
    /// Per-type flags cached alongside a type's `TypeCode`: kind, size,
    /// signedness, and a few derived facts queried often enough to be
    /// worth pre-computing.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct TypeFlags: u16 {
        const SIGNED = 1 << 0;
        const FLOAT = 1 << 1;
        const INTEGER = 1 << 2;
        const IDEAL = 1 << 3;
        const COMPOSITE = 1 << 4;
    }
}

impl TypeFlags {
    #[must_use]
    pub const fn from_code(code: TypeCode) -> Self {
        let mut flags = Self::empty();
        if code.is_signed() {
            flags = flags.union(Self::SIGNED);
        }
        if matches!(
            code,
            TypeCode::F32 | TypeCode::F64 | TypeCode::F128
        ) {
            flags = flags.union(Self::FLOAT);
        }
        flags
    }
}

/// Compute (and cache) the typeid of the type node `id`.
///
/// Structural recipe, per the base spec's "Type identity (typeid)":
/// - Basic types emit one encoding character.
/// - `[T N]` emits `[`, `N` in decimal, `]`, then the element's typeid.
/// - Tuples emit `(`, each element's typeid, `)`.
/// - Structs emit `{`, each field's typeid in declaration order, `}`.
/// - Functions emit `^`, the parameter tuple's typeid, the result's typeid.
/// - References emit `&` then the pointee's typeid.
pub fn typeid(arena: &mut NodeArena, id: NodeId) -> Sym {
    if let Some(cached) = arena.get(id).tid.clone() {
        return cached;
    }
    let text = typeid_text(arena, id);
    let sym = arena.pool().intern_str(&text);
    arena.get_mut(id).tid = Some(sym.clone());
    sym
}

fn typeid_text(arena: &mut NodeArena, id: NodeId) -> String {
    let node = arena.get(id).clone();
    match &node.payload {
        NodePayload::BasicType(code) => code
            .encoding_char()
            .map(String::from)
            .unwrap_or_else(|| "?".to_string()),
        NodePayload::RefType { pointee, .. } => {
            format!("&{}", typeid_text(arena, *pointee))
        }
        NodePayload::ArrayType { len, elem } => {
            format!("[{}]{}", len, typeid_text(arena, *elem))
        }
        NodePayload::TupleType { elems } => {
            let mut s = String::from("(");
            for e in elems {
                s.push_str(&typeid_text(arena, *e));
            }
            s.push(')');
            s
        }
        NodePayload::StructType { fields } => {
            let mut s = String::from("{");
            for f in fields {
                // Field declarations are `Local` nodes; their declared
                // type is what contributes to the struct's shape.
                if let NodePayload::Local {
                    declared_type: Some(ty),
                    ..
                } = &arena.get(*f).payload.clone()
                {
                    s.push_str(&typeid_text(arena, *ty));
                }
            }
            s.push('}');
            s
        }
        NodePayload::FunType { params, result } => {
            let mut s = String::from("^(");
            for p in params {
                s.push_str(&typeid_text(arena, *p));
            }
            s.push(')');
            s.push_str(&typeid_text(arena, *result));
            s
        }
        NodePayload::AliasType { aliased, .. } => typeid_text(arena, *aliased),
        NodePayload::IdType {
            target: Some(target),
            ..
        } => typeid_text(arena, *target),
        NodePayload::TypeType { inner } => typeid_text(arena, *inner),
        _ if node.kind == NodeKind::TemplateType => "?template".to_string(),
        _ => "?".to_string(),
    }
}

/// Structural equality of two types, defined by typeid equality (pointer
/// equality of interned symbols), per invariant 2.
pub fn typeeq(arena: &mut NodeArena, a: NodeId, b: NodeId) -> bool {
    typeid(arena, a) == typeid(arena, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::NodeArena;
    use corec_common::position::NO_POS;

    fn basic(arena: &mut NodeArena, code: TypeCode) -> NodeId {
        arena.alloc_type(NodeKind::BasicType, NodePayload::BasicType(code))
    }

    #[test]
    fn basic_type_typeid_matches_alphabet() {
        let mut arena = NodeArena::new();
        let i32_ty = basic(&mut arena, TypeCode::I32);
        assert_eq!(typeid(&mut arena, i32_ty).as_str(), "w");
        let bool_ty = basic(&mut arena, TypeCode::Bool);
        assert_eq!(typeid(&mut arena, bool_ty).as_str(), "b");
    }

    #[test]
    fn function_typeid_matches_scenario_s1() {
        let mut arena = NodeArena::new();
        let i32_ty = basic(&mut arena, TypeCode::I32);
        let i32_ty2 = basic(&mut arena, TypeCode::I32);
        let fun_ty = arena.alloc_type(
            NodeKind::FunType,
            NodePayload::FunType {
                params: smallvec::smallvec![i32_ty],
                result: i32_ty2,
            },
        );
        assert_eq!(typeid(&mut arena, fun_ty).as_str(), "^(w)w");
    }

    #[test]
    fn two_structurally_equal_types_are_typeeq() {
        let mut arena = NodeArena::new();
        let a = basic(&mut arena, TypeCode::I32);
        let b = basic(&mut arena, TypeCode::I32);
        assert!(typeeq(&mut arena, a, b));
        let _ = NO_POS;
    }

    #[test]
    fn literal_range_matches_i8_bounds() {
        let (min, max) = TypeCode::I8.literal_range().unwrap();
        assert_eq!(min, -128);
        assert_eq!(max, 255);
    }
}
