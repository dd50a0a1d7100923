//! Copy-on-write AST substitution: the generic visitor template
//! instantiation uses to bind a `Template`'s parameters to actual
//! arguments and produce an independent copy of its body.

mod substitute;

pub use substitute::instantiate;
