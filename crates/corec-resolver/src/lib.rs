//! Name resolution: binds every `Id`/`IdType` the parser left `UNRESOLVED`
//! to the node that declares it, and performs the handful of tree
//! simplifications that only make sense once names are known (single-
//! statement block collapse, `Call`-of-a-type-name to `TypeCastExpr`
//! conversion, and optional constant-`if` folding).

mod resolver;

pub use resolver::resolve_file;
