//! Centralized recursion depths and capacity limits, grounded in the
//! teacher's `tsz-common::limits` module: a single place to tune these
//! values rather than scattering magic numbers through each pass.

/// Maximum recursion depth for the parser's expression grammar. Guards
/// against stack overflow on pathologically nested input such as
/// `((((((((1))))))))` repeated thousands of times.
pub const MAX_EXPR_PARSE_DEPTH: u32 = 512;

/// Maximum recursion depth for the checker's expression type-inference
/// walk. Mirrors `MAX_EXPR_PARSE_DEPTH`; the checker walks the same shape of
/// tree the parser built.
pub const MAX_EXPR_CHECK_DEPTH: u32 = 512;

/// Maximum recursion depth for template instantiation (C11's transformer),
/// protecting against templates that substitute themselves endlessly (e.g.
/// a recursive type alias with no base case).
pub const MAX_TEMPLATE_INSTANTIATION_DEPTH: u32 = 64;

/// Maximum depth for the SSA builder's `readVariable` recursion into
/// predecessor blocks, protecting against pathologically long predecessor
/// chains in generated control flow.
pub const MAX_SSA_READ_RECURSION_DEPTH: u32 = 4096;

/// Initial capacity hint for a file-level scope's symbol table.
pub const DEFAULT_SCOPE_CAPACITY: usize = 16;
