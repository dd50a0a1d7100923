//! A built package: every function lowered from one (possibly multi-file)
//! compilation unit, per `ir.h`'s `IRPkg`.

use crate::fun::Fun;

#[derive(Default)]
pub struct Pkg {
    pub funs: Vec<Fun>,
}

impl Pkg {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Fun> {
        self.funs.iter().find(|f| f.name.as_ref().is_some_and(|n| n.as_str() == name))
    }
}
