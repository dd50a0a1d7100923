//! `BuildCtx`: owns every source added to one build, the shared AST arena
//! they parse into, and the diagnostics accumulated along the way.
//!
//! Grounded on `original_source/src/co/build.c`'s build-context-owns-
//! everything-until-dropped shape (§5 of the base spec: "to abort a build,
//! drop the build context") and on §4.7's supplemented multi-file `Pkg`
//! requirement: multiple `Source`s are parsed into one shared arena/pool,
//! their top-level declarations merged into a single synthetic `File`
//! node, and resolved/checked/lowered exactly once against it — the same
//! two-pass forward-reference handling a single file already gets, just
//! over a wider declaration list.

use corec_ast::{NodeArena, NodeId, NodeKind, NodeList, NodePayload};
use corec_common::diagnostics::DiagCtx;
use corec_common::options::BuildOptions;
use corec_common::position::{PosMap, NO_POS};
use corec_common::source::Source;
use corec_parser::Parser;
use corec_ssa::{build_pkg, Pkg};
use tracing::debug;

/// A registered source paired with the `PosMap` used to resolve its
/// positions back to text for diagnostic rendering. Its index in
/// `BuildCtx::units` is the `origin` every `Pos` the scanner stamps while
/// reading it carries (`Pos`'s own doc comment).
struct Unit {
    source: Source,
    pos_map: PosMap,
}

/// Everything [`BuildCtx::build`] produces: the arena every pass mutated in
/// place, the merged `File` node all of it hangs off, and the SSA package —
/// `None` if an earlier pass raised an error and the driver refused to
/// advance.
pub struct BuildOutput {
    pub arena: NodeArena,
    pub file: NodeId,
    pub pkg: Option<Pkg>,
}

/// Owns the sources, arena, and diagnostics for one build. Drop it to
/// release everything the build allocated.
pub struct BuildCtx {
    pub options: BuildOptions,
    pub diags: DiagCtx,
    units: Vec<Unit>,
}

impl BuildCtx {
    #[must_use]
    pub fn new(options: BuildOptions) -> Self {
        Self {
            diags: DiagCtx::with_level_filter(options.diag_level),
            options,
            units: Vec::new(),
        }
    }

    /// Register a source with this build, returning the `origin` index its
    /// positions will carry. Sources must all be added before [`Self::build`]
    /// runs; it parses them in registration order.
    pub fn add_source(&mut self, source: Source) -> u32 {
        let origin = self.units.len() as u32;
        let pos_map = PosMap::build(source.body());
        self.units.push(Unit { source, pos_map });
        origin
    }

    /// Render every collected diagnostic as `file:line:col: level: message`
    /// plus a source snippet, one diagnostic per paragraph, in emission
    /// order — the base spec's §6/§7 user-visible failure format.
    #[must_use]
    pub fn render_diagnostics(&self) -> String {
        self.diags
            .diagnostics()
            .iter()
            .map(|d| {
                let unit = &self.units[d.pos.origin() as usize];
                d.render(&unit.source, &unit.pos_map)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Run the full pipeline over every source added so far. Refuses to
    /// advance to the next pass once `self.diags.has_errors()`, per §7's
    /// "the driver checks the counter between passes and refuses to
    /// advance if non-zero" — later passes assume a clean tree from the
    /// one before them.
    pub fn build(&mut self) -> BuildOutput {
        let mut arena = NodeArena::new();
        let mut all_decls = NodeList::new();

        for (origin, unit) in self.units.iter().enumerate() {
            debug!(file = unit.source.filename(), "parse");
            let parser = Parser::new(unit.source.body(), origin as u32, arena, self.options);
            let parsed = parser.parse_file();
            arena = parsed.arena;
            for d in parsed.diags.diagnostics() {
                self.diags.emit(d.clone());
            }
            if let NodePayload::File { decls } = &arena.get(parsed.file).payload {
                all_decls.extend(decls.iter().copied());
            }
        }

        let file = arena.alloc(NO_POS, NO_POS, NodeKind::File, NodePayload::File { decls: all_decls });

        if self.diags.has_errors() {
            return BuildOutput { arena, file, pkg: None };
        }

        debug!("resolve");
        corec_resolver::resolve_file(&mut arena, file, &mut self.diags, &self.options);
        if self.diags.has_errors() {
            return BuildOutput { arena, file, pkg: None };
        }

        debug!("check");
        corec_checker::check_file(&mut arena, file, &mut self.diags);
        if self.diags.has_errors() {
            return BuildOutput { arena, file, pkg: None };
        }

        debug!("build_ssa");
        let pkg = build_pkg(&mut arena, file, &mut self.diags);
        BuildOutput { arena, file, pkg: Some(pkg) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_source_builds_an_ssa_package() {
        let mut ctx = BuildCtx::new(BuildOptions::default());
        ctx.add_source(Source::open_data("a.co", "fun add(x i32) i32 { x + 1 }"));
        let out = ctx.build();
        assert_eq!(ctx.diags.error_count(), 0);
        let pkg = out.pkg.expect("pipeline should reach SSA");
        assert!(pkg.find("add").is_some());
    }

    #[test]
    fn undefined_symbol_stops_the_pipeline_before_ssa() {
        let mut ctx = BuildCtx::new(BuildOptions::default());
        ctx.add_source(Source::open_data("a.co", "fun f() i32 { y }"));
        let out = ctx.build();
        assert!(ctx.diags.error_count() >= 1);
        assert!(out.pkg.is_none());
    }

    #[test]
    fn two_sources_share_one_package_scope() {
        let mut ctx = BuildCtx::new(BuildOptions::default());
        ctx.add_source(Source::open_data("a.co", "fun f() i32 { g() }"));
        ctx.add_source(Source::open_data("b.co", "fun g() i32 { 1 }"));
        let out = ctx.build();
        assert_eq!(ctx.diags.error_count(), 0, "{}", ctx.render_diagnostics());
        let pkg = out.pkg.expect("cross-file forward reference should resolve");
        assert!(pkg.find("f").is_some());
        assert!(pkg.find("g").is_some());
    }
}
