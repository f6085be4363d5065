//! Knowledge-base visibility.
//!
//! Articles are not owned work items, so they do not follow the tier cascade.
//! An article is visible when it is organization-wide or in the subject's
//! subsidiary, and it is published or written by the subject.

use crate::auth::subject::SubjectContext;
use crate::models::predicate::{Predicate, ScopePredicate};

use super::{ResourceType, ScopeEngine, Scoper};

pub(super) fn build(engine: &ScopeEngine, ctx: &SubjectContext) -> ScopePredicate {
    let cfg = ResourceType::Knowledge.config();
    let mut s = Scoper::new(cfg, cfg.table, ctx, engine.probe());
    let base = match s.hint() {
        Some(p) => p,
        None => visibility(&s, ctx),
    };
    let overrides = s.overrides();
    s.finish(Predicate::and([base, overrides]))
}

fn visibility(s: &Scoper<'_>, ctx: &SubjectContext) -> Predicate {
    if ctx.has("knowledge.view_all") {
        return Predicate::True;
    }

    let authored = Predicate::eq(s.col("author_id"), ctx.user_id());

    if ctx.has("knowledge.view_published") {
        let organization = match ctx.filiale_id() {
            Some(filiale) => Predicate::or([
                Predicate::is_null(s.col("filiale_id")),
                Predicate::eq(s.col("filiale_id"), filiale),
            ]),
            None => Predicate::is_null(s.col("filiale_id")),
        };
        let readable = Predicate::or([Predicate::eq(s.col("is_published"), true), authored]);
        return Predicate::and([organization, readable]);
    }

    if ctx.has("knowledge.view_own") {
        return authored;
    }

    Predicate::False
}
