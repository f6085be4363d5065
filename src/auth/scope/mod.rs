//! Row-level scoping.
//!
//! [`ScopeEngine::build`] turns a [`SubjectContext`] into the
//! [`ScopePredicate`] for one resource type. Every resource goes through the
//! same tiered evaluation, parameterized by its [`ResourceScopeConfig`]:
//!
//! ```text
//! dashboard hint (global / filiale / department)
//!   -> view_all | legacy view
//!   -> view_filiale
//!   -> view_team     (AND subsidiary precondition)
//!   -> view_own      (AND subsidiary precondition)
//!   -> create only   (AND subsidiary precondition)
//!   -> deny
//! then AND caller overrides (filter_filiale_id, filter_user_id)
//! ```
//!
//! Knowledge articles use a visibility union instead (see [`knowledge`]), and
//! ticket listings restricted to one category go through [`category`].

use std::sync::Arc;

use crate::auth::catalog::CROSS_FILIALE_PERMISSIONS;
use crate::auth::probe::FeatureProbe;
use crate::auth::subject::{DashboardScope, SubjectContext};
use crate::models::predicate::{ColumnRef, Join, Predicate, ScopePredicate, Subquery};

pub mod category;
pub mod knowledge;
pub mod resources;

pub use category::TicketCategory;
pub use resources::{FilialeSource, ResourceScopeConfig, ResourceType};

use resources::ParentLink;

pub struct ScopeEngine {
    probe: Arc<dyn FeatureProbe>,
}

impl ScopeEngine {
    pub fn new(probe: Arc<dyn FeatureProbe>) -> Self {
        ScopeEngine { probe }
    }

    pub fn build(&self, resource: ResourceType, ctx: &SubjectContext) -> ScopePredicate {
        let cfg = resource.config();
        let scope = if resource == ResourceType::Knowledge {
            knowledge::build(self, ctx)
        } else if let Some(link) = cfg.parent {
            self.delegated(cfg, link, ctx)
        } else {
            self.tiered(cfg, cfg.module, ctx, cfg.table)
        };
        log::debug!(
            "Scope for user {} on {}: {}",
            ctx.user_id(),
            resource.name(),
            describe(&scope)
        );
        scope
    }

    /// Scopes for every resource type, e.g. for a dashboard.
    pub fn build_all(&self, ctx: &SubjectContext) -> Vec<(ResourceType, ScopePredicate)> {
        ResourceType::ALL
            .into_iter()
            .map(|r| (r, self.build(r, ctx)))
            .collect()
    }

    fn probe(&self) -> &dyn FeatureProbe {
        self.probe.as_ref()
    }

    /// Tiered evaluation of `cfg`'s columns with `module`'s permission codes,
    /// relative to the row alias `alias`.
    fn tiered(
        &self,
        cfg: &ResourceScopeConfig,
        module: &str,
        ctx: &SubjectContext,
        alias: &str,
    ) -> ScopePredicate {
        let mut s = Scoper::new(cfg, alias, ctx, self.probe());
        let base = match s.hint() {
            Some(p) => p,
            None => s.permission_tiers(module),
        };
        let overrides = s.overrides();
        s.finish(Predicate::and([base, overrides]))
    }

    /// Rows that extend a parent row 1:1 are visible when their live parent is.
    fn delegated(&self, cfg: &ResourceScopeConfig, link: ParentLink, ctx: &SubjectContext) -> ScopePredicate {
        let parent = link.parent.config();
        let alias = format!("{}_parent", cfg.table);
        let inner = self.tiered(parent, cfg.module, ctx, &alias);
        if inner.is_allow_all() || inner.is_deny_all() {
            return inner;
        }
        let mut filter = vec![Predicate::ColumnEq(
            ColumnRef::new(&alias, "id"),
            ColumnRef::new(cfg.table, link.column),
        )];
        if let Some(live) = parent.live_column {
            filter.push(Predicate::is_null(ColumnRef::new(&alias, live)));
        }
        filter.push(inner.condition);
        ScopePredicate {
            condition: Predicate::exists(Subquery {
                table: parent.table.to_string(),
                alias,
                joins: inner.joins,
                filter: Predicate::and(filter),
            }),
            joins: vec![],
        }
    }
}

fn describe(scope: &ScopePredicate) -> &'static str {
    if scope.is_allow_all() {
        "unrestricted"
    } else if scope.is_deny_all() {
        "deny-all"
    } else {
        "filtered"
    }
}

/// Builds predicates for one resource relative to one row alias, collecting
/// the joins they need.
pub(crate) struct Scoper<'a> {
    cfg: &'a ResourceScopeConfig,
    alias: String,
    ctx: &'a SubjectContext,
    probe: &'a dyn FeatureProbe,
    joins: Vec<Join>,
}

impl<'a> Scoper<'a> {
    pub(crate) fn new(
        cfg: &'a ResourceScopeConfig,
        alias: &str,
        ctx: &'a SubjectContext,
        probe: &'a dyn FeatureProbe,
    ) -> Self {
        Scoper { cfg, alias: alias.to_string(), ctx, probe, joins: vec![] }
    }

    pub(crate) fn col(&self, column: &str) -> ColumnRef {
        ColumnRef::new(&self.alias, column)
    }

    /// Join `users` on `column`. With `live` the join ignores soft-deleted users.
    fn user_join(&mut self, column: &str, live: bool) -> String {
        let suffix = if live { "member" } else { "owner" };
        let alias = format!("{}_{column}_{suffix}", self.alias);
        if !self.joins.iter().any(|j| j.alias == alias) {
            let join = Join::left("users", &alias, "id", self.col(column));
            self.joins.push(if live { join.live_only("deleted_at") } else { join });
        }
        alias
    }

    pub(crate) fn hint(&mut self) -> Option<Predicate> {
        match self.ctx.overrides().dashboard_scope? {
            DashboardScope::Global => Some(Predicate::True),
            DashboardScope::Filiale => {
                let filiale = self.ctx.filiale_id()?;
                self.filiale_predicate(filiale)
            }
            DashboardScope::Department => {
                let department = self.ctx.department_id()?;
                self.department_predicate(department)
            }
        }
    }

    fn permission_tiers(&mut self, module: &str) -> Predicate {
        let ctx = self.ctx;
        let code = |action: &str| format!("{module}.{action}");

        if ctx.has(&code("view_all")) || (self.cfg.legacy_view && ctx.has(&code("view"))) {
            return Predicate::True;
        }

        if ctx.has(&code("view_filiale")) {
            if let Some(filiale) = ctx.filiale_id() {
                if ctx.overrides().filter_filiale_id.is_some_and(|f| f != filiale) {
                    return Predicate::False;
                }
                if let Some(p) = self.filiale_tier(filiale) {
                    return p;
                }
            }
        }

        let precondition = self.filiale_precondition();

        if ctx.has(&code("view_team")) {
            let own = self.own_predicate(ctx.user_id());
            let team = match ctx.department_id() {
                Some(department) => self.team_predicate(department),
                None => Predicate::False,
            };
            return Predicate::and([precondition, Predicate::or([team, own])]);
        }

        if ctx.has(&code("view_own")) {
            let own = self.own_predicate(ctx.user_id());
            return Predicate::and([precondition, own]);
        }

        if let Some(creator) = self.cfg.create_fallback {
            if ctx.has(&code("create")) && !ctx.permissions().has_view_in(module) {
                let created = Predicate::eq(self.col(creator), ctx.user_id());
                return Predicate::and([precondition, created]);
            }
        }

        Predicate::False
    }

    pub(crate) fn filiale_predicate(&mut self, filiale: i64) -> Option<Predicate> {
        match self.cfg.filiale {
            FilialeSource::None => None,
            FilialeSource::Column(column) => Some(Predicate::eq(self.col(column), filiale)),
            FilialeSource::ViaUser(column) => {
                let user = self.user_join(column, false);
                Some(Predicate::eq(ColumnRef::new(&user, "filiale_id"), filiale))
            }
        }
    }

    /// The `view_filiale` tier. Rows without a subsidiary are organization-wide
    /// and stay visible.
    fn filiale_tier(&mut self, filiale: i64) -> Option<Predicate> {
        let scoped = self.filiale_predicate(filiale)?;
        match self.cfg.filiale {
            FilialeSource::Column(column) => Some(Predicate::or([Predicate::is_null(self.col(column)), scoped])),
            _ => Some(scoped),
        }
    }

    /// Rows outside the subject's subsidiary are hidden from the lower tiers,
    /// unless the subject may work across subsidiaries. Rows without a
    /// subsidiary are organization-wide.
    fn filiale_precondition(&self) -> Predicate {
        let FilialeSource::Column(column) = self.cfg.filiale else {
            return Predicate::True;
        };
        let Some(filiale) = self.ctx.filiale_id() else {
            return Predicate::True;
        };
        if self.ctx.permissions().has_any(CROSS_FILIALE_PERMISSIONS)
            || (self.cfg.resolver_crosses_filiale && self.ctx.is_resolver())
        {
            return Predicate::True;
        }
        Predicate::or([
            Predicate::is_null(self.col(column)),
            Predicate::eq(self.col(column), filiale),
        ])
    }

    fn department_predicate(&mut self, department: i64) -> Option<Predicate> {
        let cfg = self.cfg;
        let mut parts = vec![];
        for column in cfg.team_columns {
            let member = self.user_join(column, true);
            parts.push(Predicate::eq(ColumnRef::new(&member, "department_id"), department));
        }
        if let Some(column) = cfg.department_column {
            parts.push(Predicate::eq(self.col(column), department));
        }
        if parts.is_empty() { None } else { Some(Predicate::or(parts)) }
    }

    fn team_predicate(&mut self, department: i64) -> Predicate {
        let mut parts = vec![self.department_predicate(department).unwrap_or(Predicate::False)];

        if let Some(side) = self.cfg.assignees.filter(|s| self.probe.table_exists(s.table)) {
            let alias = format!("{}_{}", self.alias, side.table);
            let member = live_member_exists(&alias, side.user_column, department);
            parts.push(Predicate::exists(Subquery {
                table: side.table.to_string(),
                alias: alias.clone(),
                joins: vec![],
                filter: Predicate::and([
                    Predicate::ColumnEq(ColumnRef::new(&alias, side.foreign_key), self.col("id")),
                    member,
                ]),
            }));
        }

        let cfg = self.cfg;
        for related in cfg.related {
            let alias = format!("{}_{}", self.alias, related.table);
            let members = related
                .owner_columns
                .iter()
                .map(|c| live_member_exists(&alias, c, department));
            parts.push(self.related_exists(related, &alias, Predicate::or(members)));
        }

        Predicate::or(parts)
    }

    /// Rows the given user owns, is assigned to, or is attached to.
    pub(crate) fn own_predicate(&self, user_id: i64) -> Predicate {
        let mut parts: Vec<Predicate> = self
            .cfg
            .owner_columns
            .iter()
            .map(|c| Predicate::eq(self.col(c), user_id))
            .collect();

        // The side table is optional; when it is missing the clause is left out.
        if let Some(side) = self.cfg.assignees.filter(|s| self.probe.table_exists(s.table)) {
            let alias = format!("{}_{}", self.alias, side.table);
            parts.push(Predicate::exists(Subquery {
                table: side.table.to_string(),
                alias: alias.clone(),
                joins: vec![],
                filter: Predicate::and([
                    Predicate::ColumnEq(ColumnRef::new(&alias, side.foreign_key), self.col("id")),
                    Predicate::eq(ColumnRef::new(&alias, side.user_column), user_id),
                ]),
            }));
        }

        for related in self.cfg.related {
            let alias = format!("{}_{}", self.alias, related.table);
            let owned = related
                .owner_columns
                .iter()
                .map(|c| Predicate::eq(ColumnRef::new(&alias, c), user_id));
            parts.push(self.related_exists(related, &alias, Predicate::or(owned)));
        }

        Predicate::or(parts)
    }

    fn related_exists(
        &self,
        related: &resources::RelatedOwners,
        alias: &str,
        condition: Predicate,
    ) -> Predicate {
        let mut filter = vec![Predicate::ColumnEq(
            ColumnRef::new(alias, related.foreign_key),
            self.col("id"),
        )];
        if let Some(live) = related.live_column {
            filter.push(Predicate::is_null(ColumnRef::new(alias, live)));
        }
        filter.push(condition);
        Predicate::exists(Subquery {
            table: related.table.to_string(),
            alias: alias.to_string(),
            joins: vec![],
            filter: Predicate::and(filter),
        })
    }

    /// Caller overrides, as one conjunction. Overrides the resource cannot
    /// express fold to deny.
    pub(crate) fn overrides(&mut self) -> Predicate {
        let overrides = *self.ctx.overrides();
        let mut parts = vec![];
        if let Some(filiale) = overrides.filter_filiale_id {
            parts.push(self.filiale_predicate(filiale).unwrap_or(Predicate::False));
        }
        if let Some(user) = overrides.filter_user_id {
            parts.push(self.own_predicate(user));
        }
        Predicate::and(parts)
    }

    /// Keep only the joins the final condition actually refers to.
    pub(crate) fn finish(self, condition: Predicate) -> ScopePredicate {
        if condition.is_true() || condition.is_false() {
            return ScopePredicate { condition, joins: vec![] };
        }
        let joins = self
            .joins
            .into_iter()
            .filter(|j| references_alias(&condition, &j.alias))
            .collect();
        ScopePredicate { condition, joins }
    }
}

/// `EXISTS` a live user with `id = alias.column` in `department`.
fn live_member_exists(alias: &str, column: &str, department: i64) -> Predicate {
    let user = format!("{alias}_{column}_member");
    Predicate::exists(Subquery {
        table: "users".to_string(),
        alias: user.clone(),
        joins: vec![],
        filter: Predicate::and([
            Predicate::ColumnEq(ColumnRef::new(&user, "id"), ColumnRef::new(alias, column)),
            Predicate::eq(ColumnRef::new(&user, "department_id"), department),
            Predicate::is_null(ColumnRef::new(&user, "deleted_at")),
        ]),
    })
}

fn references_alias(predicate: &Predicate, alias: &str) -> bool {
    match predicate {
        Predicate::True | Predicate::False => false,
        Predicate::Eq(col, _) | Predicate::IsNull(col) => col.alias == alias,
        Predicate::ColumnEq(a, b) => a.alias == alias || b.alias == alias,
        Predicate::And(parts) | Predicate::Or(parts) => parts.iter().any(|p| references_alias(p, alias)),
        Predicate::Not(inner) => references_alias(inner, alias),
        Predicate::Exists(sub) => {
            sub.joins.iter().any(|j| j.on.alias == alias) || references_alias(&sub.filter, alias)
        }
    }
}
