//! Shared test infrastructure for scoping tests.
//!
//! Scopes are checked by evaluating them over an in-memory [`Dataset`], so no
//! database is needed.
//!
//! # Organization fixture
//! - filiale 1: software provider, filiale 2: regular subsidiary
//! - department 5: IT department in filiale 1, department 9: regular, filiale 2
//! - users 1..=5, see [`org`]
#![allow(dead_code)]

use std::sync::Arc;

use itsm::auth::catalog::{PermissionResolver, Permissions};
use itsm::auth::probe::StaticFeatureProbe;
use itsm::auth::scope::{ResourceType, ScopeEngine};
use itsm::auth::subject::{
    DepartmentRef, FilialeRef, RoleRef, ScopeOverrides, SubjectContext, SubjectContextFactory,
    SubjectRecord,
};
use itsm::models::predicate::eval::{Dataset, row};
use itsm::models::predicate::{ScopePredicate, SqlValue};
use itsm::models::query::SelectQuery;

// ============================================================================
// TEST CONSTANTS
// ============================================================================

pub const S1: i64 = 1;
pub const S2: i64 = 2;
pub const IT_DEPT: i64 = 5;
pub const OTHER_DEPT: i64 = 9;

pub const ALICE: i64 = 1; // IT, filiale 1
pub const BOB: i64 = 2; // IT, filiale 1
pub const CAROL: i64 = 3; // other dept, filiale 2
pub const DAVE: i64 = 4; // IT, filiale 1, soft-deleted
pub const ERIN: i64 = 5; // other dept, filiale 1

// ============================================================================
// RESOLVER / PROBE
// ============================================================================

/// Resolver that hands every role the same fixed set of codes.
pub struct FixedResolver(pub Permissions);

impl PermissionResolver for FixedResolver {
    fn permissions_for_role(&self, _role_name: &str) -> Permissions {
        self.0.clone()
    }
}

pub fn engine() -> ScopeEngine {
    ScopeEngine::new(Arc::new(StaticFeatureProbe::none()))
}

pub fn engine_with_side_tables() -> ScopeEngine {
    ScopeEngine::new(Arc::new(StaticFeatureProbe::with_tables(ResourceType::side_tables())))
}

// ============================================================================
// SUBJECTS
// ============================================================================

pub fn filiale(id: i64) -> FilialeRef {
    FilialeRef { id, is_software_provider: id == S1 }
}

pub fn department(id: i64) -> DepartmentRef {
    DepartmentRef {
        id,
        is_it_department: id == IT_DEPT,
        filiale: Some(filiale(if id == IT_DEPT { S1 } else { S2 })),
    }
}

/// Subject record with an explicit department and user-level filiale.
pub fn record(user_id: i64, department_id: Option<i64>, filiale_id: Option<i64>) -> SubjectRecord {
    SubjectRecord {
        user_id,
        username: format!("user{user_id}"),
        role: Some(RoleRef { name: "tester".to_string(), filiale: None }),
        department: department_id.map(|id| DepartmentRef { filiale: None, ..department(id) }),
        filiale: filiale_id.map(filiale),
    }
}

pub fn subject_from(record: &SubjectRecord, codes: &[&str]) -> SubjectContext {
    let factory = SubjectContextFactory::new(Arc::new(FixedResolver(Permissions::new(codes.iter().copied()))));
    factory.build(record, ScopeOverrides::default())
}

pub fn subject(user_id: i64, department_id: Option<i64>, filiale_id: Option<i64>, codes: &[&str]) -> SubjectContext {
    subject_from(&record(user_id, department_id, filiale_id), codes)
}

// ============================================================================
// DATASETS
// ============================================================================

pub fn int(n: i64) -> SqlValue {
    SqlValue::Int(n)
}

pub fn opt(n: Option<i64>) -> SqlValue {
    n.into()
}

/// Filiales, departments and users.
pub fn org() -> Dataset {
    let mut ds = Dataset::new();
    ds.insert("filiales", row([("id", int(S1)), ("is_software_provider", true.into())]))
        .insert("filiales", row([("id", int(S2)), ("is_software_provider", false.into())]))
        .insert("departments", row([("id", int(IT_DEPT)), ("filiale_id", int(S1)), ("is_it_department", true.into())]))
        .insert("departments", row([("id", int(OTHER_DEPT)), ("filiale_id", int(S2)), ("is_it_department", false.into())]));
    for (id, dept, fil) in [(ALICE, IT_DEPT, S1), (BOB, IT_DEPT, S1), (CAROL, OTHER_DEPT, S2), (ERIN, OTHER_DEPT, S1)] {
        ds.insert("users", row([("id", int(id)), ("department_id", int(dept)), ("filiale_id", int(fil))]));
    }
    ds.insert(
        "users",
        row([
            ("id", int(DAVE)),
            ("department_id", int(IT_DEPT)),
            ("filiale_id", int(S1)),
            ("deleted_at", "2024-01-01".into()),
        ]),
    );
    ds
}

pub fn ticket(ds: &mut Dataset, id: i64, created_by: i64, assigned_to: Option<i64>, filiale_id: Option<i64>, category: &str) {
    ds.insert(
        "tickets",
        row([
            ("id", int(id)),
            ("created_by", int(created_by)),
            ("assigned_to", opt(assigned_to)),
            ("requester_id", SqlValue::Null),
            ("filiale_id", opt(filiale_id)),
            ("category", category.into()),
        ]),
    );
}

/// One or two rows in every resource table, spread over both subsidiaries.
pub fn full_fixture() -> Dataset {
    let mut ds = org();
    ticket(&mut ds, 100, BOB, None, Some(S1), "incident");
    ticket(&mut ds, 101, CAROL, None, Some(S2), "change");
    ds.insert("ticket_internes", row([("id", int(200)), ("created_by", int(ALICE)), ("department_id", int(IT_DEPT)), ("filiale_id", int(S1))]))
        .insert("ticket_internes", row([("id", int(201)), ("created_by", int(CAROL)), ("department_id", int(OTHER_DEPT)), ("filiale_id", int(S2))]))
        .insert("incidents", row([("id", int(300)), ("ticket_id", int(100))]))
        .insert("changes", row([("id", int(310)), ("ticket_id", int(101))]))
        .insert("service_requests", row([("id", int(320)), ("ticket_id", int(100))]))
        .insert("projects", row([("id", int(400)), ("created_by", int(BOB)), ("manager_id", int(BOB)), ("filiale_id", int(S1))]))
        .insert("projects", row([("id", int(401)), ("created_by", int(CAROL)), ("manager_id", int(CAROL)), ("filiale_id", int(S2))]))
        .insert("project_tasks", row([("id", int(450)), ("project_id", int(401)), ("assigned_to", int(CAROL))]))
        .insert("assets", row([("id", int(500)), ("assigned_to", int(BOB)), ("filiale_id", int(S1))]))
        .insert("assets", row([("id", int(501)), ("assigned_to", int(CAROL)), ("filiale_id", int(S2))]))
        .insert("knowledge_articles", row([("id", int(600)), ("author_id", int(BOB)), ("filiale_id", int(S1)), ("is_published", true.into())]))
        .insert("knowledge_articles", row([("id", int(601)), ("author_id", int(CAROL)), ("filiale_id", int(S2)), ("is_published", false.into())]))
        .insert("slas", row([("id", int(700)), ("created_by", int(BOB)), ("filiale_id", int(S1))]))
        .insert("slas", row([("id", int(701)), ("created_by", int(CAROL)), ("filiale_id", int(S2))]))
        .insert("time_entries", row([("id", int(800)), ("user_id", int(BOB)), ("ticket_id", int(100))]))
        .insert("time_entries", row([("id", int(801)), ("user_id", int(CAROL)), ("ticket_id", SqlValue::Null), ("project_task_id", int(450))]))
        .insert("delays", row([("id", int(900)), ("user_id", int(BOB)), ("ticket_id", int(100))]))
        .insert("delays", row([("id", int(901)), ("user_id", int(CAROL)), ("ticket_interne_id", int(201))]))
        .insert("audit_logs", row([("id", int(1000)), ("user_id", int(BOB)), ("action", "update".into())]))
        .insert("audit_logs", row([("id", int(1001)), ("user_id", int(CAROL)), ("action", "delete".into())]));
    ds
}

// ============================================================================
// EVALUATION
// ============================================================================

pub fn ids_in(ds: &Dataset, table: &str, scope: &ScopePredicate) -> Vec<i64> {
    ds.select_ids(&SelectQuery::from_table(table).scoped(scope))
}

/// Ids of `resource` rows the subject may see.
pub fn visible(ds: &Dataset, engine: &ScopeEngine, resource: ResourceType, ctx: &SubjectContext) -> Vec<i64> {
    ids_in(ds, resource.table(), &engine.build(resource, ctx))
}

pub fn all_ids(ds: &Dataset, table: &str) -> Vec<i64> {
    ds.select_ids(&SelectQuery::from_table(table))
}
