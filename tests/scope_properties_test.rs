mod common;

use common::*;
use itsm::auth::scope::ResourceType;
use itsm::auth::subject::{DashboardScope, ScopeOverrides};
use itsm::models::query::SelectQuery;

fn code(resource: ResourceType, action: &str) -> String {
    format!("{}.{action}", resource.config().module)
}

#[test]
fn view_all_sees_every_row() {
    let ds = full_fixture();
    let engine = engine_with_side_tables();
    for resource in ResourceType::ALL {
        let view_all = code(resource, "view_all");
        let ctx = subject(ERIN, Some(OTHER_DEPT), Some(S1), &[view_all.as_str()]);
        let expected = all_ids(&ds, resource.table());
        assert!(!expected.is_empty(), "fixture has no {} rows", resource.name());
        assert_eq!(visible(&ds, &engine, resource, &ctx), expected, "{}", resource.name());
    }
}

#[test]
fn no_permissions_sees_nothing() {
    let ds = full_fixture();
    let engine = engine_with_side_tables();
    let ctx = subject(BOB, Some(IT_DEPT), Some(S1), &[]);
    for resource in ResourceType::ALL {
        let scope = engine.build(resource, &ctx);
        assert!(scope.is_deny_all(), "{}", resource.name());
        assert!(visible(&ds, &engine, resource, &ctx).is_empty(), "{}", resource.name());
    }
}

#[test]
fn unrelated_permissions_see_nothing() {
    let ds = full_fixture();
    let engine = engine();
    let ctx = subject(BOB, Some(IT_DEPT), Some(S1), &["reports.view_global", "filiales.compare"]);
    for resource in ResourceType::ALL {
        assert!(visible(&ds, &engine, resource, &ctx).is_empty(), "{}", resource.name());
    }
}

#[test]
fn foreign_filiale_filter_sees_nothing() {
    let ds = full_fixture();
    let engine = engine_with_side_tables();
    let overrides = ScopeOverrides { filter_filiale_id: Some(S2), ..Default::default() };
    for resource in ResourceType::ALL {
        let view_filiale = code(resource, "view_filiale");
        let ctx = subject(ERIN, Some(OTHER_DEPT), Some(S1), &[view_filiale.as_str()]).with_overrides(overrides);
        assert!(visible(&ds, &engine, resource, &ctx).is_empty(), "{}", resource.name());
    }
}

#[test]
fn foreign_filiale_filter_with_own_tier_sees_nothing() {
    let ds = full_fixture();
    let engine = engine();
    let overrides = ScopeOverrides { filter_filiale_id: Some(S2), ..Default::default() };
    let ctx = subject(BOB, Some(OTHER_DEPT), Some(S1), &["tickets.view_own", "assets.view_own"])
        .with_overrides(overrides);
    assert!(visible(&ds, &engine, ResourceType::Tickets, &ctx).is_empty());
    assert!(visible(&ds, &engine, ResourceType::Assets, &ctx).is_empty());
}

#[test]
fn view_filiale_sees_own_subsidiary() {
    let ds = full_fixture();
    let engine = engine();
    let ctx = |r: ResourceType| {
        let view_filiale = code(r, "view_filiale");
        subject(ERIN, Some(OTHER_DEPT), Some(S1), &[view_filiale.as_str()])
    };

    assert_eq!(visible(&ds, &engine, ResourceType::Tickets, &ctx(ResourceType::Tickets)), vec![100]);
    assert_eq!(visible(&ds, &engine, ResourceType::Projects, &ctx(ResourceType::Projects)), vec![400]);
    // subsidiary of the author for user-owned rows
    assert_eq!(visible(&ds, &engine, ResourceType::TimeEntries, &ctx(ResourceType::TimeEntries)), vec![800]);
    assert_eq!(visible(&ds, &engine, ResourceType::Delays, &ctx(ResourceType::Delays)), vec![900]);
    assert_eq!(visible(&ds, &engine, ResourceType::AuditLogs, &ctx(ResourceType::AuditLogs)), vec![1000]);
}

#[test]
fn view_filiale_matching_filter_is_kept() {
    let ds = full_fixture();
    let engine = engine();
    let ctx = subject(ERIN, Some(OTHER_DEPT), Some(S1), &["tickets.view_filiale"])
        .with_overrides(ScopeOverrides { filter_filiale_id: Some(S1), ..Default::default() });
    assert_eq!(visible(&ds, &engine, ResourceType::Tickets, &ctx), vec![100]);
}

#[test]
fn scoping_twice_is_idempotent() {
    let ds = full_fixture();
    let engine = engine_with_side_tables();
    let subjects = [
        subject(BOB, Some(IT_DEPT), Some(S1), &["tickets.view_team", "projects.view_team", "delays.view_team"]),
        subject(ERIN, Some(OTHER_DEPT), Some(S1), &["tickets.view_own", "knowledge.view_published", "users.view_filiale"]),
        subject(CAROL, None, None, &["incidents.view_own", "time_entries.view_own", "assets.view_team"]),
    ];
    for ctx in &subjects {
        for resource in ResourceType::ALL {
            let scope = engine.build(resource, ctx);
            let once = SelectQuery::from_table(resource.table()).scoped(&scope);
            let twice = once.scoped(&engine.build(resource, ctx));
            assert_eq!(once, twice, "{}", resource.name());
            assert_eq!(ds.select_ids(&once), ds.select_ids(&twice), "{}", resource.name());
            assert_eq!(scope.intersect(&scope), scope, "{}", resource.name());
        }
    }
}

#[test]
fn global_hint_short_circuits_without_permissions() {
    let ds = full_fixture();
    let engine = engine();
    let ctx = subject(ERIN, None, None, &[])
        .with_overrides(ScopeOverrides { dashboard_scope: Some(DashboardScope::Global), ..Default::default() });
    for resource in ResourceType::ALL {
        assert!(engine.build(resource, &ctx).is_allow_all(), "{}", resource.name());
        assert_eq!(
            visible(&ds, &engine, resource, &ctx),
            all_ids(&ds, resource.table()),
            "{}",
            resource.name()
        );
    }
}

#[test]
fn filiale_hint_without_subject_filiale_falls_through() {
    let ds = full_fixture();
    let engine = engine();
    let ctx = subject(BOB, None, None, &["tickets.view_own"])
        .with_overrides(ScopeOverrides { dashboard_scope: Some(DashboardScope::Filiale), ..Default::default() });
    assert_eq!(visible(&ds, &engine, ResourceType::Tickets, &ctx), vec![100]);
}

#[test]
fn filiale_hint_limits_to_subject_subsidiary() {
    let ds = full_fixture();
    let engine = engine();
    let ctx = subject(ERIN, Some(OTHER_DEPT), Some(S1), &[])
        .with_overrides(ScopeOverrides { dashboard_scope: Some(DashboardScope::Filiale), ..Default::default() });
    assert_eq!(visible(&ds, &engine, ResourceType::Tickets, &ctx), vec![100]);
    assert_eq!(visible(&ds, &engine, ResourceType::InternalTickets, &ctx), vec![200]);
    assert_eq!(visible(&ds, &engine, ResourceType::Projects, &ctx), vec![400]);
    assert_eq!(visible(&ds, &engine, ResourceType::Assets, &ctx), vec![500]);
    // through the parent ticket
    assert_eq!(visible(&ds, &engine, ResourceType::Incidents, &ctx), vec![300]);
    // through the owning user
    assert_eq!(visible(&ds, &engine, ResourceType::TimeEntries, &ctx), vec![800]);
    assert_eq!(visible(&ds, &engine, ResourceType::AuditLogs, &ctx), vec![1000]);
}

#[test]
fn global_hint_is_still_narrowed_by_filiale_filter() {
    let ds = full_fixture();
    let engine = engine();
    let ctx = subject(ERIN, None, Some(S1), &[]).with_overrides(ScopeOverrides {
        dashboard_scope: Some(DashboardScope::Global),
        filter_filiale_id: Some(S2),
        ..Default::default()
    });
    assert_eq!(visible(&ds, &engine, ResourceType::Tickets, &ctx), vec![101]);
    assert_eq!(visible(&ds, &engine, ResourceType::Projects, &ctx), vec![401]);
    assert_eq!(visible(&ds, &engine, ResourceType::TimeEntries, &ctx), vec![801]);
}

#[test]
fn department_hint_is_narrowed_by_user_filter() {
    let ds = full_fixture();
    let engine = engine();
    let hinted = |user: i64| {
        subject(ERIN, Some(OTHER_DEPT), Some(S1), &[]).with_overrides(ScopeOverrides {
            dashboard_scope: Some(DashboardScope::Department),
            filter_user_id: Some(user),
            ..Default::default()
        })
    };
    assert_eq!(visible(&ds, &engine, ResourceType::Tickets, &hinted(CAROL)), vec![101]);
    // bob's ticket lies outside the department
    assert!(visible(&ds, &engine, ResourceType::Tickets, &hinted(BOB)).is_empty());
}

#[test]
fn intersection_is_associative() {
    let ds = full_fixture();
    let engine = engine_with_side_tables();
    let team = subject(BOB, Some(IT_DEPT), Some(S1), &["tickets.view_team", "projects.view_team"]);
    let own = subject(CAROL, Some(OTHER_DEPT), Some(S2), &["tickets.view_own", "projects.view_own"]);
    let filiale = subject(ERIN, Some(OTHER_DEPT), Some(S1), &["tickets.view_filiale", "projects.view_filiale"]);
    for resource in [ResourceType::Tickets, ResourceType::Projects, ResourceType::TimeEntries] {
        let (a, b, c) = (engine.build(resource, &team), engine.build(resource, &own), engine.build(resource, &filiale));
        let left = a.intersect(&b).intersect(&c);
        let right = a.intersect(&b.intersect(&c));
        assert_eq!(left, right, "{}", resource.name());
        assert_eq!(
            ids_in(&ds, resource.table(), &left),
            ids_in(&ds, resource.table(), &right),
            "{}",
            resource.name()
        );
    }
}

#[test]
fn department_hint_restricts_to_department() {
    let ds = full_fixture();
    let engine = engine();
    let ctx = subject(ERIN, Some(OTHER_DEPT), Some(S1), &[])
        .with_overrides(ScopeOverrides { dashboard_scope: Some(DashboardScope::Department), ..Default::default() });
    // carol is the only live user in the other department with work items
    assert_eq!(visible(&ds, &engine, ResourceType::Tickets, &ctx), vec![101]);
    assert_eq!(visible(&ds, &engine, ResourceType::InternalTickets, &ctx), vec![201]);
}

#[test]
fn build_all_covers_every_resource() {
    let engine = engine();
    let ctx = subject(BOB, Some(IT_DEPT), Some(S1), &["tickets.view_all"]);
    let all = engine.build_all(&ctx);
    assert_eq!(all.len(), ResourceType::ALL.len());
    let tickets = all.iter().find(|(r, _)| *r == ResourceType::Tickets).unwrap();
    assert!(tickets.1.is_allow_all());
    let assets = all.iter().find(|(r, _)| *r == ResourceType::Assets).unwrap();
    assert!(assets.1.is_deny_all());
}
