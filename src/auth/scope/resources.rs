//! Declarative scoping tables, one record per resource type.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Tickets,
    InternalTickets,
    Incidents,
    Changes,
    ServiceRequests,
    Projects,
    Assets,
    Knowledge,
    Slas,
    TimeEntries,
    Delays,
    AuditLogs,
    Users,
}

/// Where a row's subsidiary comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilialeSource {
    None,
    /// A column on the row itself.
    Column(&'static str),
    /// The `filiale_id` of the user referenced by this column.
    ViaUser(&'static str),
}

/// Optional many-to-many table listing extra users attached to a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SideTable {
    pub table: &'static str,
    pub foreign_key: &'static str,
    pub user_column: &'static str,
}

/// Child rows whose owners also confer visibility on the parent row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelatedOwners {
    pub table: &'static str,
    pub foreign_key: &'static str,
    pub owner_columns: &'static [&'static str],
    pub live_column: Option<&'static str>,
}

/// 1:1 extension of another resource; scoping is evaluated on the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentLink {
    pub column: &'static str,
    pub parent: ResourceType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceScopeConfig {
    pub table: &'static str,
    /// Permission code prefix, e.g. `tickets` for `tickets.view_team`.
    pub module: &'static str,
    /// Whether the undecorated `<module>.view` still means `view_all`.
    pub legacy_view: bool,
    /// Columns naming the user who owns, is assigned to or requested a row.
    pub owner_columns: &'static [&'static str],
    /// Owner columns whose user's department defines the team.
    pub team_columns: &'static [&'static str],
    /// Department column on the row itself.
    pub department_column: Option<&'static str>,
    pub filiale: FilialeSource,
    pub assignees: Option<SideTable>,
    pub related: &'static [RelatedOwners],
    pub parent: Option<ParentLink>,
    /// Creator column for the create-only fallback tier.
    pub create_fallback: Option<&'static str>,
    /// Resolvers see ticket-like rows across subsidiaries.
    pub resolver_crosses_filiale: bool,
    /// Soft-delete column, checked when this table is reached through a join.
    pub live_column: Option<&'static str>,
}

const EMPTY: ResourceScopeConfig = ResourceScopeConfig {
    table: "",
    module: "",
    legacy_view: false,
    owner_columns: &[],
    team_columns: &[],
    department_column: None,
    filiale: FilialeSource::None,
    assignees: None,
    related: &[],
    parent: None,
    create_fallback: None,
    resolver_crosses_filiale: false,
    live_column: None,
};

const TICKETS: ResourceScopeConfig = ResourceScopeConfig {
    table: "tickets",
    module: "tickets",
    legacy_view: true,
    owner_columns: &["created_by", "assigned_to", "requester_id"],
    team_columns: &["created_by", "assigned_to"],
    filiale: FilialeSource::Column("filiale_id"),
    assignees: Some(SideTable { table: "ticket_assignees", foreign_key: "ticket_id", user_column: "user_id" }),
    create_fallback: Some("created_by"),
    resolver_crosses_filiale: true,
    live_column: Some("deleted_at"),
    ..EMPTY
};

const INTERNAL_TICKETS: ResourceScopeConfig = ResourceScopeConfig {
    table: "ticket_internes",
    module: "internal_tickets",
    owner_columns: &["created_by", "assigned_to"],
    team_columns: &["created_by", "assigned_to"],
    department_column: Some("department_id"),
    filiale: FilialeSource::Column("filiale_id"),
    create_fallback: Some("created_by"),
    resolver_crosses_filiale: true,
    live_column: Some("deleted_at"),
    ..EMPTY
};

const fn ticket_extension(table: &'static str, module: &'static str) -> ResourceScopeConfig {
    ResourceScopeConfig {
        table,
        module,
        parent: Some(ParentLink { column: "ticket_id", parent: ResourceType::Tickets }),
        ..EMPTY
    }
}

const INCIDENTS: ResourceScopeConfig = ticket_extension("incidents", "incidents");
const CHANGES: ResourceScopeConfig = ticket_extension("changes", "changes");
const SERVICE_REQUESTS: ResourceScopeConfig = ticket_extension("service_requests", "service_requests");

const PROJECTS: ResourceScopeConfig = ResourceScopeConfig {
    table: "projects",
    module: "projects",
    legacy_view: true,
    owner_columns: &["created_by", "manager_id"],
    team_columns: &["created_by", "manager_id"],
    filiale: FilialeSource::Column("filiale_id"),
    assignees: Some(SideTable { table: "project_members", foreign_key: "project_id", user_column: "user_id" }),
    related: &[
        RelatedOwners {
            table: "tickets",
            foreign_key: "project_id",
            owner_columns: &["created_by"],
            live_column: Some("deleted_at"),
        },
        RelatedOwners {
            table: "project_tasks",
            foreign_key: "project_id",
            owner_columns: &["assigned_to"],
            live_column: None,
        },
    ],
    create_fallback: Some("created_by"),
    live_column: Some("deleted_at"),
    ..EMPTY
};

const ASSETS: ResourceScopeConfig = ResourceScopeConfig {
    table: "assets",
    module: "assets",
    legacy_view: true,
    owner_columns: &["assigned_to", "created_by"],
    team_columns: &["assigned_to"],
    filiale: FilialeSource::Column("filiale_id"),
    ..EMPTY
};

const KNOWLEDGE: ResourceScopeConfig = ResourceScopeConfig {
    table: "knowledge_articles",
    module: "knowledge",
    owner_columns: &["author_id"],
    team_columns: &["author_id"],
    filiale: FilialeSource::Column("filiale_id"),
    ..EMPTY
};

const SLAS: ResourceScopeConfig = ResourceScopeConfig {
    table: "slas",
    module: "slas",
    legacy_view: true,
    owner_columns: &["created_by"],
    filiale: FilialeSource::Column("filiale_id"),
    ..EMPTY
};

// Time entries and delays reference one of several owner rows (ticket,
// internal ticket, project task), any of which may be NULL. Scoping goes
// through the author only.
const TIME_ENTRIES: ResourceScopeConfig = ResourceScopeConfig {
    table: "time_entries",
    module: "time_entries",
    owner_columns: &["user_id"],
    team_columns: &["user_id"],
    filiale: FilialeSource::ViaUser("user_id"),
    ..EMPTY
};

const DELAYS: ResourceScopeConfig = ResourceScopeConfig {
    table: "delays",
    module: "delays",
    owner_columns: &["user_id"],
    team_columns: &["user_id"],
    filiale: FilialeSource::ViaUser("user_id"),
    ..EMPTY
};

const AUDIT_LOGS: ResourceScopeConfig = ResourceScopeConfig {
    table: "audit_logs",
    module: "audit_logs",
    owner_columns: &["user_id"],
    team_columns: &["user_id"],
    filiale: FilialeSource::ViaUser("user_id"),
    ..EMPTY
};

const USERS: ResourceScopeConfig = ResourceScopeConfig {
    table: "users",
    module: "users",
    owner_columns: &["id"],
    department_column: Some("department_id"),
    filiale: FilialeSource::Column("filiale_id"),
    live_column: Some("deleted_at"),
    ..EMPTY
};

impl ResourceType {
    pub const ALL: [ResourceType; 13] = [
        ResourceType::Tickets,
        ResourceType::InternalTickets,
        ResourceType::Incidents,
        ResourceType::Changes,
        ResourceType::ServiceRequests,
        ResourceType::Projects,
        ResourceType::Assets,
        ResourceType::Knowledge,
        ResourceType::Slas,
        ResourceType::TimeEntries,
        ResourceType::Delays,
        ResourceType::AuditLogs,
        ResourceType::Users,
    ];

    /// Name used in URLs.
    pub fn name(self) -> &'static str {
        match self {
            ResourceType::Tickets => "tickets",
            ResourceType::InternalTickets => "internal_tickets",
            ResourceType::Incidents => "incidents",
            ResourceType::Changes => "changes",
            ResourceType::ServiceRequests => "service_requests",
            ResourceType::Projects => "projects",
            ResourceType::Assets => "assets",
            ResourceType::Knowledge => "knowledge",
            ResourceType::Slas => "slas",
            ResourceType::TimeEntries => "time_entries",
            ResourceType::Delays => "delays",
            ResourceType::AuditLogs => "audit_logs",
            ResourceType::Users => "users",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        ResourceType::ALL.into_iter().find(|r| r.name() == s)
    }

    pub fn config(self) -> &'static ResourceScopeConfig {
        match self {
            ResourceType::Tickets => &TICKETS,
            ResourceType::InternalTickets => &INTERNAL_TICKETS,
            ResourceType::Incidents => &INCIDENTS,
            ResourceType::Changes => &CHANGES,
            ResourceType::ServiceRequests => &SERVICE_REQUESTS,
            ResourceType::Projects => &PROJECTS,
            ResourceType::Assets => &ASSETS,
            ResourceType::Knowledge => &KNOWLEDGE,
            ResourceType::Slas => &SLAS,
            ResourceType::TimeEntries => &TIME_ENTRIES,
            ResourceType::Delays => &DELAYS,
            ResourceType::AuditLogs => &AUDIT_LOGS,
            ResourceType::Users => &USERS,
        }
    }

    pub fn table(self) -> &'static str {
        self.config().table
    }

    /// Side tables the feature probe needs to watch.
    pub fn side_tables() -> Vec<&'static str> {
        ResourceType::ALL
            .into_iter()
            .filter_map(|r| r.config().assignees.map(|s| s.table))
            .collect()
    }
}
