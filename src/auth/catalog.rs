//! Permission codes and the role → permission lookup.
//!
//! Codes have the form `module.action` or `module.action_scope`. The static
//! catalog lists every code the scoping engine recognises, grouped by module.
//! Which codes a role holds is data, loaded once at startup into a
//! [`PermissionCatalog`].

use std::collections::{BTreeSet, HashMap};

/// Set of permission codes held by a subject. Duplicates collapse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Permissions(BTreeSet<String>);

impl Permissions {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Permissions(codes.into_iter().map(Into::into).collect())
    }

    pub fn has(&self, code: &str) -> bool {
        self.0.contains(code)
    }

    pub fn has_any(&self, codes: &[&str]) -> bool {
        codes.iter().any(|c| self.has(c))
    }

    /// True if any `module.view*` code is held.
    pub fn has_view_in(&self, module: &str) -> bool {
        self.0.iter().any(|c| {
            c.split_once('.')
                .is_some_and(|(m, action)| m == module && action.starts_with("view"))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn from_csv(csv: &str) -> Self {
        Permissions::new(csv.split(',').map(str::trim).filter(|s| !s.is_empty()))
    }
}

/// The minimal set granted when no resolver was configured.
pub const FALLBACK_PERMISSION: &str = "tickets.view_own";

/// Codes that lift the subsidiary precondition on subsidiary-scoped resources.
pub const CROSS_FILIALE_PERMISSIONS: &[&str] = &[
    "reports.view_global",
    "tickets.resolve_all",
    "filiales.compare",
];

/// Every recognised code, by module.
pub const CATALOG: &[(&str, &[&str])] = &[
    ("tickets", &[
        "tickets.view", "tickets.view_all", "tickets.view_filiale", "tickets.view_team",
        "tickets.view_own", "tickets.create", "tickets.resolve_all",
    ]),
    ("internal_tickets", &[
        "internal_tickets.view_all", "internal_tickets.view_filiale", "internal_tickets.view_team",
        "internal_tickets.view_own", "internal_tickets.create",
    ]),
    ("incidents", &[
        "incidents.view_all", "incidents.view_filiale", "incidents.view_team", "incidents.view_own",
    ]),
    ("changes", &[
        "changes.view_all", "changes.view_filiale", "changes.view_team", "changes.view_own",
    ]),
    ("service_requests", &[
        "service_requests.view_all", "service_requests.view_filiale", "service_requests.view_team",
        "service_requests.view_own",
    ]),
    ("projects", &[
        "projects.view", "projects.view_all", "projects.view_filiale", "projects.view_team",
        "projects.view_own", "projects.create",
    ]),
    ("assets", &[
        "assets.view", "assets.view_all", "assets.view_filiale", "assets.view_team", "assets.view_own",
    ]),
    ("knowledge", &["knowledge.view_all", "knowledge.view_published", "knowledge.view_own"]),
    ("slas", &["slas.view", "slas.view_all", "slas.view_filiale"]),
    ("time_entries", &[
        "time_entries.view_all", "time_entries.view_filiale", "time_entries.view_team",
        "time_entries.view_own",
    ]),
    ("delays", &["delays.view_all", "delays.view_filiale", "delays.view_team", "delays.view_own"]),
    ("audit_logs", &["audit_logs.view_all", "audit_logs.view_filiale", "audit_logs.view_own"]),
    ("users", &["users.view_all", "users.view_filiale", "users.view_team", "users.view_own"]),
    ("reports", &["reports.view_global", "reports.view_department"]),
    ("filiales", &["filiales.compare"]),
];

/// Module a code belongs to, if it is part of the catalog.
pub fn module_of(code: &str) -> Option<&'static str> {
    CATALOG
        .iter()
        .find(|(_, codes)| codes.contains(&code))
        .map(|(module, _)| *module)
}

/// Role → permission-set lookup, injected into the subject factory.
pub trait PermissionResolver: Send + Sync {
    fn permissions_for_role(&self, role_name: &str) -> Permissions;
}

/// Immutable snapshot of role permissions, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct PermissionCatalog {
    roles: HashMap<String, Permissions>,
}

impl PermissionCatalog {
    /// Build from `(role_name, code)` pairs. Codes outside the static catalog
    /// are kept but logged, since they cannot influence any scope.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut grouped: HashMap<String, BTreeSet<String>> = HashMap::new();
        for (role, code) in pairs {
            if module_of(&code).is_none() {
                log::debug!("Role {role} holds uncatalogued permission {code}");
            }
            grouped.entry(role).or_default().insert(code);
        }
        let roles = grouped
            .into_iter()
            .map(|(role, codes)| (role, Permissions(codes)))
            .collect();
        PermissionCatalog { roles }
    }

    pub fn role_count(&self) -> usize {
        self.roles.len()
    }
}

impl PermissionResolver for PermissionCatalog {
    fn permissions_for_role(&self, role_name: &str) -> Permissions {
        self.roles.get(role_name).cloned().unwrap_or_default()
    }
}
