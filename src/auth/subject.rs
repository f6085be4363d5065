//! Per-request authorization snapshot of the acting user.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::auth::catalog::{FALLBACK_PERMISSION, PermissionResolver, Permissions};
use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilialeRef {
    pub id: i64,
    pub is_software_provider: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartmentRef {
    pub id: i64,
    pub is_it_department: bool,
    pub filiale: Option<FilialeRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRef {
    pub name: String,
    pub filiale: Option<FilialeRef>,
}

/// User row with role, department and subsidiary relations loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectRecord {
    pub user_id: i64,
    pub username: String,
    pub role: Option<RoleRef>,
    pub department: Option<DepartmentRef>,
    pub filiale: Option<FilialeRef>,
}

/// Coarser scope requested by aggregate views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DashboardScope {
    Global,
    Filiale,
    Department,
}

impl DashboardScope {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "global" => Some(DashboardScope::Global),
            "filiale" => Some(DashboardScope::Filiale),
            "department" => Some(DashboardScope::Department),
            _ => None,
        }
    }

    /// Codes of which the subject must hold at least one before the hint is
    /// honoured.
    pub fn required_permissions(self) -> &'static [&'static str] {
        match self {
            DashboardScope::Global => &["reports.view_global"],
            DashboardScope::Filiale => &["reports.view_global", "filiales.compare"],
            DashboardScope::Department => {
                &["reports.view_global", "filiales.compare", "reports.view_department"]
            }
        }
    }
}

/// Caller-supplied narrowing. These only ever shrink a permitted scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScopeOverrides {
    pub filter_user_id: Option<i64>,
    pub filter_filiale_id: Option<i64>,
    pub dashboard_scope: Option<DashboardScope>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectContext {
    user_id: i64,
    department_id: Option<i64>,
    filiale_id: Option<i64>,
    role_name: String,
    permissions: Permissions,
    is_resolver: bool,
    department_is_it: bool,
    overrides: ScopeOverrides,
}

impl SubjectContext {
    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn department_id(&self) -> Option<i64> {
        self.department_id
    }

    pub fn filiale_id(&self) -> Option<i64> {
        self.filiale_id
    }

    pub fn role_name(&self) -> &str {
        &self.role_name
    }

    pub fn permissions(&self) -> &Permissions {
        &self.permissions
    }

    pub fn has(&self, code: &str) -> bool {
        self.permissions.has(code)
    }

    pub fn is_resolver(&self) -> bool {
        self.is_resolver
    }

    pub fn department_is_it(&self) -> bool {
        self.department_is_it
    }

    pub fn overrides(&self) -> &ScopeOverrides {
        &self.overrides
    }

    /// Same subject with different overrides. The receiver is left untouched.
    pub fn with_overrides(&self, overrides: ScopeOverrides) -> SubjectContext {
        SubjectContext { overrides, ..self.clone() }
    }
}

/// Builds [`SubjectContext`]s with an injected permission resolver.
#[derive(Clone)]
pub struct SubjectContextFactory {
    resolver: Option<Arc<dyn PermissionResolver>>,
}

#[derive(Default)]
pub struct SubjectContextFactoryBuilder {
    resolver: Option<Arc<dyn PermissionResolver>>,
}

impl SubjectContextFactoryBuilder {
    pub fn resolver(mut self, resolver: Arc<dyn PermissionResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Fails when no resolver was supplied; production startup goes through here.
    pub fn build(self) -> Result<SubjectContextFactory, AppError> {
        match self.resolver {
            Some(resolver) => Ok(SubjectContextFactory::new(resolver)),
            None => Err(AppError::Config("permission resolver not configured".to_string())),
        }
    }
}

impl SubjectContextFactory {
    pub fn new(resolver: Arc<dyn PermissionResolver>) -> Self {
        SubjectContextFactory { resolver: Some(resolver) }
    }

    pub fn builder() -> SubjectContextFactoryBuilder {
        SubjectContextFactoryBuilder::default()
    }

    /// Factory that grants every subject only [`FALLBACK_PERMISSION`].
    pub fn without_resolver() -> Self {
        log::error!(
            "No permission resolver configured; every subject falls back to {FALLBACK_PERMISSION}"
        );
        SubjectContextFactory { resolver: None }
    }

    pub fn has_resolver(&self) -> bool {
        self.resolver.is_some()
    }

    pub fn build(&self, record: &SubjectRecord, overrides: ScopeOverrides) -> SubjectContext {
        let role_name = record.role.as_ref().map(|r| r.name.clone()).unwrap_or_default();
        let permissions = match &self.resolver {
            Some(resolver) => resolver.permissions_for_role(&role_name),
            None => Permissions::new([FALLBACK_PERMISSION]),
        };

        // user, then role, then department
        let filiale = record
            .filiale
            .or_else(|| record.role.as_ref().and_then(|r| r.filiale))
            .or_else(|| record.department.as_ref().and_then(|d| d.filiale));
        if filiale.is_none() {
            log::warn!(
                "User {} ({}) has no resolvable filiale; subsidiary-scoped rows will not be visible",
                record.user_id,
                record.username
            );
        }

        let department_is_it = record.department.as_ref().is_some_and(|d| d.is_it_department);
        let is_resolver = department_is_it && filiale.is_some_and(|f| f.is_software_provider);

        SubjectContext {
            user_id: record.user_id,
            department_id: record.department.as_ref().map(|d| d.id),
            filiale_id: filiale.map(|f| f.id),
            role_name,
            permissions,
            is_resolver,
            department_is_it,
            overrides,
        }
    }
}
