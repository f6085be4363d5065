//! Ticket listings restricted to one category.

use crate::auth::subject::SubjectContext;
use crate::models::predicate::{ColumnRef, Predicate, ScopePredicate};

use super::{ResourceType, ScopeEngine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketCategory {
    Incident,
    Change,
    ServiceRequest,
}

impl TicketCategory {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "incident" => Some(TicketCategory::Incident),
            "change" => Some(TicketCategory::Change),
            "service_request" => Some(TicketCategory::ServiceRequest),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TicketCategory::Incident => "incident",
            TicketCategory::Change => "change",
            TicketCategory::ServiceRequest => "service_request",
        }
    }

    /// Permission module checked first for this category.
    pub fn module(self) -> &'static str {
        match self {
            TicketCategory::Incident => ResourceType::Incidents.config().module,
            TicketCategory::Change => ResourceType::Changes.config().module,
            TicketCategory::ServiceRequest => ResourceType::ServiceRequests.config().module,
        }
    }
}

impl ScopeEngine {
    /// Tickets of one category. The category's own permission module is
    /// consulted first, then the tickets module. Categories that are not
    /// enumerated here see nothing, whatever the subject holds.
    pub fn build_ticket_category(&self, category: &str, ctx: &SubjectContext) -> ScopePredicate {
        let Some(category) = TicketCategory::parse(category) else {
            log::debug!("Unknown ticket category {category:?}; denying");
            return ScopePredicate::deny_all();
        };
        let cfg = ResourceType::Tickets.config();
        let mut scope = self.tiered(cfg, category.module(), ctx, cfg.table);
        if scope.is_deny_all() {
            scope = self.tiered(cfg, cfg.module, ctx, cfg.table);
        }
        let in_category = ScopePredicate {
            condition: Predicate::eq(ColumnRef::new(cfg.table, "category"), category.as_str()),
            joins: vec![],
        };
        scope.intersect(&in_category)
    }
}
