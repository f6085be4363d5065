//! Query composition: attaching scope predicates to a listing query.
//!
//! A [`SelectQuery`] is a plain value. [`SelectQuery::scoped`] never mutates
//! the receiver, so a base query can be shared and narrowed for several
//! subjects at once.

use crate::models::predicate::builder::{BuildError, build_joins, build_where_clause, check_ident};
use crate::models::predicate::{Join, Predicate, ScopePredicate, SqlValue, merge_joins};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum SortDir { #[default] Asc, Desc }

#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    table: String,
    alias: String,
    joins: Vec<Join>,
    filter: Predicate,
    order_by: Option<(String, SortDir)>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl SelectQuery {
    /// Unfiltered query over `table`, aliased by its own name.
    pub fn from_table(table: &str) -> Self {
        SelectQuery {
            table: table.to_string(),
            alias: table.to_string(),
            joins: vec![],
            filter: Predicate::True,
            order_by: None,
            limit: None,
            offset: None,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    pub fn filter(&self) -> &Predicate {
        &self.filter
    }

    /// New query restricted to `scope`. Joins already present under the same
    /// alias are not repeated, and attaching the same scope twice yields the
    /// same query as attaching it once.
    pub fn scoped(&self, scope: &ScopePredicate) -> SelectQuery {
        let mut next = self.clone();
        next.filter = Predicate::and([self.filter.clone(), scope.condition.clone()]);
        if !next.filter.is_false() && !scope.condition.is_true() {
            merge_joins(&mut next.joins, &scope.joins);
        }
        next
    }

    pub fn order_by(mut self, column: &str, dir: SortDir) -> Self {
        self.order_by = Some((column.to_string(), dir));
        self
    }

    pub fn paginate(mut self, page: i64, per_page: i64) -> Self {
        let page = page.max(1);
        let per_page = per_page.clamp(1, 100);
        self.limit = Some(per_page);
        self.offset = Some((page - 1) * per_page);
        self
    }

    fn from_clause(&self, params: &mut Vec<SqlValue>) -> Result<String, BuildError> {
        let joins = build_joins(&self.joins)?;
        let (filter, mut filter_params) = build_where_clause(&self.filter, params.len())?;
        params.append(&mut filter_params);
        Ok(format!(
            "FROM {} AS {}{joins} WHERE {filter}",
            check_ident(&self.table)?,
            check_ident(&self.alias)?,
        ))
    }

    /// `SELECT to_jsonb(alias.*) AS row ...` with `$N` placeholders.
    pub fn to_sql(&self) -> Result<(String, Vec<SqlValue>), BuildError> {
        let mut params = vec![];
        let alias = check_ident(&self.alias)?;
        let mut sql = format!("SELECT to_jsonb({alias}.*) AS row {}", self.from_clause(&mut params)?);
        if let Some((column, dir)) = &self.order_by {
            let dir = match dir { SortDir::Asc => "ASC", SortDir::Desc => "DESC" };
            sql.push_str(&format!(" ORDER BY {alias}.{} {dir}", check_ident(column)?));
        }
        if let Some(limit) = self.limit {
            params.push(SqlValue::Int(limit));
            sql.push_str(&format!(" LIMIT ${}", params.len()));
        }
        if let Some(offset) = self.offset {
            params.push(SqlValue::Int(offset));
            sql.push_str(&format!(" OFFSET ${}", params.len()));
        }
        Ok((sql, params))
    }

    /// Row count for the filtered query, ignoring ordering and pagination.
    pub fn count_sql(&self) -> Result<(String, Vec<SqlValue>), BuildError> {
        let mut params = vec![];
        let sql = format!("SELECT COUNT(*) {}", self.from_clause(&mut params)?);
        Ok((sql, params))
    }
}
