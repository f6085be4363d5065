//! In-memory evaluation of scoped queries.
//!
//! Follows SQL semantics closely enough to stand in for the database when
//! checking which rows a scope admits: comparisons against NULL are unknown,
//! unknown is not selected, and a LEFT JOIN that finds nothing binds NULLs.

use std::collections::HashMap;

use super::{ColumnRef, Join, Predicate, SqlValue};
use crate::models::query::SelectQuery;

pub type Row = HashMap<String, SqlValue>;

/// Build a row from `(column, value)` pairs.
pub fn row<const N: usize>(pairs: [(&str, SqlValue); N]) -> Row {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

#[derive(Debug, Default, Clone)]
pub struct Dataset {
    tables: HashMap<String, Vec<Row>>,
}

type Env<'a> = Vec<(&'a str, Option<&'a Row>)>;

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: &str, row: Row) -> &mut Self {
        self.tables.entry(table.to_string()).or_default().push(row);
        self
    }

    pub fn rows(&self, table: &str) -> &[Row] {
        self.tables.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Rows of the query's base table admitted by its joins and filter.
    pub fn select<'a>(&'a self, query: &'a SelectQuery) -> Vec<&'a Row> {
        let mut out = vec![];
        for base in self.rows(query.table()) {
            let mut env: Env<'a> = vec![(query.alias(), Some(base))];
            self.bind_joins(query.joins(), &mut env);
            if self.eval(query.filter(), &mut env) == Some(true) {
                out.push(base);
            }
        }
        out
    }

    /// `id` column of every selected row, in insertion order.
    pub fn select_ids(&self, query: &SelectQuery) -> Vec<i64> {
        self.select(query)
            .into_iter()
            .filter_map(|r| match r.get("id") {
                Some(SqlValue::Int(id)) => Some(*id),
                _ => None,
            })
            .collect()
    }

    fn bind_joins<'a>(&'a self, joins: &'a [Join], env: &mut Env<'a>) {
        for join in joins {
            let key = lookup(env, &join.on);
            let found = if key == SqlValue::Null {
                None
            } else {
                self.rows(&join.table).iter().find(|r| {
                    r.get(&join.key) == Some(&key)
                        && join.live_column.as_ref().is_none_or(|c| {
                            matches!(r.get(c), None | Some(SqlValue::Null))
                        })
                })
            };
            env.push((join.alias.as_str(), found));
        }
    }

    fn eval<'a>(&'a self, predicate: &'a Predicate, env: &mut Env<'a>) -> Option<bool> {
        match predicate {
            Predicate::True => Some(true),
            Predicate::False => Some(false),
            Predicate::Eq(col, value) => sql_eq(&lookup(env, col), value),
            Predicate::ColumnEq(left, right) => sql_eq(&lookup(env, left), &lookup(env, right)),
            Predicate::IsNull(col) => Some(lookup(env, col) == SqlValue::Null),
            Predicate::Not(inner) => self.eval(inner, env).map(|b| !b),
            Predicate::And(parts) => {
                let mut result = Some(true);
                for part in parts {
                    match self.eval(part, env) {
                        Some(false) => return Some(false),
                        None => result = None,
                        Some(true) => {}
                    }
                }
                result
            }
            Predicate::Or(parts) => {
                let mut result = Some(false);
                for part in parts {
                    match self.eval(part, env) {
                        Some(true) => return Some(true),
                        None => result = None,
                        Some(false) => {}
                    }
                }
                result
            }
            Predicate::Exists(sub) => {
                let depth = env.len();
                for candidate in self.rows(&sub.table) {
                    env.push((sub.alias.as_str(), Some(candidate)));
                    self.bind_joins(&sub.joins, env);
                    let hit = self.eval(&sub.filter, env) == Some(true);
                    env.truncate(depth);
                    if hit {
                        return Some(true);
                    }
                }
                Some(false)
            }
        }
    }
}

/// Innermost binding wins, which gives subqueries their own scope.
fn lookup(env: &Env<'_>, col: &ColumnRef) -> SqlValue {
    env.iter()
        .rev()
        .find(|(alias, _)| *alias == col.alias)
        .and_then(|(_, row)| *row)
        .and_then(|r| r.get(&col.column).cloned())
        .unwrap_or(SqlValue::Null)
}

fn sql_eq(left: &SqlValue, right: &SqlValue) -> Option<bool> {
    if *left == SqlValue::Null || *right == SqlValue::Null {
        return None;
    }
    Some(left == right)
}
