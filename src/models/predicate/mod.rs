//! Structured row-filter expressions.
//!
//! A [`Predicate`] is a boolean condition over typed column references. It is
//! rendered to parameterized SQL by [`builder`] and can be evaluated directly
//! over in-memory rows by [`eval`]. Scope builders only ever produce values of
//! these types; nothing is assembled by string concatenation.

use serde::Serialize;

pub mod builder;
pub mod eval;

/// A scalar bound into a predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Int(i64),
    Bool(bool),
    Text(String),
}

impl From<i64> for SqlValue {
    fn from(n: i64) -> Self {
        SqlValue::Int(n)
    }
}

impl From<i32> for SqlValue {
    fn from(n: i32) -> Self {
        SqlValue::Int(i64::from(n))
    }
}

impl From<bool> for SqlValue {
    fn from(b: bool) -> Self {
        SqlValue::Bool(b)
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// `alias.column`, where `alias` names the base table, a declared join, or a
/// subquery table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub alias: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(alias: &str, column: &str) -> Self {
        ColumnRef { alias: alias.to_string(), column: column.to_string() }
    }
}

/// Correlated `EXISTS (SELECT 1 FROM table AS alias ... WHERE filter)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subquery {
    pub table: String,
    pub alias: String,
    pub joins: Vec<Join>,
    pub filter: Predicate,
}

/// A to-one `LEFT JOIN table AS alias ON alias.key = on`.
///
/// When `live_column` is set, only rows where that column is NULL match, which
/// is how soft-deleted rows are kept out of the join.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Join {
    pub table: String,
    pub alias: String,
    pub key: String,
    pub on: ColumnRef,
    pub live_column: Option<String>,
}

impl Join {
    pub fn left(table: &str, alias: &str, key: &str, on: ColumnRef) -> Self {
        Join {
            table: table.to_string(),
            alias: alias.to_string(),
            key: key.to_string(),
            on,
            live_column: None,
        }
    }

    pub fn live_only(mut self, column: &str) -> Self {
        self.live_column = Some(column.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    True,
    False,
    Eq(ColumnRef, SqlValue),
    ColumnEq(ColumnRef, ColumnRef),
    IsNull(ColumnRef),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    Exists(Box<Subquery>),
}

impl Predicate {
    pub fn eq(column: ColumnRef, value: impl Into<SqlValue>) -> Self {
        Predicate::Eq(column, value.into())
    }

    pub fn is_null(column: ColumnRef) -> Self {
        Predicate::IsNull(column)
    }

    pub fn exists(subquery: Subquery) -> Self {
        if subquery.filter == Predicate::False {
            return Predicate::False;
        }
        Predicate::Exists(Box::new(subquery))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: Predicate) -> Self {
        match inner {
            Predicate::True => Predicate::False,
            Predicate::False => Predicate::True,
            Predicate::Not(p) => *p,
            other => Predicate::Not(Box::new(other)),
        }
    }

    /// Conjunction. `True` operands vanish, any `False` absorbs the whole
    /// expression, nested conjunctions are flattened and repeated operands
    /// are kept once.
    pub fn and(parts: impl IntoIterator<Item = Predicate>) -> Self {
        let mut out: Vec<Predicate> = Vec::new();
        for part in parts {
            match part {
                Predicate::True => {}
                Predicate::False => return Predicate::False,
                Predicate::And(inner) => {
                    for p in inner {
                        if !out.contains(&p) {
                            out.push(p);
                        }
                    }
                }
                other => {
                    if !out.contains(&other) {
                        out.push(other);
                    }
                }
            }
        }
        match out.len() {
            0 => Predicate::True,
            1 => out.remove(0),
            _ => Predicate::And(out),
        }
    }

    /// Disjunction, the dual of [`Predicate::and`].
    pub fn or(parts: impl IntoIterator<Item = Predicate>) -> Self {
        let mut out: Vec<Predicate> = Vec::new();
        for part in parts {
            match part {
                Predicate::False => {}
                Predicate::True => return Predicate::True,
                Predicate::Or(inner) => {
                    for p in inner {
                        if !out.contains(&p) {
                            out.push(p);
                        }
                    }
                }
                other => {
                    if !out.contains(&other) {
                        out.push(other);
                    }
                }
            }
        }
        match out.len() {
            0 => Predicate::False,
            1 => out.remove(0),
            _ => Predicate::Or(out),
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Predicate::True)
    }

    pub fn is_false(&self) -> bool {
        matches!(self, Predicate::False)
    }
}

/// Output of a scope builder: a condition plus the joins it relies on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopePredicate {
    pub condition: Predicate,
    pub joins: Vec<Join>,
}

impl ScopePredicate {
    pub fn allow_all() -> Self {
        ScopePredicate { condition: Predicate::True, joins: vec![] }
    }

    pub fn deny_all() -> Self {
        ScopePredicate { condition: Predicate::False, joins: vec![] }
    }

    pub fn is_allow_all(&self) -> bool {
        self.condition.is_true()
    }

    pub fn is_deny_all(&self) -> bool {
        self.condition.is_false()
    }

    /// Intersect two scopes over the same base table. Joins are merged by alias.
    pub fn intersect(&self, other: &ScopePredicate) -> ScopePredicate {
        let mut joins = self.joins.clone();
        merge_joins(&mut joins, &other.joins);
        let condition = Predicate::and([self.condition.clone(), other.condition.clone()]);
        if condition.is_false() || condition.is_true() {
            joins.clear();
        }
        ScopePredicate { condition, joins }
    }
}

/// Append joins not already present under the same alias.
pub fn merge_joins(target: &mut Vec<Join>, extra: &[Join]) {
    for join in extra {
        if !target.iter().any(|j| j.alias == join.alias) {
            target.push(join.clone());
        }
    }
}
