use super::{ColumnRef, Join, Predicate, SqlValue, Subquery};

#[derive(Debug, PartialEq)]
pub enum BuildError {
    InvalidIdentifier(String),
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildError::InvalidIdentifier(name) => write!(f, "invalid SQL identifier: {name}"),
        }
    }
}

/// Table, alias and column names end up in SQL text, so only plain
/// lowercase identifiers are accepted.
pub fn check_ident(name: &str) -> Result<&str, BuildError> {
    let valid = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid { Ok(name) } else { Err(BuildError::InvalidIdentifier(name.to_string())) }
}

fn column(col: &ColumnRef) -> Result<String, BuildError> {
    Ok(format!("{}.{}", check_ident(&col.alias)?, check_ident(&col.column)?))
}

/// Build a parameterized WHERE fragment from a predicate.
/// Returns (sql_fragment, params_vec).
/// param_offset: the $N index to start from (so callers can combine with other params).
pub fn build_where_clause(
    predicate: &Predicate,
    param_offset: usize,
) -> Result<(String, Vec<SqlValue>), BuildError> {
    let mut params = vec![];
    let sql = build_predicate(predicate, param_offset, &mut params)?;
    Ok((sql, params))
}

/// Render `LEFT JOIN` clauses, each prefixed with a space.
pub fn build_joins(joins: &[Join]) -> Result<String, BuildError> {
    let mut sql = String::new();
    for join in joins {
        let alias = check_ident(&join.alias)?;
        sql.push_str(&format!(
            " LEFT JOIN {} AS {alias} ON {alias}.{} = {}",
            check_ident(&join.table)?,
            check_ident(&join.key)?,
            column(&join.on)?,
        ));
        if let Some(live) = &join.live_column {
            sql.push_str(&format!(" AND {alias}.{} IS NULL", check_ident(live)?));
        }
    }
    Ok(sql)
}

fn build_predicate(
    predicate: &Predicate,
    param_offset: usize,
    params: &mut Vec<SqlValue>,
) -> Result<String, BuildError> {
    let sql = match predicate {
        Predicate::True => "1=1".to_string(),
        Predicate::False => "1=0".to_string(),
        Predicate::Eq(col, value) => {
            params.push(value.clone());
            let n = param_offset + params.len(); // PostgreSQL uses 1-based $N
            format!("{} = ${n}", column(col)?)
        }
        Predicate::ColumnEq(left, right) => format!("{} = {}", column(left)?, column(right)?),
        Predicate::IsNull(col) => format!("{} IS NULL", column(col)?),
        Predicate::And(parts) => build_group(parts, " AND ", param_offset, params)?,
        Predicate::Or(parts) => build_group(parts, " OR ", param_offset, params)?,
        Predicate::Not(inner) => format!("NOT ({})", build_predicate(inner, param_offset, params)?),
        Predicate::Exists(sub) => build_exists(sub, param_offset, params)?,
    };
    Ok(sql)
}

fn build_group(
    parts: &[Predicate],
    logic: &str,
    param_offset: usize,
    params: &mut Vec<SqlValue>,
) -> Result<String, BuildError> {
    let mut rendered = Vec::with_capacity(parts.len());
    for part in parts {
        rendered.push(build_predicate(part, param_offset, params)?);
    }
    Ok(format!("({})", rendered.join(logic)))
}

fn build_exists(
    sub: &Subquery,
    param_offset: usize,
    params: &mut Vec<SqlValue>,
) -> Result<String, BuildError> {
    let joins = build_joins(&sub.joins)?;
    let filter = build_predicate(&sub.filter, param_offset, params)?;
    Ok(format!(
        "EXISTS (SELECT 1 FROM {} AS {}{joins} WHERE {filter})",
        check_ident(&sub.table)?,
        check_ident(&sub.alias)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(alias: &str, c: &str) -> ColumnRef {
        ColumnRef::new(alias, c)
    }

    #[test]
    fn constant_predicates() {
        assert_eq!(build_where_clause(&Predicate::True, 0).unwrap(), ("1=1".to_string(), vec![]));
        assert_eq!(build_where_clause(&Predicate::False, 0).unwrap(), ("1=0".to_string(), vec![]));
    }

    #[test]
    fn or_of_owner_columns() {
        let p = Predicate::or([
            Predicate::eq(col("t", "created_by"), 7),
            Predicate::eq(col("t", "assigned_to"), 7),
        ]);
        let (sql, params) = build_where_clause(&p, 0).unwrap();
        assert_eq!(sql, "(t.created_by = $1 OR t.assigned_to = $2)");
        assert_eq!(params, vec![SqlValue::Int(7), SqlValue::Int(7)]);
    }

    #[test]
    fn nested_groups_keep_parentheses() {
        let p = Predicate::and([
            Predicate::or([Predicate::is_null(col("t", "filiale_id")), Predicate::eq(col("t", "filiale_id"), 3)]),
            Predicate::or([Predicate::eq(col("t", "created_by"), 7), Predicate::eq(col("t", "assigned_to"), 7)]),
        ]);
        let (sql, _) = build_where_clause(&p, 0).unwrap();
        assert_eq!(
            sql,
            "((t.filiale_id IS NULL OR t.filiale_id = $1) AND (t.created_by = $2 OR t.assigned_to = $3))"
        );
    }

    #[test]
    fn exists_renders_correlated_subquery() {
        let p = Predicate::exists(Subquery {
            table: "ticket_assignees".into(),
            alias: "ta".into(),
            joins: vec![],
            filter: Predicate::and([
                Predicate::ColumnEq(col("ta", "ticket_id"), col("t", "id")),
                Predicate::eq(col("ta", "user_id"), 7),
            ]),
        });
        let (sql, params) = build_where_clause(&p, 2).unwrap();
        assert_eq!(
            sql,
            "EXISTS (SELECT 1 FROM ticket_assignees AS ta WHERE (ta.ticket_id = t.id AND ta.user_id = $3))"
        );
        assert_eq!(params, vec![SqlValue::Int(7)]);
    }

    #[test]
    fn joins_exclude_soft_deleted_rows() {
        let joins = vec![Join::left("users", "creator", "id", col("t", "created_by")).live_only("deleted_at")];
        let sql = build_joins(&joins).unwrap();
        assert_eq!(
            sql,
            " LEFT JOIN users AS creator ON creator.id = t.created_by AND creator.deleted_at IS NULL"
        );
    }

    #[test]
    fn rejects_suspicious_identifiers() {
        let p = Predicate::eq(col("t", "id; DROP TABLE users"), 1);
        assert!(build_where_clause(&p, 0).is_err());
    }
}
