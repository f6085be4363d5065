use sqlx::PgPool;

use crate::auth::subject::{DepartmentRef, FilialeRef, RoleRef, SubjectRecord};
use crate::errors::AppError;

type SubjectRow = (
    i64,
    String,
    Option<String>,
    Option<i64>,
    Option<bool>,
    Option<i64>,
    Option<bool>,
    Option<i64>,
    Option<bool>,
    Option<i64>,
    Option<bool>,
);

/// Load a live user with role, department and subsidiary relations.
/// Soft-deleted users are reported as absent.
pub async fn find_subject_record(pool: &PgPool, user_id: i64) -> Result<Option<SubjectRecord>, AppError> {
    let row: Option<SubjectRow> = sqlx::query_as(
        "SELECT u.id, u.username, \
                r.name, rf.id, rf.is_software_provider, \
                d.id, d.is_it_department, df.id, df.is_software_provider, \
                uf.id, uf.is_software_provider \
         FROM users u \
         LEFT JOIN roles r ON r.id = u.role_id \
         LEFT JOIN filiales rf ON rf.id = r.filiale_id \
         LEFT JOIN departments d ON d.id = u.department_id \
         LEFT JOIN filiales df ON df.id = d.filiale_id \
         LEFT JOIN filiales uf ON uf.id = u.filiale_id \
         WHERE u.id = $1 AND u.deleted_at IS NULL",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(into_record))
}

fn filiale(id: Option<i64>, provider: Option<bool>) -> Option<FilialeRef> {
    id.map(|id| FilialeRef { id, is_software_provider: provider.unwrap_or(false) })
}

fn into_record(row: SubjectRow) -> SubjectRecord {
    let (user_id, username, role_name, role_fil, role_fil_sp, dept_id, dept_it, dept_fil, dept_fil_sp, user_fil, user_fil_sp) =
        row;
    SubjectRecord {
        user_id,
        username,
        role: role_name.map(|name| RoleRef { name, filiale: filiale(role_fil, role_fil_sp) }),
        department: dept_id.map(|id| DepartmentRef {
            id,
            is_it_department: dept_it.unwrap_or(false),
            filiale: filiale(dept_fil, dept_fil_sp),
        }),
        filiale: filiale(user_fil, user_fil_sp),
    }
}
