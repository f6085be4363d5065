use sqlx::PgPool;

use crate::auth::catalog::PermissionCatalog;
use crate::errors::AppError;

/// Load every (role name, permission code) grant and build the immutable
/// in-process catalog from it.
pub async fn load_catalog(pool: &PgPool) -> Result<PermissionCatalog, AppError> {
    let pairs: Vec<(String, String)> = sqlx::query_as(
        "SELECT r.name, p.code \
         FROM role_permissions rp \
         JOIN roles r ON r.id = rp.role_id \
         JOIN permissions p ON p.id = rp.permission_id \
         ORDER BY r.name, p.code",
    )
    .fetch_all(pool)
    .await?;
    let grants = pairs.len();
    let catalog = PermissionCatalog::from_pairs(pairs);
    log::info!("Permission catalog loaded: {} roles, {grants} grants", catalog.role_count());
    Ok(catalog)
}
