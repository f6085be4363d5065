//! Schema capability checks consulted while building scopes.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use sqlx::PgPool;

/// Answers whether an optional side table (e.g. `ticket_assignees`) exists.
///
/// Implementations must be cheap: scope building is synchronous and runs on
/// every request.
pub trait FeatureProbe: Send + Sync {
    fn table_exists(&self, table: &str) -> bool;
}

/// Fixed answer set, for tests and reduced deployments.
#[derive(Debug, Clone, Default)]
pub struct StaticFeatureProbe {
    tables: HashSet<String>,
}

impl StaticFeatureProbe {
    pub fn with_tables<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StaticFeatureProbe { tables: tables.into_iter().map(Into::into).collect() }
    }

    pub fn none() -> Self {
        Self::default()
    }
}

impl FeatureProbe for StaticFeatureProbe {
    fn table_exists(&self, table: &str) -> bool {
        self.tables.contains(table)
    }
}

/// Probe backed by `information_schema`.
///
/// Confirmed tables are remembered for the life of the process and never
/// forgotten. Tables not yet confirmed read as absent until a later
/// [`SchemaFeatureProbe::refresh`] finds them.
#[derive(Debug)]
pub struct SchemaFeatureProbe {
    watched: Vec<String>,
    confirmed: RwLock<HashSet<String>>,
}

impl SchemaFeatureProbe {
    pub fn new<I, S>(watched: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SchemaFeatureProbe {
            watched: watched.into_iter().map(Into::into).collect(),
            confirmed: RwLock::new(HashSet::new()),
        }
    }

    /// Look up watched tables that are not confirmed yet. Errors are logged
    /// and leave the cache as it was.
    pub async fn refresh(&self, pool: &PgPool) {
        let pending: Vec<String> = self
            .watched
            .iter()
            .filter(|t| !self.table_exists(t))
            .cloned()
            .collect();
        if pending.is_empty() {
            return;
        }
        let found: Result<Vec<String>, sqlx::Error> = sqlx::query_scalar(
            "SELECT table_name::text FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_name = ANY($1)",
        )
        .bind(&pending)
        .fetch_all(pool)
        .await;
        match found {
            Ok(tables) => {
                if tables.is_empty() {
                    return;
                }
                log::info!("Feature probe confirmed side tables: {}", tables.join(", "));
                if let Ok(mut confirmed) = self.confirmed.write() {
                    confirmed.extend(tables);
                }
            }
            Err(e) => log::warn!("Feature probe query failed: {e}"),
        }
    }
}

/// Re-probe on a fixed interval until every watched table is confirmed.
pub fn spawn_refresher(probe: Arc<SchemaFeatureProbe>, pool: PgPool, every: Duration) {
    actix_web::rt::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            if probe.watched.iter().all(|t| probe.table_exists(t)) {
                log::debug!("Feature probe: all side tables confirmed, stopping");
                break;
            }
            probe.refresh(&pool).await;
        }
    });
}

impl FeatureProbe for SchemaFeatureProbe {
    fn table_exists(&self, table: &str) -> bool {
        self.confirmed
            .read()
            .map(|confirmed| confirmed.contains(table))
            .unwrap_or(false)
    }
}
