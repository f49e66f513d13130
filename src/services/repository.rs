//! Order record write-back for capture reconciliation.

use crate::config::DatabaseConfig;
use crate::error::AppError;
use crate::services::metrics::DB_QUERY_DURATION;
use secrecy::ExposeSecret;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};

/// Connection pool over the storefront's order database. The service only
/// ever touches the order header row matched by its transaction reference.
#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    /// Build the pool without connecting. Connections are established on
    /// first use, so a dead database surfaces at the reconciliation write
    /// rather than at startup.
    pub fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect_lazy(config.url.expose_secret())
            .map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("Invalid database connection string: {}", e))
            })?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Record a successful capture on the order row currently keyed by the
    /// captured transaction's reference id: append the serialized response
    /// to the result history, stamp the time, and move the row's current
    /// transaction id to the gateway's new one.
    ///
    /// One autocommit statement; deliberately not a transaction spanning
    /// the gateway call. Returns the number of rows matched.
    #[instrument(skip(self, serialized_response), fields(ref_trans_id = %ref_trans_id, new_trans_id = %new_trans_id))]
    pub async fn record_capture(
        &self,
        ref_trans_id: &str,
        new_trans_id: &str,
        serialized_response: &str,
    ) -> Result<u64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["record_capture"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE order_header
            SET gateway_results = gateway_results || '|' || $1,
                gateway_result_ts = now(),
                transaction_num = $2
            WHERE transaction_num = $3
            "#,
        )
        .bind(serialized_response)
        .bind(new_trans_id)
        .bind(ref_trans_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update order record: {}", e))
        })?;

        timer.observe_duration();

        let rows = result.rows_affected();
        info!(rows_matched = rows, "Order record updated");
        Ok(rows)
    }
}
