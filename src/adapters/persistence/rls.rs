//! Row-level security: the storage half of the isolation enforcer.
//!
//! The predicate below is the single definition both layers share. The
//! database policies are generated from it here; the application-side query
//! filter renders the same rule via [`scope_clause`], so the two layers
//! cannot drift apart. When they would ever disagree, the database policy
//! wins: it sees the same `app.tenant_id` / `app.admin` settings that
//! `PostgresPersistence::begin_scoped` installs per transaction.

use sqlx::PgPool;
use tracing::info;

/// `admin_flag OR tenant_id = session_tenant`, in Postgres terms. NULLIF
/// keeps an unset tenant (empty string) from failing the uuid cast; the
/// comparison with NULL then simply matches no rows.
pub const RLS_PREDICATE: &str = "current_setting('app.admin', true) = 'true' \
     OR tenant_id = NULLIF(current_setting('app.tenant_id', true), '')::uuid";

/// Every table carrying a `tenant_id` column gets the policy pair.
pub const TENANT_SCOPED_TABLES: [&str; 4] =
    ["memberships", "subscriptions", "invoices", "payments"];

/// Application-side rendering of the same predicate: a SQL fragment
/// `($n OR tenant_id = $n+1)` expecting the admin flag and the (nullable)
/// session tenant as consecutive binds. With a NULL tenant and a false admin
/// flag it matches nothing, which is exactly what an unscoped non-admin
/// caller should see.
pub fn scope_clause(first_bind: usize) -> String {
    format!("(${} OR tenant_id = ${})", first_bind, first_bind + 1)
}

/// Installs (or refreshes) the row-security policies. Runs at startup after
/// migrations; drop-and-recreate keeps the policies in sync with
/// [`RLS_PREDICATE`] across releases.
pub async fn apply_policies(pool: &PgPool) -> Result<(), sqlx::Error> {
    for table in TENANT_SCOPED_TABLES {
        sqlx::query(&format!(
            "ALTER TABLE {table} ENABLE ROW LEVEL SECURITY"
        ))
        .execute(pool)
        .await?;

        sqlx::query(&format!(
            "DROP POLICY IF EXISTS {table}_isolation ON {table}"
        ))
        .execute(pool)
        .await?;
        sqlx::query(&format!(
            "CREATE POLICY {table}_isolation ON {table} \
             USING ({RLS_PREDICATE}) WITH CHECK ({RLS_PREDICATE})"
        ))
        .execute(pool)
        .await?;

        // Separate INSERT policy so a caller cannot stamp rows with a
        // foreign tenant id even if the application layer is bypassed.
        sqlx::query(&format!(
            "DROP POLICY IF EXISTS {table}_insert_policy ON {table}"
        ))
        .execute(pool)
        .await?;
        sqlx::query(&format!(
            "CREATE POLICY {table}_insert_policy ON {table} \
             FOR INSERT TO PUBLIC WITH CHECK ({RLS_PREDICATE})"
        ))
        .execute(pool)
        .await?;
    }

    info!(
        tables = ?TENANT_SCOPED_TABLES,
        "Row-level security policies applied"
    );
    Ok(())
}
