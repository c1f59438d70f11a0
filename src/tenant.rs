// Tenant Connections
// OAuth token state for each connected accounting-platform organization,
// plus the per-tenant refresh lock that keeps two concurrent requests from
// both refreshing the same expired token and invalidating each other.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

/// Allowance for clock skew between us and the platform's token clock.
/// A token "expiring" inside this window is treated as already expired.
pub const EXPIRY_SKEW_SECONDS: i64 = 60;

/// Stored OAuth state for one tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantConnection {
    pub tenant_id: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TenantConnection {
    pub fn new(
        tenant_id: impl Into<String>,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_in_seconds: i64,
    ) -> Self {
        let now = Utc::now();
        TenantConnection {
            tenant_id: tenant_id.into(),
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at: now + Duration::seconds(expires_in_seconds),
            updated_at: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now + Duration::seconds(EXPIRY_SKEW_SECONDS)
    }
}

// ============================================================================
// CRUD
// ============================================================================

/// Insert or replace the token row for a tenant. Exchange and refresh both
/// land here; the row is keyed by tenant so there is exactly one live set of
/// tokens per organization.
pub fn upsert_connection(conn: &Connection, connection: &TenantConnection) -> Result<()> {
    conn.execute(
        "INSERT INTO tenant_connections (tenant_id, access_token, refresh_token, expires_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(tenant_id) DO UPDATE SET
            access_token = excluded.access_token,
            refresh_token = excluded.refresh_token,
            expires_at = excluded.expires_at,
            updated_at = excluded.updated_at",
        params![
            connection.tenant_id,
            connection.access_token,
            connection.refresh_token,
            connection.expires_at.to_rfc3339(),
            connection.updated_at.to_rfc3339(),
        ],
    )?;

    Ok(())
}

pub fn get_connection(conn: &Connection, tenant_id: &str) -> Result<Option<TenantConnection>> {
    let connection = conn
        .query_row(
            "SELECT tenant_id, access_token, refresh_token, expires_at, updated_at
             FROM tenant_connections WHERE tenant_id = ?1",
            params![tenant_id],
            |row| {
                let expires_at_str: String = row.get(3)?;
                let updated_at_str: String = row.get(4)?;

                Ok(TenantConnection {
                    tenant_id: row.get(0)?,
                    access_token: row.get(1)?,
                    refresh_token: row.get(2)?,
                    expires_at: DateTime::parse_from_rfc3339(&expires_at_str)
                        .map(|dt| dt.with_timezone(&Utc))
                        .unwrap_or_else(|_| Utc::now()),
                    updated_at: DateTime::parse_from_rfc3339(&updated_at_str)
                        .map(|dt| dt.with_timezone(&Utc))
                        .unwrap_or_else(|_| Utc::now()),
                })
            },
        )
        .optional()?;

    Ok(connection)
}

pub fn delete_connection(conn: &Connection, tenant_id: &str) -> Result<bool> {
    let changed = conn.execute(
        "DELETE FROM tenant_connections WHERE tenant_id = ?1",
        params![tenant_id],
    )?;

    Ok(changed > 0)
}

// ============================================================================
// PER-TENANT REFRESH LOCK (server mode)
// ============================================================================

/// Keyed async mutexes, one per tenant.
///
/// Two requests for the same tenant that both observe an expired token
/// serialize here: the first refreshes, the second re-reads the stored row
/// after acquiring the lock and finds a fresh token instead of refreshing
/// again. Lock entries are never removed; the tenant population is small
/// and bounded by the client list.
#[cfg(feature = "server")]
#[derive(Clone, Default)]
pub struct RefreshLocks {
    inner: std::sync::Arc<
        std::sync::Mutex<
            std::collections::HashMap<String, std::sync::Arc<tokio::sync::Mutex<()>>>,
        >,
    >,
}

#[cfg(feature = "server")]
impl RefreshLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock handle for one tenant. The outer std mutex only guards the map
    /// and is never held across an await.
    pub fn for_tenant(&self, tenant_id: &str) -> std::sync::Arc<tokio::sync::Mutex<()>> {
        let mut map = self.inner.lock().unwrap();
        map.entry(tenant_id.to_string())
            .or_insert_with(|| std::sync::Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

// ============================================================================
// TESTS
// ============================================================================
