// Console Store - SQLite persistence for the client-management surface
// Clients, users, tasks, custom fields. Plain parameterized CRUD: every
// mutation is a single-row, single-table operation, so there are no
// multi-table transactions to manage.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

// ============================================================================
// ROW MODELS
// ============================================================================

/// A client business managed in the console, mapped 1:1 to an accounting
/// platform tenant once connected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientBusiness {
    pub id: String,
    pub name: String,
    /// Tenant id on the accounting platform; None until connected.
    pub tenant_id: Option<String>,
    pub industry: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ClientBusiness {
    pub fn new(name: impl Into<String>) -> Self {
        ClientBusiness {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            tenant_id: None,
            industry: None,
            created_at: Utc::now(),
        }
    }
}

/// An authenticated principal as the hosted auth service reports it.
/// We store only the claims the console reads: id, email, role, account type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    /// "admin" | "staff" | "client"
    pub role: String,
    /// "console" for internal staff, "portal" for end-customers.
    pub account_type: String,
}

/// A work item attached to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub client_id: String,
    pub title: String,
    /// "open" | "in_progress" | "done"
    pub status: String,
    pub due_date: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(client_id: &str, title: impl Into<String>) -> Self {
        Task {
            id: uuid::Uuid::new_v4().to_string(),
            client_id: client_id.to_string(),
            title: title.into(),
            status: "open".to_string(),
            due_date: None,
            created_at: Utc::now(),
        }
    }
}

/// Free-form per-client field ("ABN", "Year end", ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomField {
    pub client_id: String,
    pub name: String,
    pub value: String,
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS clients (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            tenant_id TEXT,
            industry TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT UNIQUE NOT NULL,
            role TEXT NOT NULL,
            account_type TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS tasks (
            id TEXT PRIMARY KEY,
            client_id TEXT NOT NULL,
            title TEXT NOT NULL,
            status TEXT NOT NULL,
            due_date TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS custom_fields (
            client_id TEXT NOT NULL,
            name TEXT NOT NULL,
            value TEXT NOT NULL,
            PRIMARY KEY (client_id, name)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS invitations (
            id TEXT PRIMARY KEY,
            token_hash TEXT UNIQUE NOT NULL,
            email TEXT NOT NULL,
            client_id TEXT NOT NULL,
            role TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            accepted INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS tenant_connections (
            tenant_id TEXT PRIMARY KEY,
            access_token TEXT NOT NULL,
            refresh_token TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_tasks_client ON tasks(client_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_clients_tenant ON clients(tenant_id)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// CLIENTS
// ============================================================================

pub fn insert_client(conn: &Connection, client: &ClientBusiness) -> Result<()> {
    conn.execute(
        "INSERT INTO clients (id, name, tenant_id, industry, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            client.id,
            client.name,
            client.tenant_id,
            client.industry,
            client.created_at.to_rfc3339(),
        ],
    )?;

    Ok(())
}

fn client_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ClientBusiness> {
    let created_at_str: String = row.get(4)?;

    Ok(ClientBusiness {
        id: row.get(0)?,
        name: row.get(1)?,
        tenant_id: row.get(2)?,
        industry: row.get(3)?,
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

pub fn get_all_clients(conn: &Connection) -> Result<Vec<ClientBusiness>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, tenant_id, industry, created_at FROM clients ORDER BY name",
    )?;

    let clients = stmt
        .query_map([], client_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(clients)
}

pub fn get_client(conn: &Connection, id: &str) -> Result<Option<ClientBusiness>> {
    let client = conn
        .query_row(
            "SELECT id, name, tenant_id, industry, created_at FROM clients WHERE id = ?1",
            params![id],
            client_from_row,
        )
        .optional()?;

    Ok(client)
}

pub fn update_client(conn: &Connection, client: &ClientBusiness) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE clients SET name = ?2, tenant_id = ?3, industry = ?4 WHERE id = ?1",
        params![client.id, client.name, client.tenant_id, client.industry],
    )?;

    Ok(changed > 0)
}

pub fn delete_client(conn: &Connection, id: &str) -> Result<bool> {
    let changed = conn.execute("DELETE FROM clients WHERE id = ?1", params![id])?;

    Ok(changed > 0)
}

/// Look up the client connected to a given platform tenant.
pub fn get_client_by_tenant(conn: &Connection, tenant_id: &str) -> Result<Option<ClientBusiness>> {
    let client = conn
        .query_row(
            "SELECT id, name, tenant_id, industry, created_at FROM clients WHERE tenant_id = ?1",
            params![tenant_id],
            client_from_row,
        )
        .optional()?;

    Ok(client)
}

// ============================================================================
// USERS
// ============================================================================

pub fn insert_user(conn: &Connection, user: &User) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, email, role, account_type) VALUES (?1, ?2, ?3, ?4)",
        params![user.id, user.email, user.role, user.account_type],
    )?;

    Ok(())
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, email, role, account_type FROM users WHERE email = ?1",
            params![email],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    role: row.get(2)?,
                    account_type: row.get(3)?,
                })
            },
        )
        .optional()?;

    Ok(user)
}

// ============================================================================
// TASKS
// ============================================================================

pub fn insert_task(conn: &Connection, task: &Task) -> Result<()> {
    conn.execute(
        "INSERT INTO tasks (id, client_id, title, status, due_date, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            task.id,
            task.client_id,
            task.title,
            task.status,
            task.due_date,
            task.created_at.to_rfc3339(),
        ],
    )?;

    Ok(())
}

pub fn get_tasks_for_client(conn: &Connection, client_id: &str) -> Result<Vec<Task>> {
    let mut stmt = conn.prepare(
        "SELECT id, client_id, title, status, due_date, created_at
         FROM tasks WHERE client_id = ?1 ORDER BY created_at",
    )?;

    let tasks = stmt
        .query_map(params![client_id], |row| {
            let created_at_str: String = row.get(5)?;

            Ok(Task {
                id: row.get(0)?,
                client_id: row.get(1)?,
                title: row.get(2)?,
                status: row.get(3)?,
                due_date: row.get(4)?,
                created_at: DateTime::parse_from_rfc3339(&created_at_str)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(tasks)
}

pub fn update_task_status(conn: &Connection, task_id: &str, status: &str) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE tasks SET status = ?2 WHERE id = ?1",
        params![task_id, status],
    )?;

    Ok(changed > 0)
}

pub fn delete_task(conn: &Connection, task_id: &str) -> Result<bool> {
    let changed = conn.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;

    Ok(changed > 0)
}

// ============================================================================
// CUSTOM FIELDS
// ============================================================================

pub fn set_custom_field(conn: &Connection, field: &CustomField) -> Result<()> {
    conn.execute(
        "INSERT INTO custom_fields (client_id, name, value) VALUES (?1, ?2, ?3)
         ON CONFLICT(client_id, name) DO UPDATE SET value = excluded.value",
        params![field.client_id, field.name, field.value],
    )?;

    Ok(())
}

pub fn get_custom_fields(conn: &Connection, client_id: &str) -> Result<Vec<CustomField>> {
    let mut stmt = conn.prepare(
        "SELECT client_id, name, value FROM custom_fields WHERE client_id = ?1 ORDER BY name",
    )?;

    let fields = stmt
        .query_map(params![client_id], |row| {
            Ok(CustomField {
                client_id: row.get(0)?,
                name: row.get(1)?,
                value: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(fields)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    #[test]
    fn test_client_crud_roundtrip() {
        let conn = test_conn();

        let mut client = ClientBusiness::new("Acme Plumbing");
        client.industry = Some("Trades".to_string());
        insert_client(&conn, &client).unwrap();

        let fetched = get_client(&conn, &client.id).unwrap().unwrap();
        assert_eq!(fetched.name, "Acme Plumbing");
        assert_eq!(fetched.industry.as_deref(), Some("Trades"));
        assert!(fetched.tenant_id.is_none());

        let mut updated = fetched.clone();
        updated.tenant_id = Some("tenant-123".to_string());
        assert!(update_client(&conn, &updated).unwrap());

        let by_tenant = get_client_by_tenant(&conn, "tenant-123").unwrap().unwrap();
        assert_eq!(by_tenant.id, client.id);

        assert!(delete_client(&conn, &client.id).unwrap());
        assert!(get_client(&conn, &client.id).unwrap().is_none());
        assert!(!delete_client(&conn, &client.id).unwrap());
    }

    #[test]
    fn test_clients_ordered_by_name() {
        let conn = test_conn();

        insert_client(&conn, &ClientBusiness::new("Zeta Co")).unwrap();
        insert_client(&conn, &ClientBusiness::new("Alpha Ltd")).unwrap();

        let clients = get_all_clients(&conn).unwrap();
        assert_eq!(clients[0].name, "Alpha Ltd");
        assert_eq!(clients[1].name, "Zeta Co");
    }

    #[test]
    fn test_user_lookup_by_email() {
        let conn = test_conn();

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: "staff@example.com".to_string(),
            role: "staff".to_string(),
            account_type: "console".to_string(),
        };
        insert_user(&conn, &user).unwrap();

        let fetched = get_user_by_email(&conn, "staff@example.com")
            .unwrap()
            .unwrap();
        assert_eq!(fetched, user);
        assert!(get_user_by_email(&conn, "nobody@example.com")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_duplicate_user_email_rejected() {
        let conn = test_conn();

        let mut user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: "dup@example.com".to_string(),
            role: "staff".to_string(),
            account_type: "console".to_string(),
        };
        insert_user(&conn, &user).unwrap();

        user.id = uuid::Uuid::new_v4().to_string();
        assert!(insert_user(&conn, &user).is_err());
    }

    #[test]
    fn test_task_lifecycle() {
        let conn = test_conn();

        let client = ClientBusiness::new("Acme");
        insert_client(&conn, &client).unwrap();

        let task = Task::new(&client.id, "Prepare BAS");
        insert_task(&conn, &task).unwrap();

        let tasks = get_tasks_for_client(&conn, &client.id).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].status, "open");

        assert!(update_task_status(&conn, &task.id, "done").unwrap());
        let tasks = get_tasks_for_client(&conn, &client.id).unwrap();
        assert_eq!(tasks[0].status, "done");

        assert!(delete_task(&conn, &task.id).unwrap());
        assert!(get_tasks_for_client(&conn, &client.id).unwrap().is_empty());
    }

    #[test]
    fn test_custom_field_upsert() {
        let conn = test_conn();

        let field = CustomField {
            client_id: "c1".to_string(),
            name: "Year end".to_string(),
            value: "30 June".to_string(),
        };
        set_custom_field(&conn, &field).unwrap();

        let replaced = CustomField {
            value: "31 December".to_string(),
            ..field.clone()
        };
        set_custom_field(&conn, &replaced).unwrap();

        let fields = get_custom_fields(&conn, "c1").unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].value, "31 December");
    }
}
