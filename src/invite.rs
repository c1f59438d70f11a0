// Invitation Tokens
// Issue/validate/accept invitations for portal access: simple CRUD against
// the invitations table with expiry and accepted flags. Only the SHA-256
// hash of a token is stored; the raw token leaves the system exactly once,
// in the invitation email.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: String,
    pub email: String,
    pub client_id: String,
    pub role: String,
    pub expires_at: DateTime<Utc>,
    pub accepted: bool,
    pub created_at: DateTime<Utc>,
}

/// Outcome of validating a presented token.
#[derive(Debug, Clone, PartialEq)]
pub enum InviteStatus {
    Valid(Invitation),
    NotFound,
    Expired,
    AlreadyAccepted,
}

impl InviteStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, InviteStatus::Valid(_))
    }
}

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Issue an invitation and return the raw token to send to the invitee.
pub fn issue_invitation(
    conn: &Connection,
    email: &str,
    client_id: &str,
    role: &str,
    ttl: Duration,
) -> Result<String> {
    let token = uuid::Uuid::new_v4().to_string();
    let now = Utc::now();

    conn.execute(
        "INSERT INTO invitations (id, token_hash, email, client_id, role, expires_at, accepted, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
        params![
            uuid::Uuid::new_v4().to_string(),
            hash_token(&token),
            email,
            client_id,
            role,
            (now + ttl).to_rfc3339(),
            now.to_rfc3339(),
        ],
    )?;

    Ok(token)
}

fn find_by_token(conn: &Connection, token: &str) -> Result<Option<Invitation>> {
    let invitation = conn
        .query_row(
            "SELECT id, email, client_id, role, expires_at, accepted, created_at
             FROM invitations WHERE token_hash = ?1",
            params![hash_token(token)],
            |row| {
                let expires_at_str: String = row.get(4)?;
                let created_at_str: String = row.get(6)?;
                let accepted: i64 = row.get(5)?;

                Ok(Invitation {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    client_id: row.get(2)?,
                    role: row.get(3)?,
                    expires_at: DateTime::parse_from_rfc3339(&expires_at_str)
                        .map(|dt| dt.with_timezone(&Utc))
                        .unwrap_or_else(|_| Utc::now()),
                    accepted: accepted != 0,
                    created_at: DateTime::parse_from_rfc3339(&created_at_str)
                        .map(|dt| dt.with_timezone(&Utc))
                        .unwrap_or_else(|_| Utc::now()),
                })
            },
        )
        .optional()?;

    Ok(invitation)
}

/// Validate a presented token without consuming it.
pub fn check_invitation(conn: &Connection, token: &str) -> Result<InviteStatus> {
    let invitation = match find_by_token(conn, token)? {
        Some(inv) => inv,
        None => return Ok(InviteStatus::NotFound),
    };

    if invitation.accepted {
        return Ok(InviteStatus::AlreadyAccepted);
    }
    if invitation.expires_at <= Utc::now() {
        return Ok(InviteStatus::Expired);
    }

    Ok(InviteStatus::Valid(invitation))
}

/// Validate and mark accepted. Returns the same statuses as
/// `check_invitation`; the flag is flipped only on `Valid`.
pub fn accept_invitation(conn: &Connection, token: &str) -> Result<InviteStatus> {
    let status = check_invitation(conn, token)?;

    if let InviteStatus::Valid(ref invitation) = status {
        conn.execute(
            "UPDATE invitations SET accepted = 1 WHERE id = ?1",
            params![invitation.id],
        )?;
    }

    Ok(status)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::setup_database;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    #[test]
    fn test_issue_and_accept() {
        let conn = test_conn();

        let token = issue_invitation(
            &conn,
            "client@example.com",
            "client-1",
            "client",
            Duration::days(7),
        )
        .unwrap();

        match check_invitation(&conn, &token).unwrap() {
            InviteStatus::Valid(inv) => {
                assert_eq!(inv.email, "client@example.com");
                assert_eq!(inv.client_id, "client-1");
                assert!(!inv.accepted);
            }
            other => panic!("expected Valid, got {:?}", other),
        }

        assert!(accept_invitation(&conn, &token).unwrap().is_valid());

        // Second acceptance is rejected.
        assert_eq!(
            accept_invitation(&conn, &token).unwrap(),
            InviteStatus::AlreadyAccepted
        );
    }

    #[test]
    fn test_unknown_token_not_found() {
        let conn = test_conn();
        assert_eq!(
            check_invitation(&conn, "not-a-real-token").unwrap(),
            InviteStatus::NotFound
        );
    }

    #[test]
    fn test_expired_invitation() {
        let conn = test_conn();

        let token = issue_invitation(
            &conn,
            "late@example.com",
            "client-1",
            "client",
            Duration::seconds(-1),
        )
        .unwrap();

        assert_eq!(
            check_invitation(&conn, &token).unwrap(),
            InviteStatus::Expired
        );
        // Accept must not flip the flag on an expired invitation.
        assert_eq!(
            accept_invitation(&conn, &token).unwrap(),
            InviteStatus::Expired
        );
    }

    #[test]
    fn test_raw_token_is_not_stored() {
        let conn = test_conn();

        let token = issue_invitation(
            &conn,
            "client@example.com",
            "client-1",
            "client",
            Duration::days(7),
        )
        .unwrap();

        let stored: String = conn
            .query_row("SELECT token_hash FROM invitations", [], |row| row.get(0))
            .unwrap();
        assert_ne!(stored, token);
        assert_eq!(stored.len(), 64); // sha256 hex
    }
}
