//! Session resolution and authorization.
//!
//! A [`Session`] is the login identity handed to us by the identity provider.
//! It is resolved once into an [`AuthContext`], which every operation that
//! needs to know "who" or "is admin" receives explicitly.

use serde::Serialize;

use crate::error::SharetrackError;
use crate::store::RecordStore;
use crate::types::{normalize_email, NewPerson, Person, Role};

/// Login identity from the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    /// Name from the account metadata, if the provider has one.
    pub full_name: Option<String>,
    /// Role claim from the account metadata.
    pub role_claim: Option<Role>,
}

/// Resolved caller: the session, its person record, and the admin flag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthContext {
    pub session: Session,
    pub person: Person,
    pub is_admin: bool,
}

impl AuthContext {
    pub fn person_id(&self) -> &str {
        &self.person.id
    }

    pub fn require_admin(&self) -> Result<(), SharetrackError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(SharetrackError::Forbidden(format!(
                "{} is not an admin",
                self.session.email
            )))
        }
    }
}

/// Name for a person created on first login.
fn default_full_name(session: &Session) -> String {
    if let Some(name) = session.full_name.as_deref().map(str::trim) {
        if !name.is_empty() {
            return name.to_string();
        }
    }
    match session.email.split('@').next() {
        Some(local) if !local.is_empty() => local.to_string(),
        _ => "User".to_string(),
    }
}

/// Resolve a session to its person, linking or creating the record on first login.
///
/// 1. A person whose id is the session user id is the steady-state match.
/// 2. Otherwise a person with the same email (an imported record) is relinked
///    to the session user id; their entries follow.
/// 3. Otherwise a new person is created under the session user id.
pub fn resolve_session<S: RecordStore + ?Sized>(
    store: &S,
    session: Session,
) -> Result<AuthContext, SharetrackError> {
    if session.user_id.trim().is_empty() {
        return Err(SharetrackError::InvalidInput(
            "session user id is empty".to_string(),
        ));
    }

    let person = match store.get_person(&session.user_id)? {
        Some(person) => person,
        None => match store.find_person_by_email(&session.email)? {
            Some(existing) => {
                tracing::info!(
                    "Linking person {} ({}) to login {}",
                    existing.id,
                    existing.email,
                    session.user_id
                );
                store.relink_person(&existing.id, &session.user_id)?;
                store.get_person(&session.user_id)?.ok_or_else(|| {
                    SharetrackError::NotFound(format!("person '{}'", session.user_id))
                })?
            }
            None => {
                tracing::info!("Creating person for login {}", session.user_id);
                store.insert_person(&NewPerson {
                    id: Some(session.user_id.clone()),
                    email: normalize_email(&session.email),
                    full_name: default_full_name(&session),
                    role: Role::User,
                })?
            }
        },
    };

    let is_admin = person.role == Role::Admin || session.role_claim == Some(Role::Admin);
    Ok(AuthContext {
        session,
        person,
        is_admin,
    })
}
