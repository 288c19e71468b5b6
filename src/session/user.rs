//! session::user
//!
//! Canonical user identity and its normalization from the backend's wire
//! shape.
//!
//! The backend returns users whose optional fields depend on how the account
//! was created: pure local accounts carry no directory object id, federated
//! accounts do, and linked accounts carry both a password and an object id.
//! [`WireUser`] accepts all of those shapes; [`UserRecord::from_wire`] turns
//! one into the single canonical [`UserRecord`], with the origin recorded as a
//! tagged [`UserOrigin`] that carries only the fields guaranteed for it.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which credential source a resolved session came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthSource {
    /// Local password login; the backend token is the only credential.
    Local,
    /// Federated identity provider; logging out must also end the provider session.
    Federated,
}

impl std::fmt::Display for AuthSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthSource::Local => write!(f, "local"),
            AuthSource::Federated => write!(f, "federated"),
        }
    }
}

/// Role as resolved by the backend: a numeric level plus its display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub level: i64,
    pub name: String,
}

/// Where an account originates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "authSource", rename_all = "lowercase")]
pub enum UserOrigin {
    /// Created with a local password only.
    Local,
    /// Provisioned from the federated directory.
    Federated {
        #[serde(rename = "objectId")]
        object_id: String,
    },
    /// Local account linked to a directory identity.
    Both {
        #[serde(rename = "objectId")]
        object_id: String,
    },
}

impl UserOrigin {
    /// The auth source a session for this origin resolves to.
    ///
    /// Linked accounts resolve as federated: the provider holds a session for
    /// them that logout has to end.
    pub fn auth_source(&self) -> AuthSource {
        match self {
            UserOrigin::Local => AuthSource::Local,
            UserOrigin::Federated { .. } | UserOrigin::Both { .. } => AuthSource::Federated,
        }
    }

    /// Directory object id, if the origin has one.
    pub fn object_id(&self) -> Option<&str> {
        match self {
            UserOrigin::Local => None,
            UserOrigin::Federated { object_id } | UserOrigin::Both { object_id } => {
                Some(object_id)
            }
        }
    }
}

/// Reference to a user's avatar image.
///
/// Either a URL returned by the backend or an inline `data:` URI built from
/// bytes fetched from the profile service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AvatarRef(String);

impl AvatarRef {
    /// Wrap an existing URL or data URI.
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Build an inline data URI from raw image bytes.
    pub fn from_image(content_type: &str, bytes: &[u8]) -> Self {
        Self(format!("data:{};base64,{}", content_type, BASE64.encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for inline `data:` URIs.
    pub fn is_inline(&self) -> bool {
        self.0.starts_with("data:")
    }
}

/// Canonical user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warehouse_id: Option<i64>,
    #[serde(flatten)]
    pub origin: UserOrigin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<AvatarRef>,
}

impl UserRecord {
    /// Normalize a backend user into the canonical shape.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError`] when a field every user must have is
    /// missing, or when a directory-backed origin has no object id.
    pub fn from_wire(wire: WireUser) -> Result<Self, NormalizeError> {
        let id = match wire.id {
            Some(WireId::Number(n)) => n.to_string(),
            Some(WireId::Text(s)) if !s.trim().is_empty() => s,
            _ => return Err(NormalizeError::MissingField("id")),
        };

        let email = non_empty(wire.email).ok_or(NormalizeError::MissingField("email"))?;
        let name = non_empty(wire.name)
            .or_else(|| non_empty(wire.display_name))
            .unwrap_or_else(|| email.clone());

        let level = wire.role.unwrap_or(0);
        let role = Role {
            level,
            name: non_empty(wire.role_name).unwrap_or_else(|| "User".to_string()),
        };

        let object_id = non_empty(wire.object_id);
        let origin = match wire.auth_source.as_deref().map(str::to_ascii_lowercase) {
            None => UserOrigin::Local,
            Some(tag) => match tag.as_str() {
                "local" => UserOrigin::Local,
                "federated" | "sso" => UserOrigin::Federated {
                    object_id: object_id.ok_or(NormalizeError::MissingField("objectId"))?,
                },
                "both" => UserOrigin::Both {
                    object_id: object_id.ok_or(NormalizeError::MissingField("objectId"))?,
                },
                _ => return Err(NormalizeError::UnknownAuthSource(tag)),
            },
        };

        Ok(Self {
            id,
            name,
            email,
            role,
            department: non_empty(wire.department),
            employee_id: non_empty(wire.employee_id),
            warehouse_id: wire.warehouse_id,
            origin,
            avatar: non_empty(wire.avatar_url).map(AvatarRef::new),
        })
    }

    /// The auth source a session for this user resolves to.
    pub fn auth_source(&self) -> AuthSource {
        self.origin.auth_source()
    }

    /// Serialize for the credential store.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse from the credential store.
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Errors normalizing a backend user.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("user is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("unknown authSource '{0}'")]
    UnknownAuthSource(String),
}

/// User id as the backend sends it: numeric for older accounts, string for newer.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Number(i64),
    Text(String),
}

/// User as returned by the backend, before normalization.
///
/// Every field is optional; aliases cover the spellings different endpoints
/// use for the same thing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireUser {
    #[serde(default)]
    pub id: Option<WireId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<i64>,
    #[serde(default)]
    pub role_name: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub employee_id: Option<String>,
    #[serde(default)]
    pub warehouse_id: Option<i64>,
    #[serde(default)]
    pub auth_source: Option<String>,
    #[serde(default, alias = "azureObjectId", alias = "oid")]
    pub object_id: Option<String>,
    #[serde(default, alias = "photoUrl", alias = "profilePicture")]
    pub avatar_url: Option<String>,
}
