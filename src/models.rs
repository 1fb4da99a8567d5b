//! Wire records exchanged with the forum backend.
//!
//! Field names follow the backend's camelCase JSON. Dates travel as epoch milliseconds.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub username: String,
    /// Only ever sent on login/registration; the backend does not echo it back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub admin: bool,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: None,
            username: username.into(),
            password: None,
            admin: false,
        }
    }

    /// Credentials payload for `login` and registration.
    pub fn with_password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            password: Some(password.into()),
            ..Self::new(username)
        }
    }

    /// Copy of this record safe to keep on disk or pass around the UI.
    pub fn without_password(&self) -> Self {
        Self {
            password: None,
            ..self.clone()
        }
    }

    /// Role label used in listings.
    pub fn role_name(&self) -> &'static str {
        if self.admin {
            "Admin"
        } else {
            "User"
        }
    }
}

/// Reference to the topic a message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicRef {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub content: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub author: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<TopicRef>,
}

impl Message {
    /// True when `user` wrote this message (matched by id, then by username).
    pub fn is_authored_by(&self, user: &User) -> bool {
        match (&self.author, user.id) {
            (Some(author), Some(id)) if author.id.is_some() => author.id == Some(id),
            (Some(author), _) => author.username == user.username,
            (None, _) => false,
        }
    }

    pub fn author_name(&self) -> &str {
        self.author
            .as_ref()
            .map(|a| a.username.as_str())
            .unwrap_or("(unknown)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub author: Option<User>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Topic {
    pub fn message_index(&self, id: i64) -> Option<usize> {
        self.messages.iter().position(|m| m.id == Some(id))
    }
}

/// Partial update payload for `PATCH api/user/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub is_admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected_user: Option<User>,
}

impl UserUpdate {
    /// Build an update for `target`; an unspecified admin flag keeps the current one.
    pub fn for_user(target: &User, username: Option<String>, is_admin: Option<bool>) -> Self {
        Self {
            username,
            is_admin: is_admin.unwrap_or(target.admin),
            connected_user: None,
        }
    }

    /// Attach the acting user so the backend can authorise the change.
    pub fn acting_as(mut self, user: &User) -> Self {
        self.connected_user = Some(user.without_password());
        self
    }

    /// The record as it should look locally once the backend accepted the update.
    pub fn apply_to(&self, target: &User) -> User {
        User {
            username: self
                .username
                .clone()
                .unwrap_or_else(|| target.username.clone()),
            admin: self.is_admin,
            ..target.without_password()
        }
    }
}
