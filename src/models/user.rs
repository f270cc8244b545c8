// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Role chosen by the user after first login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum Role {
    Teacher,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Teacher => "teacher",
            Role::Student => "student",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User profile stored in Firestore (document ID = email).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Email address, the identity key
    pub email: String,
    /// Display name
    pub name: String,
    /// Profile picture URL
    #[serde(default)]
    pub picture: String,
    /// Unset until the user picks one
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub school: String,
    /// The single refresh token currently honored for this user.
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    /// A freshly created account: no role, no refresh token.
    pub fn new(profile: &GoogleProfile, now: &str) -> Self {
        Self {
            email: profile.email.clone(),
            name: profile.name.clone(),
            picture: profile.picture.clone().unwrap_or_default(),
            role: None,
            title: String::new(),
            school: String::new(),
            refresh_token: None,
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }

    /// Apply a partial update in place.
    pub fn apply(&mut self, update: &UserUpdate, now: &str) {
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(picture) = &update.picture {
            self.picture = picture.clone();
        }
        if let Some(title) = &update.title {
            self.title = title.clone();
        }
        if let Some(school) = &update.school {
            self.school = school.clone();
        }
        if let Some(role) = update.role {
            self.role = Some(role);
        }
        self.updated_at = now.to_string();
    }
}

/// Identity returned by the provider's userinfo endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub picture: Option<String>,
}

/// Partial update of the mutable user fields.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub picture: Option<String>,
    pub title: Option<String>,
    pub school: Option<String>,
    pub role: Option<Role>,
}

/// User as exposed over the API (never carries the refresh token).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserResponse {
    pub email: String,
    pub name: String,
    pub picture: String,
    pub role: Option<Role>,
    pub title: String,
    pub school: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            email: user.email,
            name: user.name,
            picture: user.picture,
            role: user.role,
            title: user.title,
            school: user.school,
        }
    }
}
