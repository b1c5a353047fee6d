use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::{Uuid, Variant, fmt::Hyphenated};

/// A user record as stored and served by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub age: u64,
    pub hobbies: Vec<String>,
}

/// The client-supplied part of a [`User`]: everything except the identifier.
///
/// Only the validator produces these, so a value of this type has already
/// passed the field rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFields {
    pub username: String,
    pub age: u64,
    pub hobbies: Vec<String>,
}

/// A user id taken from a request path.
///
/// Lookups go through the parsed [`Uuid`]; messages show the id the way the
/// client spelled it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId {
    uuid: Uuid,
    text: String,
}

impl UserId {
    /// Parses the canonical `8-4-4-4-12` form, in either case.
    ///
    /// The id must be the nil UUID or carry a version from 1 to 5 and the
    /// RFC 4122 variant.
    pub fn parse(text: &str) -> Option<Self> {
        if text.len() != Hyphenated::LENGTH {
            return None;
        }
        let uuid = Uuid::try_parse(text).ok()?;
        let well_formed = uuid.is_nil()
            || ((1..=5).contains(&uuid.get_version_num())
                && uuid.get_variant() == Variant::RFC4122);
        well_formed.then(|| Self {
            uuid,
            text: text.to_string(),
        })
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }
}

impl From<Uuid> for UserId {
    fn from(uuid: Uuid) -> Self {
        Self {
            uuid,
            text: uuid.to_string(),
        }
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl User {
    pub fn new(id: Uuid, fields: UserFields) -> Self {
        let UserFields {
            username,
            age,
            hobbies,
        } = fields;
        Self {
            id,
            username,
            age,
            hobbies,
        }
    }

    /// Overwrites every field except `id`.
    pub fn replace_fields(&mut self, fields: UserFields) {
        self.username = fields.username;
        self.age = fields.age;
        self.hobbies = fields.hobbies;
    }
}
