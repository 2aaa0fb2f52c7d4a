use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use super::{iso_date, Resource};

/// Ambiguous glyphs (0/O, 1/l/I, i/j) are left out.
const PASSWORD_ALPHABET: &[u8] = b"abcdefghkmnpqrstuvwxyzABCDEFGHKMNPQRSTUVWXYZ23456789";
const GENERATED_PASSWORD_LEN: usize = 8;

/// A user record. `password` may only be sent empty; when omitted one is
/// generated.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[validate(required(message = "username is required"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[validate(required(message = "name is required"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[validate(custom(function = "validate_password"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<bool>,

    #[serde(
        default,
        deserialize_with = "iso_date::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_date: Option<DateTime<Utc>>,

    #[serde(
        default,
        deserialize_with = "iso_date::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub modified_date: Option<DateTime<Utc>>,
}

/// Only an empty password may be supplied explicitly; anything else must
/// come from the generator.
fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        Ok(())
    } else {
        let mut error = ValidationError::new("password_not_settable");
        error.message = Some("password may only be set to an empty string".into());
        Err(error)
    }
}

/// Eight distinct characters drawn from the unambiguous alphabet.
pub fn generate_password() -> String {
    PASSWORD_ALPHABET
        .choose_multiple(&mut rand::thread_rng(), GENERATED_PASSWORD_LEN)
        .map(|&b| b as char)
        .collect()
}

impl Resource for User {
    const COLLECTION: &'static str = "users";
    const LABEL: &'static str = "User";
    const FIELDS: &'static [&'static str] = &[
        "username",
        "name",
        "password",
        "admin",
        "createdDate",
        "modifiedDate",
    ];

    fn with_defaults(mut self) -> Self {
        let now = Utc::now();
        self.password.get_or_insert_with(generate_password);
        self.admin.get_or_insert(false);
        self.created_date.get_or_insert(now);
        self.modified_date.get_or_insert(now);
        self
    }
}
