use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::{iso_date, Resource};

/// A comment as clients send it. Responses add the document `id`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[validate(
        required(message = "text is required"),
        length(min = 1, message = "text must not be empty")
    )]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(
        default,
        deserialize_with = "iso_date::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_date: Option<DateTime<Utc>>,
}

impl Resource for Comment {
    const COLLECTION: &'static str = "comments";
    const LABEL: &'static str = "Comment";
    const FIELDS: &'static [&'static str] = &["text", "author", "createdDate"];

    fn with_defaults(mut self) -> Self {
        self.created_date.get_or_insert_with(Utc::now);
        self
    }
}
