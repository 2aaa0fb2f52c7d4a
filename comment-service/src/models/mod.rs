pub mod comment;
pub mod iso_date;
pub mod transform;
pub mod user;

pub use comment::Comment;
pub use transform::{for_client, from_client};
pub use user::User;

use serde::{Serialize, de::DeserializeOwned};
use validator::Validate;

/// A document type served by the generic resource router.
///
/// Optional fields stay `None` through validation so that rules only
/// apply to values the client actually sent; `with_defaults` then fills
/// the gaps. Defaults are produced per call, at insertion time.
pub trait Resource: Serialize + DeserializeOwned + Validate + Send + Sync + 'static {
    /// Collection name, also the mount path segment.
    const COLLECTION: &'static str;
    /// Human readable name used in error messages.
    const LABEL: &'static str;
    /// Client-facing field names; anything else in a body is rejected.
    const FIELDS: &'static [&'static str];

    fn with_defaults(self) -> Self;

    fn mount_path() -> String {
        format!("/{}", Self::COLLECTION)
    }
}
