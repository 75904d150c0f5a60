//! Newtype IDs for type-safe entity references.
//!
//! Mattermost identifies users, channels and teams with opaque 26-character
//! strings. Use the `define_id!` macro to create wrappers that prevent
//! accidentally passing a channel ID where a user ID is expected.

use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `Default`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `AsRef<str>` implementations
///
/// # Example
///
/// ```rust
/// # use jenkins_relay_core::define_id;
/// define_id!(PostId);
/// define_id!(FileId);
///
/// let post_id = PostId::new("abc");
/// let file_id = FileId::new("abc");
///
/// // These are different types, so this won't compile:
/// // let _: PostId = file_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Default,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the ID as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns `true` if the ID is the empty string.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            /// Consume the ID and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(UserId);
define_id!(ChannelId);
define_id!(TeamId);

/// Jenkins build queue item identifier.
///
/// Jenkins reports a queue item in the `Location` header of a build request.
/// An ID of zero means the request was not queued (typically because an
/// identical build is already waiting), so this type can only hold non-zero
/// values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueId(NonZeroU64);

impl QueueId {
    /// Create a queue ID, returning `None` for the "not queued" value zero.
    #[must_use]
    pub const fn new(id: u64) -> Option<Self> {
        match NonZeroU64::new(id) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }

    /// Get the underlying u64 value.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for QueueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_id_roundtrip() {
        let id = UserId::new("4xp9fdt5pjd4bmnbeoy6xokjah");
        assert_eq!(id.as_str(), "4xp9fdt5pjd4bmnbeoy6xokjah");
        assert_eq!(id.to_string(), "4xp9fdt5pjd4bmnbeoy6xokjah");
        assert!(!id.is_empty());
        assert!(UserId::default().is_empty());
    }

    #[test]
    fn test_string_id_serde_transparent() {
        let id = ChannelId::from("town-square");
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, "\"town-square\"");

        let back: ChannelId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }

    #[test]
    fn test_queue_id_rejects_zero() {
        assert!(QueueId::new(0).is_none());
        assert_eq!(QueueId::new(42).map(|id| id.as_u64()), Some(42));
    }
}
