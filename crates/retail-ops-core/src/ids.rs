//! Identifier types for retail-ops.
//!
//! The backend hands out integer keys for some tables and UUIDs for others.
//! Every identifier is therefore kept as an opaque, non-empty string; integer
//! keys are rendered with their decimal representation so `1` and `"1"` name
//! the same store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw key as it appears in a JSON row.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawKey {
    /// A textual key (UUID, slug, or stringified integer).
    Text(String),
    /// A signed integer key.
    Signed(i64),
    /// An unsigned integer key too large for `i64`.
    Unsigned(u64),
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "RawKey", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create an identifier from a string, rejecting blank input.
            ///
            /// # Errors
            ///
            /// Returns `IdError::Empty` if the trimmed input is empty.
            pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
                let value = value.into();
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(IdError::Empty);
                }
                if trimmed.len() == value.len() {
                    Ok(Self(value))
                } else {
                    Ok(Self(trimmed.to_string()))
                }
            }

            /// Extract an identifier from a JSON value.
            ///
            /// Strings and integers are accepted; anything else yields `None`.
            #[must_use]
            pub fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::String(s) => Self::new(s.as_str()).ok(),
                    Value::Number(n) if n.is_i64() || n.is_u64() => Some(Self(n.to_string())),
                    _ => None,
                }
            }

            /// Return the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<RawKey> for $name {
            type Error = IdError;

            fn try_from(raw: RawKey) -> Result<Self, Self::Error> {
                match raw {
                    RawKey::Text(s) => Self::new(s),
                    RawKey::Signed(n) => Ok(Self(n.to_string())),
                    RawKey::Unsigned(n) => Ok(Self(n.to_string())),
                }
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id! {
    /// Identifier of a store, the main grouping dimension.
    StoreId
}

string_id! {
    /// Identifier of a single row in any operational table.
    RecordId
}

string_id! {
    /// Identifier of an inventory item (a row in the stock table).
    ItemId
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The identifier was empty or whitespace only.
    #[error("identifier must not be empty")]
    Empty,
}
