//! Newtype wrappers for the opaque identifiers carried in token claims.
//!
//! Every identifier travels as a plain string on the wire and in store
//! keys; distinct types prevent passing a `FamilyId` where a `SessionId`
//! is expected.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to define a newtype string identifier.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier value.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Return the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper, returning the inner string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

/// Macro adding random generation to identifiers minted by this system.
macro_rules! generated_id {
    ($name:ident) => {
        impl $name {
            /// Mint a fresh random identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }
        }
    };
}

define_id!(
    /// Opaque identifier of the user a token was issued to (`sub`).
    Subject
);

define_id!(
    /// Groups an access/refresh pair issued together.
    SessionId
);

define_id!(
    /// Lineage of refresh tokens descending from one login.
    FamilyId
);

define_id!(
    /// Unique identifier of one token instance (`jti`).
    TokenId
);

generated_id!(SessionId);
generated_id!(FamilyId);
generated_id!(TokenId);
