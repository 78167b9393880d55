//! Signed-token encoding, decoding, and claims.

pub mod claims;
pub mod codec;

pub use claims::{Claims, PurposeClaims, RefreshClaims, SessionClaims, TokenPayload};
pub use codec::{KeyPurpose, TokenCodec};
