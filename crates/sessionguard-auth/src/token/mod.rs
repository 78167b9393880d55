//! Token lifecycle: issuance, verification, rotation, and invalidation.
//!
//! The components share no state beyond the session store and the key
//! schema in [`sessionguard_cache::keys`].

pub mod error;
pub mod invalidator;
pub mod issuer;
pub mod rotation;
pub mod verifier;

pub use error::TokenError;
pub use invalidator::SessionInvalidator;
pub use issuer::{IssuedToken, TokenIssuer};
pub use rotation::RotationCoordinator;
pub use verifier::TokenVerifier;

use std::sync::Arc;

use sessionguard_core::config::token::TokenConfig;
use sessionguard_core::result::AppResult;
use sessionguard_core::traits::SessionStore;

use crate::jwt::TokenCodec;

/// The token components wired to one codec and one store.
#[derive(Debug, Clone)]
pub struct TokenServices {
    /// Mints tokens and liveness markers.
    pub issuer: TokenIssuer,
    /// Checks presented tokens against store state.
    pub verifier: TokenVerifier,
    /// Exchanges refresh tokens within a family.
    pub rotation: RotationCoordinator,
    /// Revokes a subject's sessions.
    pub invalidator: SessionInvalidator,
}

impl TokenServices {
    /// Build every component from token configuration.
    ///
    /// `scan_batch_size` bounds each enumeration step during invalidation.
    pub fn new(
        config: &TokenConfig,
        store: Arc<dyn SessionStore>,
        scan_batch_size: usize,
    ) -> AppResult<Self> {
        let codec = Arc::new(TokenCodec::new(config)?);
        let invalidator = SessionInvalidator::new(store.clone(), scan_batch_size);
        let issuer = TokenIssuer::new(codec.clone(), store.clone(), config);
        let verifier = TokenVerifier::new(codec, store.clone(), invalidator.clone());
        let rotation = RotationCoordinator::new(issuer.clone(), store, invalidator.clone(), config);

        Ok(Self {
            issuer,
            verifier,
            rotation,
            invalidator,
        })
    }
}
