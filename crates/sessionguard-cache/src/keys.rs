//! Key builders for every session store entry.
//!
//! Centralising key construction keeps the schema exact:
//!
//! - `access:{sub}:{session_id}` holds the live access `jti`
//! - `refresh:{sub}:{session_id}` holds the live refresh `jti`
//! - `family:{sub}:{family}` holds `"active"` while the family is valid
//! - `used:{sub}:{jti}` fences a consumed refresh `jti`

use sessionguard_core::types::{FamilyId, SessionId, Subject, TokenId};

/// Namespace of access-token liveness markers.
pub const ACCESS: &str = "access";
/// Namespace of refresh-token liveness markers.
pub const REFRESH: &str = "refresh";
/// Namespace of family markers.
pub const FAMILY: &str = "family";
/// Namespace of replay fences for consumed refresh tokens.
pub const USED: &str = "used";
/// Namespace of one-shot redemption markers for reset tokens.
pub const REDEEMED: &str = "redeemed";

/// Every namespace that belongs to a subject's sessions.
pub const SESSION_NAMESPACES: [&str; 4] = [ACCESS, REFRESH, FAMILY, USED];

/// Value stored under a family key.
pub const FAMILY_ACTIVE: &str = "active";
/// Value written by the rotation script under a used key.
pub const USED_MARKER: &str = "used";

/// Liveness key for a session in the given namespace (`access` or `refresh`).
pub fn liveness(namespace: &str, sub: &Subject, session_id: &SessionId) -> String {
    format!("{namespace}:{sub}:{session_id}")
}

/// Liveness key of an access token.
pub fn access(sub: &Subject, session_id: &SessionId) -> String {
    liveness(ACCESS, sub, session_id)
}

/// Liveness key of a refresh token.
pub fn refresh(sub: &Subject, session_id: &SessionId) -> String {
    liveness(REFRESH, sub, session_id)
}

/// Family marker key.
pub fn family(sub: &Subject, family: &FamilyId) -> String {
    format!("{FAMILY}:{sub}:{family}")
}

/// Replay fence for a consumed refresh `jti`.
pub fn used(sub: &Subject, jti: &TokenId) -> String {
    format!("{USED}:{sub}:{jti}")
}

/// One-shot marker for a redeemed single-use token, keyed by its digest.
pub fn redeemed(sub: &Subject, digest: &str) -> String {
    format!("{REDEEMED}:{sub}:{digest}")
}

/// Glob pattern matching every key of `namespace` for one subject.
///
/// Glob metacharacters in the subject are escaped so the pattern cannot
/// reach into another subject's keys.
pub fn subject_pattern(namespace: &str, sub: &Subject) -> String {
    format!("{namespace}:{}:*", escape_glob(sub.as_str()))
}

/// Whether `key` is a direct `{namespace}:{sub}:{id}` entry of `sub`.
///
/// Guards against subjects that are prefixes of other subjects once a
/// colon is involved (`u1` vs `u1:x`).
pub fn belongs_to(key: &str, namespace: &str, sub: &Subject) -> bool {
    key.strip_prefix(namespace)
        .and_then(|rest| rest.strip_prefix(':'))
        .and_then(|rest| rest.strip_prefix(sub.as_str()))
        .and_then(|rest| rest.strip_prefix(':'))
        .is_some_and(|id| !id.is_empty() && !id.contains(':'))
}

/// Escape Redis glob metacharacters.
pub fn escape_glob(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\' | '^') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
