//! Lua sources for [`StoreScript`] variants.

use sessionguard_core::traits::StoreScript;

/// Atomic refresh-token rotation.
///
/// KEYS[1] = refresh liveness key
/// KEYS[2] = used (replay fence) key
/// ARGV[1] = expected jti
/// ARGV[2] = used-marker TTL in seconds
///
/// Returns:
///   'REUSED'  = the jti was already consumed
///   'INVALID' = the live jti differs or is absent
///   'OK'      = fence written and liveness key removed
const ROTATE_REFRESH_SCRIPT: &str = r#"
    local refresh_key = KEYS[1]
    local used_key = KEYS[2]
    local expected_jti = ARGV[1]
    local used_ttl_seconds = tonumber(ARGV[2])

    if redis.call('EXISTS', used_key) == 1 then
        return 'REUSED'
    end

    local stored_jti = redis.call('GET', refresh_key)
    if stored_jti ~= expected_jti then
        return 'INVALID'
    end

    redis.call('SETEX', used_key, used_ttl_seconds, 'used')
    redis.call('DEL', refresh_key)

    return 'OK'
"#;

/// Lua source registered for a script.
pub fn source(script: StoreScript) -> &'static str {
    match script {
        StoreScript::RotateRefresh => ROTATE_REFRESH_SCRIPT,
    }
}
