use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

/// Signing key for non-strict environments that did not configure one.
/// Tokens issued with it stop verifying after a restart.
pub(super) fn ephemeral_secret_key() -> String {
    tracing::warn!("SECRET_KEY not configured; using an ephemeral signing key");
    let mut bytes = [0u8; 64];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
