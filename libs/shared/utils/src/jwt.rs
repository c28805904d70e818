use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;
use uuid::Uuid;

use shared_models::auth::{Actor, JwtClaims, Role};

type HmacSha256 = Hmac<Sha256>;

/// Validate an HS256 token and resolve the actor it was issued to.
pub fn validate_token(token: &str, jwt_secret: &str) -> Result<Actor, String> {
    if jwt_secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    // Split token into parts
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err("Invalid token format".to_string());
    }

    let header_b64 = parts[0];
    let claims_b64 = parts[1];
    let signature_b64 = parts[2];

    let signature = match URL_SAFE_NO_PAD.decode(signature_b64) {
        Ok(sig) => sig,
        Err(e) => {
            debug!("Failed to decode signature: {}", e);
            return Err("Invalid signature encoding".to_string());
        }
    };

    let signing_input = format!("{}.{}", header_b64, claims_b64);

    let mut mac = match HmacSha256::new_from_slice(jwt_secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return Err("Failed to create HMAC".to_string()),
    };
    mac.update(signing_input.as_bytes());

    if mac.verify_slice(&signature).is_err() {
        debug!("Token signature verification failed");
        return Err("Invalid token signature".to_string());
    }

    // Decode claims
    let claims_json = match URL_SAFE_NO_PAD.decode(claims_b64) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(json_str) => json_str,
            Err(_) => return Err("Invalid claims encoding".to_string()),
        },
        Err(_) => return Err("Invalid claims encoding".to_string()),
    };

    let claims: JwtClaims = match serde_json::from_str(&claims_json) {
        Ok(c) => c,
        Err(e) => {
            debug!("Failed to parse claims: {}", e);
            return Err("Invalid claims format".to_string());
        }
    };

    // Check expiration
    if let Some(exp) = claims.exp {
        let now = chrono::Utc::now().timestamp() as u64;
        if exp < now {
            debug!("Token expired at {} (now: {})", exp, now);
            return Err("Token expired".to_string());
        }
    }

    let id = Uuid::parse_str(&claims.sub).map_err(|_| "Invalid subject claim".to_string())?;

    let role = claims
        .role
        .as_deref()
        .and_then(Role::parse)
        .ok_or_else(|| "Unknown role claim".to_string())?;

    let actor = Actor::new(id, role);
    debug!("Token validated successfully for user: {}", actor.id);
    Ok(actor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{JwtTestUtils, TestUser};

    const SECRET: &str = "test-secret-key-for-jwt-validation-must-be-long-enough";

    #[test]
    fn valid_token_resolves_actor() {
        let user = TestUser::patient("pat@example.com");
        let token = JwtTestUtils::create_test_token(&user, SECRET, None);

        let actor = validate_token(&token, SECRET).unwrap();
        assert_eq!(actor.id.to_string(), user.id);
        assert_eq!(actor.role, Role::Patient);
    }

    #[test]
    fn legacy_role_spelling_is_normalized() {
        let user = TestUser::new("pat@example.com", "paciente");
        let token = JwtTestUtils::create_test_token(&user, SECRET, None);

        let actor = validate_token(&token, SECRET).unwrap();
        assert_eq!(actor.role, Role::Patient);
    }

    #[test]
    fn expired_token_is_rejected() {
        let user = TestUser::default();
        let token = JwtTestUtils::create_expired_token(&user, SECRET);

        assert_eq!(validate_token(&token, SECRET).unwrap_err(), "Token expired");
    }

    #[test]
    fn wrong_signature_is_rejected() {
        let user = TestUser::default();
        let token = JwtTestUtils::create_invalid_signature_token(&user);

        assert_eq!(
            validate_token(&token, SECRET).unwrap_err(),
            "Invalid token signature"
        );
    }

    #[test]
    fn unknown_role_is_rejected() {
        let user = TestUser::new("x@example.com", "receptionist");
        let token = JwtTestUtils::create_test_token(&user, SECRET, None);

        assert_eq!(
            validate_token(&token, SECRET).unwrap_err(),
            "Unknown role claim"
        );
    }
}
