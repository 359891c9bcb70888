//! Helpers shared by the cell test suites: minting signed JWTs and building
//! configs that point at a mock server instead of a real Supabase project.

use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;

use shared_config::AppConfig;

pub const TEST_JWT_SECRET: &str = "super-secret-jwt-token-with-at-least-32-characters";

#[derive(Debug, Serialize)]
struct TestClaims {
    sub: String,
    exp: u64,
    iat: u64,
    aud: String,
    email: Option<String>,
    role: Option<String>,
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn mint_token(user_id: &str, role: Option<&str>, secret: &str) -> String {
        let now = Utc::now().timestamp() as u64;
        let claims = TestClaims {
            sub: user_id.to_string(),
            exp: now + 3600,
            iat: now,
            aud: "authenticated".to_string(),
            email: Some(format!("{}@example.com", user_id)),
            role: role.map(str::to_string),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("failed to encode test token")
    }

    /// Token signed with the shared test secret, for handler tests.
    pub fn token_for(user_id: &str, role: Option<&str>) -> String {
        Self::mint_token(user_id, role, TEST_JWT_SECRET)
    }
}

pub struct TestConfig;

impl TestConfig {
    /// Config pointing at a mock Supabase server (e.g. wiremock's `uri()`).
    pub fn with_base_url(base_url: &str) -> AppConfig {
        AppConfig {
            supabase_url: base_url.to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            supabase_service_role_key: "test-service-key".to_string(),
            supabase_jwt_secret: TEST_JWT_SECRET.to_string(),
        }
    }

    /// Config for tests that never touch the network.
    pub fn offline() -> AppConfig {
        Self::with_base_url("http://localhost:0")
    }
}
