//! JWT authentication utilities.
//!
//! Tokens are issued by Cognito. Behind an API Gateway Cognito authorizer the
//! claims arrive pre-validated in the request context; otherwise the bearer
//! token is verified here against the user pool's JWKS.

use std::collections::HashMap;
use std::time::Duration;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::{Error, Result};

/// How long fetched signing keys are trusted before refetching.
pub const JWKS_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Minimum gap between refetches caused by an unknown `kid`.
pub const JWKS_REFRESH_COOLDOWN: Duration = Duration::from_secs(60);

/// JWT claims from Cognito.
#[derive(Debug, Serialize, Deserialize)]
pub struct CognitoClaims {
    /// Subject (user id)
    #[serde(default)]
    pub sub: Option<String>,
    /// Email
    #[serde(default)]
    pub email: Option<String>,
    /// Cognito username
    #[serde(rename = "cognito:username", default)]
    pub cognito_username: Option<String>,
    /// Token use (access or id)
    #[serde(default)]
    pub token_use: Option<String>,
    /// Client id
    #[serde(default)]
    pub client_id: Option<String>,
    /// Issued at
    #[serde(default)]
    pub iat: Option<i64>,
    /// Expiration
    pub exp: i64,
    /// Issuer
    #[serde(default)]
    pub iss: Option<String>,
}

/// Decoded user information from JWT.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedUser {
    /// User's Cognito subject (UUID)
    pub user_id: String,
    /// User's email
    pub email: Option<String>,
}

impl TryFrom<CognitoClaims> for AuthenticatedUser {
    type Error = Error;

    fn try_from(claims: CognitoClaims) -> Result<Self> {
        let user_id = claims
            .sub
            .filter(|sub| !sub.is_empty())
            .ok_or_else(|| Error::Auth("User ID not found in token".to_string()))?;

        Ok(Self {
            user_id,
            email: claims.email.or(claims.cognito_username),
        })
    }
}

/// Extract user from API Gateway request context.
///
/// When using Cognito authorizer, user info is in requestContext.authorizer.claims
pub fn extract_user_from_context(claims: &serde_json::Value) -> Result<AuthenticatedUser> {
    let sub = claims
        .get("sub")
        .and_then(|v| v.as_str())
        .filter(|sub| !sub.is_empty())
        .ok_or_else(|| Error::Auth("User ID not found in token".to_string()))?;

    let email = claims.get("email").and_then(|v| v.as_str()).map(String::from);

    Ok(AuthenticatedUser {
        user_id: sub.to_string(),
        email,
    })
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    n: String,
    e: String,
}

#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<Jwk>,
}

struct CachedKeys {
    fetched_at: Instant,
    keys: HashMap<String, DecodingKey>,
}

#[derive(Default)]
struct KeyState {
    cached: Option<CachedKeys>,
    /// Last refetch triggered by an unknown `kid` while the cache was fresh.
    last_on_demand: Option<Instant>,
}

enum Lookup {
    Hit(DecodingKey),
    Throttled,
    Refresh,
}

/// Signing keys fetched from a JWKS endpoint, cached for [`JWKS_CACHE_TTL`].
///
/// An unknown `kid` triggers at most one early refetch per
/// [`JWKS_REFRESH_COOLDOWN`]; other unknown kids in that window are rejected
/// without contacting the endpoint.
pub struct JwksCache {
    url: String,
    client: reqwest::Client,
    ttl: Duration,
    on_demand_cooldown: Duration,
    state: RwLock<KeyState>,
}

impl JwksCache {
    pub fn new(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
            ttl: JWKS_CACHE_TTL,
            on_demand_cooldown: JWKS_REFRESH_COOLDOWN,
            state: RwLock::new(KeyState::default()),
        }
    }

    pub fn with_refresh_cooldown(mut self, cooldown: Duration) -> Self {
        self.on_demand_cooldown = cooldown;
        self
    }

    fn lookup(&self, state: &KeyState, kid: &str) -> Lookup {
        let Some(cached) = state.cached.as_ref() else {
            return Lookup::Refresh;
        };
        if cached.fetched_at.elapsed() >= self.ttl {
            return Lookup::Refresh;
        }
        if let Some(key) = cached.keys.get(kid) {
            return Lookup::Hit(key.clone());
        }
        match state.last_on_demand {
            Some(at) if at.elapsed() < self.on_demand_cooldown => Lookup::Throttled,
            _ => Lookup::Refresh,
        }
    }

    /// Decoding key for `kid`. Refetches when the cache is stale, or when the
    /// key is unknown (the pool may have rotated keys) and no early refetch
    /// happened within the cooldown.
    pub async fn key(&self, kid: &str) -> Result<DecodingKey> {
        let unknown = || Error::InvalidToken(format!("Unknown signing key '{}'", kid));

        match self.lookup(&*self.state.read().await, kid) {
            Lookup::Hit(key) => return Ok(key),
            Lookup::Throttled => {
                debug!(kid, "JWKS refresh throttled, rejecting unknown key");
                return Err(unknown());
            }
            Lookup::Refresh => {}
        }

        {
            let mut state = self.state.write().await;
            match self.lookup(&state, kid) {
                Lookup::Hit(key) => return Ok(key),
                Lookup::Throttled => return Err(unknown()),
                Lookup::Refresh => {
                    let fresh = state
                        .cached
                        .as_ref()
                        .is_some_and(|cached| cached.fetched_at.elapsed() < self.ttl);
                    if fresh {
                        state.last_on_demand = Some(Instant::now());
                    }
                }
            }
        }

        let keys = self.fetch().await?;
        let key = keys.get(kid).cloned();

        {
            let mut state = self.state.write().await;
            state.cached = Some(CachedKeys {
                fetched_at: Instant::now(),
                keys,
            });
        }

        key.ok_or_else(unknown)
    }

    async fn fetch(&self) -> Result<HashMap<String, DecodingKey>> {
        debug!("Fetching JWKS from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("Failed to fetch JWKS: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Upstream(format!("JWKS HTTP {}", response.status())));
        }

        let jwks: JwksResponse = response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("Failed to parse JWKS: {}", e)))?;

        let mut keys = HashMap::new();
        for jwk in jwks.keys.into_iter().filter(|jwk| jwk.kty == "RSA") {
            let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
                .map_err(|e| Error::Upstream(format!("Invalid RSA key '{}': {}", jwk.kid, e)))?;
            keys.insert(jwk.kid, key);
        }

        info!("Loaded {} signing keys from JWKS", keys.len());
        Ok(keys)
    }
}

enum KeySource {
    Jwks(JwksCache),
    Static { key: DecodingKey, algorithm: Algorithm },
}

/// Verifies bearer tokens and turns them into an [`AuthenticatedUser`].
pub struct TokenVerifier {
    issuer: Option<String>,
    keys: KeySource,
}

impl TokenVerifier {
    /// Verify RS256 tokens issued by a Cognito user pool.
    pub fn cognito(issuer: impl Into<String>, jwks_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            issuer: Some(issuer.into()),
            keys: KeySource::Jwks(JwksCache::new(jwks_url, client)),
        }
    }

    /// Verify tokens against a fixed key, for local runs and tests.
    pub fn with_static_key(key: DecodingKey, algorithm: Algorithm) -> Self {
        Self {
            issuer: None,
            keys: KeySource::Static { key, algorithm },
        }
    }

    /// Validate a JWT token and extract user information.
    pub async fn verify(&self, token: &str) -> Result<AuthenticatedUser> {
        // Skip "Bearer " prefix if present
        let token = token.strip_prefix("Bearer ").unwrap_or(token);

        let (key, mut validation) = match &self.keys {
            KeySource::Static { key, algorithm } => (key.clone(), Validation::new(*algorithm)),
            KeySource::Jwks(cache) => {
                let header = decode_header(token).map_err(|e| Error::InvalidToken(e.to_string()))?;
                let kid = header
                    .kid
                    .ok_or_else(|| Error::InvalidToken("Token header has no key id".to_string()))?;
                (cache.key(&kid).await?, Validation::new(Algorithm::RS256))
            }
        };

        // Access tokens carry no audience; ID tokens carry the client id.
        validation.validate_aud = false;
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }

        let token_data = decode::<CognitoClaims>(token, &key, &validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => Error::Auth("Token has expired".to_string()),
            _ => Error::InvalidToken(e.to_string()),
        })?;

        match token_data.claims.token_use.as_deref() {
            Some("access") | Some("id") => {}
            _ => return Err(Error::Auth("Invalid token type".to_string())),
        }

        AuthenticatedUser::try_from(token_data.claims)
    }
}
