use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tower_cookies::{cookie::SameSite, Cookie, Cookies};
use tracing::{error, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::domain::models::auth::{Claims, Principal, PrincipalKind, RefreshTokenRecord, TokenPair};
use crate::domain::ports::{ClientUserRepository, PrincipalDirectory, RefreshTokenRepository, UserRepository};
use crate::error::{AppError, AuthFailure};
use crate::infra::gateway::ScopedDb;

/// Access/refresh token lifecycle for one principal kind.
pub struct TokenService<K: PrincipalKind> {
    repo: Arc<dyn RefreshTokenRepository>,
    directory: Arc<dyn PrincipalDirectory>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: StdDuration,
    refresh_ttl: StdDuration,
    secure_cookies: bool,
    _kind: PhantomData<fn() -> K>,
}

impl<K: PrincipalKind> TokenService<K> {
    pub fn new(repo: Arc<dyn RefreshTokenRepository>, directory: Arc<dyn PrincipalDirectory>, config: &Config) -> Self {
        Self {
            repo,
            directory,
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_ttl: config.access_token_ttl,
            refresh_ttl: config.refresh_token_ttl,
            secure_cookies: config.production,
            _kind: PhantomData,
        }
    }

    pub async fn issue(&self, db: &ScopedDb, principal: &Principal) -> Result<TokenPair, AppError> {
        let access_token = self.sign_access(principal)?;
        let (refresh_token, record) = self.new_refresh_record(principal);
        self.repo.create(db, &record).await?;
        Ok(TokenPair { access_token, refresh_token })
    }

    /// Consumes `raw_refresh_token` and returns a fresh pair. A token succeeds at most once.
    pub async fn rotate(&self, db: &ScopedDb, raw_refresh_token: &str) -> Result<(Principal, TokenPair), AppError> {
        let old_hash = hash_token(raw_refresh_token);

        let record = self.repo.find(db, &old_hash).await?
            .ok_or(AppError::InvalidOrExpiredRefreshToken)?;

        if record.expires_at <= Utc::now() {
            self.repo.delete(db, &old_hash).await?;
            return Err(AppError::InvalidOrExpiredRefreshToken);
        }

        if record.tenant_id.is_some() && record.tenant_id != db.tenant_id() {
            warn!("Refresh token presented outside its tenant: {:?}", record.tenant_id);
            return Err(AppError::InvalidOrExpiredRefreshToken);
        }

        let principal = self.directory.find_principal(db, record.principal_id).await?
            .filter(|p| p.active)
            .ok_or(AppError::InvalidOrExpiredRefreshToken)?;

        let access_token = self.sign_access(&principal)?;
        let (refresh_token, replacement) = self.new_refresh_record(&principal);

        if !self.repo.rotate(db, &old_hash, &replacement).await? {
            warn!("Refresh token for principal {} was consumed concurrently", principal.id);
            return Err(AppError::InvalidOrExpiredRefreshToken);
        }

        Ok((principal, TokenPair { access_token, refresh_token }))
    }

    pub async fn revoke(&self, db: &ScopedDb, raw_refresh_token: &str) -> Result<(), AppError> {
        self.repo.delete(db, &hash_token(raw_refresh_token)).await
    }

    pub async fn revoke_all(&self, db: &ScopedDb, principal_id: Uuid) -> Result<u64, AppError> {
        self.repo.delete_all_for_principal(db, principal_id).await
    }

    pub async fn purge_expired(&self, db: &ScopedDb) -> Result<u64, AppError> {
        self.repo.delete_expired(db).await
    }

    /// Checks signature, expiry, audience and the kind tag.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthFailure> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[K::AUDIENCE]);
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthFailure::Expired,
            _ => AuthFailure::Invalid,
        })?;

        if data.claims.kind != K::KIND {
            return Err(AuthFailure::Invalid);
        }
        Ok(data.claims)
    }

    pub fn set_cookies(&self, cookies: &Cookies, pair: &TokenPair) {
        cookies.add(self.cookie(K::ACCESS_COOKIE, pair.access_token.clone(), "/", self.access_ttl));
        cookies.add(self.cookie(K::REFRESH_COOKIE, pair.refresh_token.clone(), K::REFRESH_PATH, self.refresh_ttl));
    }

    /// Emits removal cookies whether or not the client sent them.
    pub fn clear_cookies(&self, cookies: &Cookies) {
        for (name, path) in [(K::ACCESS_COOKIE, "/"), (K::REFRESH_COOKIE, K::REFRESH_PATH)] {
            let mut cookie = self.cookie(name, String::new(), path, StdDuration::ZERO);
            cookie.make_removal();
            cookies.add(cookie);
        }
    }

    pub fn access_cookie_value(&self, cookies: &Cookies) -> Option<String> {
        cookies.get(K::ACCESS_COOKIE).map(|c| c.value().to_string())
    }

    pub fn refresh_cookie_value(&self, cookies: &Cookies) -> Option<String> {
        cookies.get(K::REFRESH_COOKIE).map(|c| c.value().to_string())
    }

    pub(crate) fn sign_access(&self, principal: &Principal) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: principal.id,
            ident: principal.identifier.clone(),
            kind: K::KIND,
            tid: principal.tenant_id,
            aud: K::AUDIENCE.to_string(),
            iat: now.timestamp() as usize,
            exp: (now + Duration::seconds(self.access_ttl.as_secs() as i64)).timestamp() as usize,
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| {
                error!("JWT encoding failed: {}", e);
                AppError::Internal
            })
    }

    fn new_refresh_record(&self, principal: &Principal) -> (String, RefreshTokenRecord) {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let raw = URL_SAFE_NO_PAD.encode(bytes);

        let now = Utc::now();
        let record = RefreshTokenRecord {
            token_hash: hash_token(&raw),
            principal_id: principal.id,
            tenant_id: principal.tenant_id,
            expires_at: now + Duration::seconds(self.refresh_ttl.as_secs() as i64),
            created_at: now,
        };
        (raw, record)
    }

    fn cookie(&self, name: &'static str, value: String, path: &'static str, ttl: StdDuration) -> Cookie<'static> {
        let mut cookie = Cookie::new(name, value);
        cookie.set_http_only(true);
        cookie.set_secure(self.secure_cookies);
        cookie.set_same_site(SameSite::Strict);
        cookie.set_path(path);
        cookie.set_max_age(time::Duration::seconds(ttl.as_secs() as i64));
        cookie
    }
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

pub struct EmployeeDirectory(pub Arc<dyn UserRepository>);

#[async_trait]
impl PrincipalDirectory for EmployeeDirectory {
    async fn find_principal(&self, _db: &ScopedDb, id: Uuid) -> Result<Option<Principal>, AppError> {
        Ok(self.0.find_by_id(id).await?.as_ref().map(Principal::from))
    }
}

pub struct PortalDirectory(pub Arc<dyn ClientUserRepository>);

#[async_trait]
impl PrincipalDirectory for PortalDirectory {
    async fn find_principal(&self, db: &ScopedDb, id: Uuid) -> Result<Option<Principal>, AppError> {
        Ok(self.0.find_by_id(db, id).await?.as_ref().map(Principal::from))
    }
}
