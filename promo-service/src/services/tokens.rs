use chrono::Duration;
use rand::Rng;
use std::sync::Arc;

use super::clock::Clock;
use super::error::ServiceError;
use super::store::{Page, Paginated, PromoCodeStore, TokenFilter, TokenStore};
use crate::models::{PromoCode, Token};
use crate::utils::TokenPrefix;

/// Token characters. 0/O and 1/I are left out so tokens survive being read aloud.
pub const TOKEN_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub fn random_token(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}

type TokenGenerator = dyn Fn(usize) -> String + Send + Sync;

#[derive(Debug, Clone, Default)]
pub struct NewToken {
    pub promo_code_id: String,
    pub custom_token: Option<String>,
    pub expires_in_days: Option<i64>,
}

pub struct TokenService {
    tokens: Arc<dyn TokenStore>,
    promo_codes: Arc<dyn PromoCodeStore>,
    clock: Arc<dyn Clock>,
    length: usize,
    default_expiry: Duration,
    generator: Arc<TokenGenerator>,
}

impl TokenService {
    pub fn new(
        tokens: Arc<dyn TokenStore>,
        promo_codes: Arc<dyn PromoCodeStore>,
        clock: Arc<dyn Clock>,
        length: usize,
        default_expiry_days: i64,
    ) -> Self {
        Self {
            tokens,
            promo_codes,
            clock,
            length,
            default_expiry: Duration::days(default_expiry_days),
            generator: Arc::new(random_token),
        }
    }

    /// Replace the random generator, e.g. to force collisions in tests.
    pub fn with_generator(
        mut self,
        generator: impl Fn(usize) -> String + Send + Sync + 'static,
    ) -> Self {
        self.generator = Arc::new(generator);
        self
    }

    /// Issue a token for an existing promo code.
    ///
    /// Generated strings are retried until the store accepts one; a custom
    /// string that is already taken fails with `DuplicateToken`.
    pub async fn generate(&self, new: NewToken) -> Result<(Token, PromoCode), ServiceError> {
        let promo = self
            .promo_codes
            .find_promo_code(&new.promo_code_id)
            .await?
            .ok_or(ServiceError::PromoCodeNotFound)?;

        let expiry = match new.expires_in_days {
            Some(days) if days < 1 => {
                return Err(ServiceError::Validation(
                    "expires_in_days must be at least 1".to_string(),
                ))
            }
            Some(days) => Duration::days(days),
            None => self.default_expiry,
        };
        let now = self.clock.now();
        let expires_at = now.checked_add_signed(expiry);

        if let Some(custom) = new.custom_token {
            let custom = custom.trim().to_string();
            if custom.is_empty() {
                return Err(ServiceError::Validation(
                    "custom_token must not be empty".to_string(),
                ));
            }
            let token = Token::new(custom, promo.id.clone(), now, expires_at);
            self.tokens.insert_token(&token).await?;
            tracing::info!(
                token = %TokenPrefix(&token.token),
                promo_code_id = %promo.id,
                "Custom token created"
            );
            return Ok((token, promo));
        }

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let candidate = (self.generator)(self.length);
            let token = Token::new(candidate, promo.id.clone(), now, expires_at);
            match self.tokens.insert_token(&token).await {
                Ok(()) => {
                    tracing::info!(
                        token = %TokenPrefix(&token.token),
                        promo_code_id = %promo.id,
                        attempts,
                        "Token generated"
                    );
                    return Ok((token, promo));
                }
                Err(ServiceError::DuplicateToken) => {
                    tracing::debug!(attempts, "Generated token collided, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub async fn get(&self, token: &str) -> Result<Token, ServiceError> {
        self.tokens
            .find_token(token.trim())
            .await?
            .ok_or(ServiceError::TokenNotFound)
    }

    /// Token together with its promo code, if that still exists.
    pub async fn get_with_promo_code(
        &self,
        token: &str,
    ) -> Result<(Token, Option<PromoCode>), ServiceError> {
        let token = self.get(token).await?;
        let promo = self.promo_codes.find_promo_code(&token.promo_code_id).await?;
        Ok((token, promo))
    }

    pub async fn list(
        &self,
        filter: TokenFilter,
        page: Page,
    ) -> Result<Paginated<Token>, ServiceError> {
        self.tokens.list_tokens(&filter, page).await
    }

    pub async fn delete(&self, token: &str) -> Result<(), ServiceError> {
        if !self.tokens.delete_token(token.trim()).await? {
            return Err(ServiceError::TokenNotFound);
        }
        tracing::info!(token = %TokenPrefix(token), "Token deleted");
        Ok(())
    }
}
