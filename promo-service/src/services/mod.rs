//! Services layer for promo-service.
//!
//! Storage backends, the promo code registry, token issuing, the redemption
//! engine and the activity feed.

pub mod applier;
pub mod auth;
mod cache;
pub mod clock;
mod database;
pub mod error;
mod memory;
pub mod metrics;
pub mod notifier;
pub mod redemption;
pub mod registry;
pub mod store;
pub mod tokens;

pub use applier::{ApplyOutcome, CodeApplier, HttpCodeApplier, MockBehavior, MockCodeApplier};
pub use auth::{AdminClaims, ConfiguredAdmin, CredentialVerifier, JwtService};
pub use clock::{Clock, ManualClock, SystemClock};
pub use database::PromoDb;
pub use error::ServiceError;
pub use memory::InMemoryStore;
pub use notifier::ActivityNotifier;
pub use redemption::{RedemptionContext, RedemptionEngine, RedemptionError, RedemptionResult};
pub use registry::{NewPromoCode, PromoCodeRegistry};
pub use store::{
    EventStore, Page, Paginated, PromoCodeChanges, PromoCodeFilter, PromoCodeStore, StoreHealth,
    Stores, TokenFilter, TokenStore, TokenUsage,
};
pub use tokens::{NewToken, TokenService};
