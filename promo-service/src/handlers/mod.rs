pub mod auth;
pub mod events;
pub mod health;
pub mod promo_codes;
pub mod redeem;
pub mod tokens;
