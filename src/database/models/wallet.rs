use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Largest amount a single entry, and the balance itself, may hold.
/// Mirrors the CHECK constraints and guard triggers in the schema.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, FromRow)]
pub struct Wallet {
    pub current_balance: i64,
}
