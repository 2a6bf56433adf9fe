use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Product advertised to the price-comparison API. Owned by the surrounding
/// CRUD subsystem; the core only reads it (and registers it upstream).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
}

/// Competitor offer as reported by the upstream API.
/// Price is in the smallest currency unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub id: Uuid,
    pub price: i64,
    pub items_in_stock: i32,
}

/// Bearer credential for the upstream API with its absolute expiry
/// (Unix seconds, taken verbatim from the token's `expires` claim).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    pub token: String,
    pub expires: i64,
}

impl AuthToken {
    /// A token whose expiry equals "now" is already expired (no grace window).
    pub fn is_valid_at(&self, now_unix: f64) -> bool {
        self.expires as f64 > now_unix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAST: i64 = 99;
    const PRESENT: i64 = 100;
    const FUTURE: i64 = 101;
    const NOW: f64 = 100.0;

    #[test]
    fn expired_token_is_invalid() {
        let token = AuthToken {
            token: "token1".into(),
            expires: PAST,
        };
        assert!(!token.is_valid_at(NOW));
    }

    #[test]
    fn token_expiring_exactly_now_is_invalid() {
        let token = AuthToken {
            token: "token2".into(),
            expires: PRESENT,
        };
        assert!(!token.is_valid_at(NOW));
    }

    #[test]
    fn token_valid_for_one_more_second() {
        let token = AuthToken {
            token: "token3".into(),
            expires: FUTURE,
        };
        assert!(token.is_valid_at(NOW));
    }
}
