//! Caller identity

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::error::{DaoError, DaoResult};

/// The authenticated user behind a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    /// Stable user identifier from the identity provider
    pub uid: String,
    /// Wallet linked to the user's profile, if any
    pub wallet: Option<Address>,
}

impl CallerIdentity {
    pub fn new(uid: impl Into<String>, wallet: Option<Address>) -> Self {
        Self {
            uid: uid.into(),
            wallet,
        }
    }

    /// Linked wallet, required for actions signed on chain
    pub fn require_wallet(&self) -> DaoResult<&Address> {
        self.wallet
            .as_ref()
            .ok_or_else(|| DaoError::NotAuthenticated("no wallet linked to this account".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_wallet() {
        let anonymous = CallerIdentity::new("uid-1", None);
        assert!(matches!(
            anonymous.require_wallet(),
            Err(DaoError::NotAuthenticated(_))
        ));

        let linked = CallerIdentity::new("uid-1", Some(Address::repeat_byte(0x01)));
        assert_eq!(linked.require_wallet().unwrap(), &Address::repeat_byte(0x01));
    }
}
