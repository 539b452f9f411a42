//! Common types used across the platform
//!
//! Wallet addresses are compared and stored in one canonical form, the
//! EIP-55 checksummed string. Every document key derived from an address
//! (DAO ids, member ids, voter ids, signer ids) goes through [`CanonicalAddress`].

use alloy_primitives::{Address, B256, U256};
use std::str::FromStr;

use crate::error::{DaoError, DaoResult};

/// Canonical string form of an address
pub trait CanonicalAddress {
    /// EIP-55 checksummed `0x…` string
    fn canonical(&self) -> String;
}

impl CanonicalAddress for Address {
    fn canonical(&self) -> String {
        self.to_checksum(None)
    }
}

/// Parse an address in any casing, rejecting malformed input
pub fn parse_address(field: &str, value: &str) -> DaoResult<Address> {
    Address::from_str(value.trim())
        .map_err(|_| DaoError::validation(format!("{} is not a valid address: {}", field, value)))
}

/// Normalize an address string to its canonical form
pub fn canonicalize_address(field: &str, value: &str) -> DaoResult<String> {
    parse_address(field, value).map(|a| a.canonical())
}

/// Parse a 32-byte transaction hash
pub fn parse_tx_hash(value: &str) -> DaoResult<B256> {
    let trimmed = value.trim();
    if !trimmed.starts_with("0x") || trimmed.len() != 66 {
        return Err(DaoError::validation(format!(
            "txHash must be a 0x-prefixed 32-byte hex string: {}",
            value
        )));
    }
    B256::from_str(trimmed)
        .map_err(|_| DaoError::validation(format!("txHash is not valid hex: {}", value)))
}

/// Parse a decimal amount with arbitrary precision
pub fn parse_amount(field: &str, value: &str) -> DaoResult<U256> {
    U256::from_str_radix(value.trim(), 10).map_err(|_| {
        DaoError::validation(format!("{} must be a non-negative decimal integer: {}", field, value))
    })
}

/// Chain-assigned identifier rendered as a document id
pub fn entity_doc_id(id: &U256) -> String {
    id.to_string()
}

/// Parse a document id back into a chain identifier
pub fn parse_entity_id(field: &str, value: &str) -> DaoResult<U256> {
    parse_amount(field, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_address_is_checksummed() {
        let lower = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";
        let addr = parse_address("creator", lower).unwrap();
        assert_eq!(addr.canonical(), "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");

        let upper = "0x5AAEB6053F3E94C9B9A09F33669435E7EF1BEAED";
        assert_eq!(
            canonicalize_address("creator", upper).unwrap(),
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        );
    }

    #[test]
    fn test_parse_address_rejects_garbage() {
        let err = parse_address("voter", "0x1234").unwrap_err();
        assert!(matches!(err, DaoError::Validation(_)));
    }

    #[test]
    fn test_parse_tx_hash() {
        let hash = format!("0x{}", "ab".repeat(32));
        assert!(parse_tx_hash(&hash).is_ok());
        assert!(parse_tx_hash("0xabc").is_err());
        assert!(parse_tx_hash(&"ab".repeat(33)).is_err());
    }

    #[test]
    fn test_amount_keeps_full_precision() {
        let big = "115792089237316195423570985008687907853269984665640564039457584007913129639935";
        let value = parse_amount("amount", big).unwrap();
        assert_eq!(value, U256::MAX);
        assert_eq!(entity_doc_id(&value), big);
        assert!(parse_amount("amount", "-1").is_err());
        assert!(parse_amount("amount", "1.5").is_err());
    }
}
