//! Domain Models
//!
//! NEAR amounts are `u128` yoctoNEAR on the wire and `Decimal` NEAR for humans.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{NearError, Result};

/// yoctoNEAR per NEAR (10^24)
pub const YOCTO_PER_NEAR: u128 = 1_000_000_000_000_000_000_000_000;

/// Convert a NEAR amount to yoctoNEAR
pub fn near_to_yocto(near: Decimal) -> Result<u128> {
    if near.is_sign_negative() {
        return Err(NearError::Amount(format!("{near} NEAR is negative")));
    }
    // Scale in two steps so the intermediate stays inside Decimal's 96-bit mantissa.
    let micro = (near * Decimal::from(1_000_000u64))
        .trunc()
        .to_u128()
        .ok_or_else(|| NearError::Amount(format!("{near} NEAR")))?;
    micro
        .checked_mul(YOCTO_PER_NEAR / 1_000_000)
        .ok_or_else(|| NearError::Amount(format!("{near} NEAR overflows u128")))
}

/// Convert yoctoNEAR to a NEAR amount (truncated to 6 decimals)
pub fn yocto_to_near(yocto: u128) -> Decimal {
    let micro = yocto / (YOCTO_PER_NEAR / 1_000_000);
    Decimal::from_i128_with_scale(micro as i128, 6).normalize()
}

/// Validate a NEAR account id.
///
/// Named accounts are 2-64 chars of lowercase alphanumerics separated by
/// single `-`, `_` or `.`; implicit accounts are 64 lowercase hex chars.
pub fn validate_account_id(account_id: &str) -> Result<()> {
    let invalid = || NearError::InvalidAccount(account_id.to_string());

    if !(2..=64).contains(&account_id.len()) {
        return Err(invalid());
    }

    let mut prev_separator = true;
    for c in account_id.chars() {
        match c {
            'a'..='z' | '0'..='9' => prev_separator = false,
            '-' | '_' | '.' if !prev_separator => prev_separator = true,
            _ => return Err(invalid()),
        }
    }
    if prev_separator {
        return Err(invalid());
    }

    Ok(())
}

/// Faucet transfer confirmation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FaucetReceipt {
    pub tx_hash: String,
    pub amount_yocto: u128,
}

/// Final status of a submitted transaction
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TxStatus {
    /// `SuccessValue` (base64 return value, possibly empty)
    Success(String),
    /// `Failure` with the raw error object
    Failure(Value),
    Unknown,
}

impl TxStatus {
    /// Read the `status` object of an RPC transaction outcome
    pub fn from_rpc(status: &Value) -> Self {
        if let Some(value) = status.get("SuccessValue") {
            TxStatus::Success(value.as_str().unwrap_or_default().to_string())
        } else if let Some(failure) = status.get("Failure") {
            TxStatus::Failure(failure.clone())
        } else {
            TxStatus::Unknown
        }
    }
}

/// Outcome of a function call transaction
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TxOutcome {
    pub hash: String,
    pub status: TxStatus,
}

/// NEP-177 token metadata
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NftMetadata {
    pub title: String,
    pub description: String,
    pub media: String,
    pub copies: u32,
}

impl Default for NftMetadata {
    fn default() -> Self {
        Self {
            title: "AI minted NFT".into(),
            description: "Hello World from the NEAR AI agent!".into(),
            media: "https://ipfs.io/ipfs/QmQMZcwxrYF499EL1gvJ5Anw4UqAugoYv5XmQwmnoFS3eM".into(),
            copies: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_near_conversion() {
        assert_eq!(near_to_yocto(dec!(10)).unwrap(), 10 * YOCTO_PER_NEAR);
        assert_eq!(near_to_yocto(dec!(0.1)).unwrap(), YOCTO_PER_NEAR / 10);
        assert_eq!(yocto_to_near(YOCTO_PER_NEAR / 10), dec!(0.1));
        assert!(near_to_yocto(dec!(-1)).is_err());
    }

    #[test]
    fn test_account_validation() {
        assert!(validate_account_id("alice.testnet").is_ok());
        assert!(validate_account_id("my_bot-1.near").is_ok());
        assert!(validate_account_id(&"a".repeat(64)).is_ok());

        assert!(validate_account_id("a").is_err());
        assert!(validate_account_id("Alice.testnet").is_err());
        assert!(validate_account_id("alice..testnet").is_err());
        assert!(validate_account_id(".alice").is_err());
        assert!(validate_account_id("alice.").is_err());
        assert!(validate_account_id("alice testnet").is_err());
    }

    #[test]
    fn test_status_from_rpc() {
        let ok = serde_json::json!({"SuccessValue": ""});
        assert_eq!(TxStatus::from_rpc(&ok), TxStatus::Success(String::new()));

        let failed = serde_json::json!({"Failure": {"ActionError": {}}});
        assert!(matches!(TxStatus::from_rpc(&failed), TxStatus::Failure(_)));

        assert_eq!(TxStatus::from_rpc(&serde_json::json!({})), TxStatus::Unknown);
    }
}
