//! Gas estimation for outgoing transactions
//!
//! Estimation runs through the active [`WalletProvider`] before anything is
//! signed; node errors are reduced to a readable revert reason.

use super::provider::WalletProvider;
use alloy::hex;
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::decode_revert_reason;
use tracing::warn;

pub struct TransactionSimulator;

impl TransactionSimulator {
    /// Estimate gas, using `fallback` when the node refuses to estimate
    pub async fn estimate_or_fallback(
        wallet: &dyn WalletProvider,
        tx: &TransactionRequest,
        fallback: u64,
    ) -> u64 {
        match wallet.estimate_gas(tx).await {
            Ok(gas) => gas,
            Err(e) => {
                warn!(
                    reason = %Self::parse_revert_reason(&e.to_string()),
                    fallback,
                    "Gas estimation failed, using fallback limit"
                );
                fallback
            }
        }
    }

    /// Estimate gas with a percentage buffer on top
    pub async fn estimate_with_buffer(
        wallet: &dyn WalletProvider,
        tx: &TransactionRequest,
        buffer_percent: u64,
    ) -> crate::Result<u64> {
        let gas = wallet.estimate_gas(tx).await?;
        Ok(gas.saturating_mul(100 + buffer_percent) / 100)
    }

    /// Reduce a node error to the contract's revert reason where one is present
    pub fn parse_revert_reason(error: &str) -> String {
        if !error.contains("execution reverted") {
            return error.to_string();
        }
        if let Some((_, rest)) = error.split_once("revert: ") {
            return rest.split('"').next().unwrap_or(rest).to_string();
        }
        match revert_data(error) {
            Some(data) => match hex::decode(data).ok().and_then(|b| decode_revert_reason(&b)) {
                Some(reason) => reason,
                None => format!("Reverted with data: {}", data),
            },
            None => "execution reverted".to_string(),
        }
    }
}

/// First `0x`-prefixed hex run in the message
fn revert_data(error: &str) -> Option<&str> {
    let start = error.find("0x")?;
    let tail = &error[start..];
    let len = tail[2..]
        .find(|c: char| !c.is_ascii_hexdigit())
        .map_or(tail.len(), |i| i + 2);
    Some(&tail[..len])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revert_string_is_extracted() {
        let error = "execution reverted: revert: Insufficient balance\"";
        assert_eq!(
            TransactionSimulator::parse_revert_reason(error),
            "Insufficient balance"
        );

        assert_eq!(
            TransactionSimulator::parse_revert_reason("execution reverted"),
            "execution reverted"
        );

        assert_eq!(
            TransactionSimulator::parse_revert_reason("some other error"),
            "some other error"
        );
    }

    #[test]
    fn error_string_payload_is_decoded() {
        // Error("no agent")
        let data = "0x08c379a0\
            0000000000000000000000000000000000000000000000000000000000000020\
            0000000000000000000000000000000000000000000000000000000000000008\
            6e6f206167656e74000000000000000000000000000000000000000000000000";
        let error = format!("execution reverted, data: \"{}\"", data);
        assert_eq!(TransactionSimulator::parse_revert_reason(&error), "revert: no agent");
    }

    #[test]
    fn custom_error_data_is_reported_raw() {
        let error = "server returned an error response: execution reverted, data: \"0x1425ea42\"";
        assert_eq!(
            TransactionSimulator::parse_revert_reason(error),
            "Reverted with data: 0x1425ea42"
        );
    }
}
