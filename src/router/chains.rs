//! Picking the chain an instruction belongs to

use super::RouterError;
use crate::network::{BASE_SEPOLIA_CHAIN_ID, OPTIMISM_SEPOLIA_CHAIN_ID};

const BASE_TERMS: &[&str] = &["base", "base-sepolia"];
const OPTIMISM_TERMS: &[&str] = &["optimism", "op", "optimism-sepolia"];

/// Keyword match on whole words. Base wins when both chains are named.
pub fn chain_for_instruction(instruction: &str) -> Option<u64> {
    let lower = instruction.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !(c.is_alphanumeric() || c == '-'))
        .filter(|w| !w.is_empty())
        .collect();

    let mentions = |terms: &[&str]| words.iter().any(|w| terms.contains(w));
    if mentions(BASE_TERMS) {
        Some(BASE_SEPOLIA_CHAIN_ID)
    } else if mentions(OPTIMISM_TERMS) {
        Some(OPTIMISM_SEPOLIA_CHAIN_ID)
    } else {
        None
    }
}

/// Explicit chain id if given (must be one of the two), else keywords, else Base
pub fn resolve_chain(explicit: Option<&str>, instruction: &str) -> Result<u64, RouterError> {
    match explicit.map(str::trim).filter(|c| !c.is_empty()) {
        Some(raw) => match raw.parse::<u64>() {
            Ok(id) if id == BASE_SEPOLIA_CHAIN_ID || id == OPTIMISM_SEPOLIA_CHAIN_ID => Ok(id),
            _ => Err(RouterError::InvalidChain(raw.to_string())),
        },
        None => Ok(chain_for_instruction(instruction).unwrap_or(BASE_SEPOLIA_CHAIN_ID)),
    }
}

pub fn chain_name(chain_id: u64) -> &'static str {
    match chain_id {
        BASE_SEPOLIA_CHAIN_ID => "Base",
        OPTIMISM_SEPOLIA_CHAIN_ID => "Optimism",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_chain_keywords() {
        assert_eq!(chain_for_instruction("Deposit on Base"), Some(84532));
        assert_eq!(chain_for_instruction("use base-sepolia please"), Some(84532));
        assert_eq!(chain_for_instruction("bridge to OP"), Some(11155420));
        assert_eq!(chain_for_instruction("check optimism-sepolia balance"), Some(11155420));
        assert_eq!(chain_for_instruction("from base to optimism"), Some(84532));
    }

    #[test]
    fn substrings_do_not_count() {
        assert_eq!(chain_for_instruction("open a database"), None);
        assert_eq!(chain_for_instruction("stop the operation"), None);
        assert_eq!(chain_for_instruction("show my balance"), None);
    }

    #[test]
    fn resolve_prefers_explicit_chain() {
        assert_eq!(resolve_chain(Some("11155420"), "on base").unwrap(), 11155420);
        assert_eq!(resolve_chain(None, "on optimism").unwrap(), 11155420);
        assert_eq!(resolve_chain(None, "anything").unwrap(), 84532);
        assert_eq!(resolve_chain(Some(""), "anything").unwrap(), 84532);
    }

    #[test]
    fn resolve_rejects_other_chains() {
        let err = resolve_chain(Some("1"), "x").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid chain_id: 1. Must be 84532 (Base) or 11155420 (Optimism)."
        );
        assert!(resolve_chain(Some("base"), "x").is_err());
    }
}
