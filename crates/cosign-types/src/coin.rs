//! Coin amounts as written on the command line (`100uatom`)

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CoinError {
    #[error("invalid coin {0:?}: expected amount followed by denom, e.g. 100uatom")]
    Format(String),

    #[error("invalid denomination: {0}")]
    InvalidDenom(String),

    #[error("amount overflow in {0}")]
    Overflow(String),
}

/// A single integer coin amount
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Coin {
    pub amount: u128,
    pub denom: String,
}

impl Coin {
    pub fn new(amount: u128, denom: impl Into<String>) -> Result<Self, CoinError> {
        let denom = denom.into();
        if !is_valid_denom(&denom) {
            return Err(CoinError::InvalidDenom(denom));
        }
        Ok(Self { amount, denom })
    }

    /// Add another coin of the same denom
    pub fn checked_add(&self, other: &Coin) -> Option<Coin> {
        if self.denom != other.denom {
            return None;
        }
        self.amount.checked_add(other.amount).map(|amount| Coin {
            amount,
            denom: self.denom.clone(),
        })
    }
}

impl FromStr for Coin {
    type Err = CoinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| CoinError::Format(s.to_string()))?;
        let (amount, denom) = s.split_at(split);
        if amount.is_empty() {
            return Err(CoinError::Format(s.to_string()));
        }
        let amount = amount
            .parse::<u128>()
            .map_err(|_| CoinError::Overflow(s.to_string()))?;
        Coin::new(amount, denom)
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

fn is_valid_denom(denom: &str) -> bool {
    let mut chars = denom.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    denom.len() >= 2
        && denom.len() <= 128
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | ':' | '.' | '_' | '-'))
}
