//! Account query output parsing
//!
//! `query account --output json` renders a different JSON shape for every
//! account kind. Each known kind is located by its `@type` and reduced to the
//! embedded base account, which carries the two numbers we need.

use crate::ChainError;
use serde::Deserialize;
use serde_json::Value;

/// Account number and sequence of an on-chain account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountNumbers {
    pub account_number: u64,
    pub sequence: u64,
}

const BASE_ACCOUNT: &str = "/cosmos.auth.v1beta1.BaseAccount";

const VESTING_ACCOUNTS: &[&str] = &[
    "/cosmos.vesting.v1beta1.ContinuousVestingAccount",
    "/cosmos.vesting.v1beta1.DelayedVestingAccount",
    "/cosmos.vesting.v1beta1.PeriodicVestingAccount",
    "/cosmos.vesting.v1beta1.PermanentLockedAccount",
    "/stride.vesting.StridePeriodicVestingAccount",
];

/// Extract account number and sequence from account query JSON
pub fn parse_account(output: &[u8]) -> Result<AccountNumbers, ChainError> {
    let value: Value = serde_json::from_slice(output)
        .map_err(|e| ChainError::Unparsable(format!("account query output is not JSON: {e}")))?;
    numbers_of(&value)
}

fn numbers_of(value: &Value) -> Result<AccountNumbers, ChainError> {
    let kind = value.get("@type").and_then(Value::as_str);

    let base = match kind {
        Some(BASE_ACCOUNT) => value,
        Some(kind) if VESTING_ACCOUNTS.contains(&kind) => value
            .pointer("/base_vesting_account/base_account")
            .ok_or_else(|| missing(kind, "base_vesting_account.base_account"))?,
        Some(kind) if kind.contains("EthAccount") => value
            .get("base_account")
            .ok_or_else(|| missing(kind, "base_account"))?,
        Some(kind) => {
            return Err(ChainError::Unparsable(format!(
                "cannot parse account type {kind}"
            )))
        }
        // newer SDKs wrap the account: {"account": {...}}
        None => match value.get("account") {
            Some(inner) => return numbers_of(inner),
            None => return Err(ChainError::Unparsable("account has no @type".into())),
        },
    };

    Ok(AccountNumbers {
        account_number: number(base, "account_number")?
            .ok_or_else(|| ChainError::Unparsable("account number is missing".into()))?,
        // proto3 JSON drops zero values
        sequence: number(base, "sequence")?.unwrap_or(0),
    })
}

fn missing(kind: &str, field: &str) -> ChainError {
    ChainError::Unparsable(format!("{kind} has no {field}"))
}

/// Numbers come as strings from protojson and as integers from amino JSON
fn number(value: &Value, field: &str) -> Result<Option<u64>, ChainError> {
    let not_integer = || ChainError::Unparsable(format!("{field} is not an integer"));
    match value.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_u64().map(Some).ok_or_else(not_integer),
        Some(Value::String(s)) => s.parse().map(Some).map_err(|_| not_integer()),
        Some(_) => Err(not_integer()),
    }
}

#[derive(Deserialize)]
struct Balances {
    #[serde(default)]
    balances: Vec<Balance>,
}

#[derive(Deserialize)]
struct Balance {
    denom: String,
    amount: String,
}

/// Amount of `denom` in `query bank balances --output json` output
pub fn parse_balance(output: &[u8], denom: &str) -> Result<u128, ChainError> {
    let parsed: Balances = serde_json::from_slice(output)
        .map_err(|e| ChainError::Unparsable(format!("cannot parse balance: {e}")))?;
    let balance = parsed
        .balances
        .iter()
        .find(|b| b.denom.eq_ignore_ascii_case(denom))
        .ok_or_else(|| ChainError::Unparsable(format!("cannot find balance for {denom} denom")))?;
    balance
        .amount
        .parse()
        .map_err(|_| ChainError::Unparsable(format!("cannot parse balance for {denom} denom")))
}
