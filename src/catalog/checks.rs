//! Response validation, one rule per task.
//!
//! Each check maps a response to `Ok(context)` (data a follow-up task may
//! need) or `Err(reason)`. A failed check is an outcome, never an error.
use serde_json::Value;

use crate::http::ApiResponse;

pub type Check<T> = Result<T, String>;

const STATUS_OK: u16 = 200;
/// Claiming with nothing to claim answers 400; that still counts as a pass.
const STATUS_NO_REWARDS: u16 = 400;

#[must_use]
pub fn status_reason(status: u16) -> String {
    format!("Got status code {}", status)
}

fn ok_json(response: &ApiResponse) -> Check<Value> {
    if response.status != STATUS_OK {
        return Err(status_reason(response.status));
    }
    response
        .json()
        .map_err(|err| format!("Invalid JSON response: {}", err))
}

/// Login: 200 with an optional `token`.
///
/// # Errors
///
/// Returns the failure reason for a non-200 status or a non-JSON body.
pub fn login(response: &ApiResponse) -> Check<Option<String>> {
    let data = ok_json(response)?;
    Ok(data.get("token").and_then(Value::as_str).map(str::to_owned))
}

/// Search: 200 and a non-empty list of results.
///
/// # Errors
///
/// Returns `No results returned` for an empty or non-list payload.
pub fn search(response: &ApiResponse) -> Check<Vec<Value>> {
    match ok_json(response)? {
        Value::Array(results) if !results.is_empty() => Ok(results),
        Value::Array(_)
        | Value::Null
        | Value::Bool(_)
        | Value::Number(_)
        | Value::String(_)
        | Value::Object(_) => Err("No results returned".to_owned()),
    }
}

/// Influencer details: 200 with both `pool` and `metrics`.
///
/// # Errors
///
/// Returns the failure reason when either field is missing.
pub fn view_details(response: &ApiResponse) -> Check<()> {
    let data = ok_json(response)?;
    if data.get("pool").is_some() && data.get("metrics").is_some() {
        Ok(())
    } else {
        Err("Missing required fields in response".to_owned())
    }
}

/// Stake: 200 with a truthy `success` flag and a `transactionId`.
///
/// # Errors
///
/// Returns `Staking operation failed` when either is missing or falsy.
pub fn stake(response: &ApiResponse) -> Check<String> {
    let data = ok_json(response)?;
    let succeeded = data.get("success").is_some_and(is_truthy);
    let transaction_id = data
        .get("transactionId")
        .filter(|value| is_truthy(value))
        .map(value_to_id);
    match (succeeded, transaction_id) {
        (true, Some(id)) => Ok(id),
        _ => Err("Staking operation failed".to_owned()),
    }
}

/// Portfolio: 200 and a list (possibly empty) of stakes.
///
/// # Errors
///
/// Returns `Invalid portfolio format` when the payload is not a list.
pub fn portfolio(response: &ApiResponse) -> Check<Vec<Value>> {
    match ok_json(response)? {
        Value::Array(stakes) => Ok(stakes),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) | Value::Object(_) => {
            Err("Invalid portfolio format".to_owned())
        }
    }
}

/// Claim rewards: 200, or 400 when there is nothing to claim.
///
/// # Errors
///
/// Returns the status reason for any other status.
pub fn claim_rewards(response: &ApiResponse) -> Check<()> {
    match response.status {
        STATUS_OK | STATUS_NO_REWARDS => Ok(()),
        other => Err(status_reason(other)),
    }
}

/// Content list: 200 with an `items` field; returns the items.
///
/// # Errors
///
/// Returns the failure reason when `items` is missing.
pub fn browse_content(response: &ApiResponse) -> Check<Vec<Value>> {
    let data = ok_json(response)?;
    match data.get("items") {
        Some(Value::Array(items)) => Ok(items.clone()),
        Some(_) => Ok(Vec::new()),
        None => Err("Missing items field in response".to_owned()),
    }
}

/// Analytics, content details, notifications and realtime polling.
///
/// # Errors
///
/// Returns the status reason for anything but 200.
pub fn status_ok(response: &ApiResponse) -> Check<()> {
    if response.status == STATUS_OK {
        Ok(())
    } else {
        Err(status_reason(response.status))
    }
}

/// The `id` of an entity, as a string whether the API sent text or a number.
#[must_use]
pub fn entity_id(entity: &Value) -> Option<String> {
    entity
        .get("id")
        .filter(|value| value.is_string() || value.is_number())
        .map(value_to_id)
}

/// The `influencer.id` of a portfolio stake.
#[must_use]
pub fn stake_influencer_id(stake: &Value) -> Option<String> {
    stake.get("influencer").and_then(entity_id)
}

fn value_to_id(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => {
            value.to_string()
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n.abs() > 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
