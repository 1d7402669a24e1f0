// ABOUTME: Built-in native helper functions available to every template
// ABOUTME: Implements string, encoding, time and environment helpers over template values

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, TimeZone, Utc};
use std::env;
use std::fmt::Write as _;
use uuid::Uuid;

use crate::expr::{EvalError, Result, Value};

const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn required_str(name: &str, args: &[Value], index: usize, what: &str) -> Result<String> {
    match args.get(index) {
        Some(value) if !value.is_nullish() => Ok(value.to_string()),
        _ => Err(EvalError::helper(
            name,
            format!("{} helper requires {} parameter", name, what),
        )),
    }
}

fn optional_str(args: &[Value], index: usize) -> Option<String> {
    args.get(index)
        .filter(|value| !value.is_nullish())
        .map(Value::to_string)
}

fn format_datetime(name: &str, datetime: &DateTime<Utc>, format: &str) -> Result<String> {
    let mut out = String::new();
    write!(out, "{}", datetime.format(format))
        .map_err(|_| EvalError::helper(name, format!("invalid time format '{}'", format)))?;
    Ok(out)
}

/// Upper-cases its argument
pub fn upper_helper(args: &[Value]) -> Result<Value> {
    let input = required_str("upper", args, 0, "input")?;
    Ok(Value::String(input.to_uppercase()))
}

/// Lower-cases its argument
pub fn lower_helper(args: &[Value]) -> Result<Value> {
    let input = required_str("lower", args, 0, "input")?;
    Ok(Value::String(input.to_lowercase()))
}

pub fn trim_helper(args: &[Value]) -> Result<Value> {
    let input = required_str("trim", args, 0, "input")?;
    Ok(Value::String(input.trim().to_string()))
}

/// Default helper - provides default value if the first value is empty
pub fn default_helper(args: &[Value]) -> Result<Value> {
    let value = args.first().cloned().unwrap_or_default();
    let fallback = args.get(1).cloned().ok_or_else(|| {
        EvalError::helper("default", "default helper requires default value parameter")
    })?;

    let empty = value.is_nullish() || value.as_str().is_some_and(str::is_empty);
    Ok(if empty { fallback } else { value })
}

/// Join helper - joins array elements with a separator
pub fn join_helper(args: &[Value]) -> Result<Value> {
    let Some(Value::Array(items)) = args.first() else {
        return Err(EvalError::helper("join", "join helper requires array parameter"));
    };
    let separator = optional_str(args, 1).unwrap_or_else(|| ",".to_string());

    let joined = items
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(&separator);
    Ok(Value::String(joined))
}

/// Serialises a value as JSON text
pub fn json_helper(args: &[Value]) -> Result<Value> {
    let value = args.first().cloned().unwrap_or_default();
    serde_json::to_string(&value.to_json())
        .map(Value::String)
        .map_err(|e| EvalError::helper("json", e.to_string()))
}

/// Timestamp helper - formats current time with optional format string
pub fn timestamp_helper(args: &[Value]) -> Result<Value> {
    let format = optional_str(args, 0).unwrap_or_else(|| DEFAULT_TIME_FORMAT.to_string());
    format_datetime("timestamp", &Utc::now(), &format).map(Value::String)
}

/// Format time helper - formats an RFC 3339 or Unix timestamp
pub fn format_time_helper(args: &[Value]) -> Result<Value> {
    let input = required_str("format_time", args, 0, "timestamp")?;
    let format = optional_str(args, 1).unwrap_or_else(|| DEFAULT_TIME_FORMAT.to_string());

    let datetime = match DateTime::parse_from_rfc3339(&input) {
        Ok(parsed) => parsed.with_timezone(&Utc),
        Err(rfc_err) => input
            .parse::<i64>()
            .ok()
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
            .ok_or_else(|| {
                EvalError::helper(
                    "format_time",
                    format!("Failed to parse timestamp: {}", rfc_err),
                )
            })?,
    };

    format_datetime("format_time", &datetime, &format).map(Value::String)
}

/// UUID helper - generates a new UUID v4
pub fn uuid_helper(_args: &[Value]) -> Result<Value> {
    Ok(Value::String(Uuid::new_v4().to_string()))
}

/// Environment variable helper - reads a variable with an optional default
pub fn env_helper(args: &[Value]) -> Result<Value> {
    let var_name = required_str("env", args, 0, "variable name")?;
    let default_value = optional_str(args, 1).unwrap_or_default();
    Ok(Value::String(env::var(var_name).unwrap_or(default_value)))
}

pub fn base64_encode_helper(args: &[Value]) -> Result<Value> {
    let input = required_str("base64_encode", args, 0, "input")?;
    Ok(Value::String(BASE64.encode(input.as_bytes())))
}

pub fn base64_decode_helper(args: &[Value]) -> Result<Value> {
    let input = required_str("base64_decode", args, 0, "input")?;

    let decoded_bytes = BASE64
        .decode(input)
        .map_err(|e| EvalError::helper("base64_decode", format!("Base64 decode error: {}", e)))?;

    String::from_utf8(decoded_bytes)
        .map(Value::String)
        .map_err(|e| EvalError::helper("base64_decode", format!("UTF-8 decode error: {}", e)))
}

/// All built-in helpers, in registration order.
pub fn builtin_helpers() -> Vec<(&'static str, Value)> {
    vec![
        ("upper", Value::native("upper", upper_helper)),
        ("lower", Value::native("lower", lower_helper)),
        ("trim", Value::native("trim", trim_helper)),
        ("default", Value::native("default", default_helper)),
        ("join", Value::native("join", join_helper)),
        ("json", Value::native("json", json_helper)),
        ("timestamp", Value::native("timestamp", timestamp_helper)),
        ("format_time", Value::native("format_time", format_time_helper)),
        ("uuid", Value::native("uuid", uuid_helper)),
        ("env", Value::native("env", env_helper)),
        ("base64_encode", Value::native("base64_encode", base64_encode_helper)),
        ("base64_decode", Value::native("base64_decode", base64_decode_helper)),
    ]
}
