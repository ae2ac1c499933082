//! Minimal typed view over a contract's interface description, plus the ABI
//! encoding the pipeline needs: constructor arguments and call data for
//! configuration transactions.
//!
//! Only statically-sized Solidity types show up in deployment plans, so only
//! those are encodable here; anything else is rejected during validation,
//! before a single transaction is submitted.

use alloy_primitives::{keccak256, Address, U256};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AbiError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("function `{0}` is not present in the interface")]
    NoSuchFunction(String),
    #[error("`{function}` expects {expected} arguments, got {got}")]
    ArityMismatch { function: String, expected: usize, got: usize },
    #[error("argument {index} of `{function}` should be `{expected}`, got `{got}`")]
    TypeMismatch { function: String, index: usize, expected: String, got: &'static str },
    #[error("parameter type `{0}` is not encodable by this pipeline")]
    UnsupportedType(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AbiParam {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AbiItem {
    #[serde(rename = "type", default = "default_item_kind")]
    pub kind: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub inputs: Vec<AbiParam>,
}

fn default_item_kind() -> String {
    // Pre-0.5 compilers omit `type` on plain functions.
    "function".to_string()
}

/// A parsed interface description, as emitted next to the bytecode.
#[derive(Debug, Clone)]
pub struct Interface {
    items: Vec<AbiItem>,
}

impl Interface {
    pub fn from_json(raw: &str) -> Result<Self, AbiError> {
        Ok(Self { items: serde_json::from_str(raw)? })
    }

    pub fn constructor(&self) -> Option<&AbiItem> {
        self.items.iter().find(|item| item.kind == "constructor")
    }

    /// The constructor's parameter list; a missing constructor means an
    /// implicit zero-argument one.
    pub fn constructor_inputs(&self) -> &[AbiParam] {
        self.constructor().map(|item| item.inputs.as_slice()).unwrap_or(&[])
    }

    pub fn function(&self, name: &str) -> Option<&AbiItem> {
        self.items
            .iter()
            .find(|item| item.kind == "function" && item.name.as_deref() == Some(name))
    }
}

/// A resolved, encodable argument value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbiValue {
    Address(Address),
    Uint(U256),
    Bool(bool),
}

impl AbiValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            AbiValue::Address(_) => "address",
            AbiValue::Uint(_) => "uint",
            AbiValue::Bool(_) => "bool",
        }
    }

    fn matches(&self, solidity_type: &str) -> bool {
        match self {
            AbiValue::Address(_) => solidity_type == "address",
            AbiValue::Bool(_) => solidity_type == "bool",
            AbiValue::Uint(_) => {
                solidity_type
                    .strip_prefix("uint")
                    .map(|width| width.is_empty() || width.chars().all(|c| c.is_ascii_digit()))
                    .unwrap_or(false)
            }
        }
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            AbiValue::Address(address) => {
                out.extend_from_slice(&[0u8; 12]);
                out.extend_from_slice(address.as_slice());
            }
            AbiValue::Uint(value) => out.extend_from_slice(&value.to_be_bytes::<32>()),
            AbiValue::Bool(value) => {
                out.extend_from_slice(&[0u8; 31]);
                out.push(u8::from(*value));
            }
        }
    }
}

fn encodable(kind: &str) -> bool {
    kind == "address"
        || kind == "bool"
        || kind
            .strip_prefix("uint")
            .map(|width| width.is_empty() || width.chars().all(|c| c.is_ascii_digit()))
            .unwrap_or(false)
}

/// Validates `values` against a parameter list, by arity and then by type.
pub fn check_args(function: &str, inputs: &[AbiParam], values: &[AbiValue]) -> Result<(), AbiError> {
    if inputs.len() != values.len() {
        return Err(AbiError::ArityMismatch {
            function: function.to_string(),
            expected: inputs.len(),
            got: values.len(),
        });
    }

    for (index, (param, value)) in inputs.iter().zip(values).enumerate() {
        if !encodable(&param.kind) {
            return Err(AbiError::UnsupportedType(param.kind.clone()));
        }
        if !value.matches(&param.kind) {
            return Err(AbiError::TypeMismatch {
                function: function.to_string(),
                index,
                expected: param.kind.clone(),
                got: value.kind_name(),
            });
        }
    }

    Ok(())
}

/// ABI-encodes values as a sequence of 32-byte words (no selector), hex
/// without a `0x` prefix so it can be appended straight onto bytecode.
pub fn encode_words(values: &[AbiValue]) -> String {
    let mut out = Vec::with_capacity(values.len() * 32);
    for value in values {
        value.encode_into(&mut out);
    }
    hex::encode(out)
}

/// The 4-byte selector for a function, from its canonical signature.
pub fn selector(name: &str, inputs: &[AbiParam]) -> [u8; 4] {
    let signature = format!(
        "{name}({})",
        inputs.iter().map(|p| p.kind.as_str()).collect::<Vec<_>>().join(",")
    );
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Full `0x`-prefixed calldata for invoking `item` with `values`.
pub fn encode_call(item: &AbiItem, values: &[AbiValue]) -> Result<String, AbiError> {
    let name = item.name.as_deref().ok_or_else(|| AbiError::NoSuchFunction(String::new()))?;
    check_args(name, &item.inputs, values)?;
    Ok(format!("0x{}{}", hex::encode(selector(name, &item.inputs)), encode_words(values)))
}
