//! Bytecode linking: substituting library placeholder slots with deployed
//! addresses.
//!
//! The compiler leaves a 40-character slot (`__Name_____…`, the width of a
//! hex-encoded address) wherever a library address belongs. Slots carry
//! either the bare library name or a `path:Name` qualified form, truncated
//! and right-padded with underscores.

use std::collections::BTreeMap;

use alloy_primitives::Address;
use thiserror::Error;

/// Library name to deployed address. Grows as library deployments confirm.
pub type LinkMap = BTreeMap<String, Address>;

/// The width of one placeholder slot: a 20-byte address in hex.
const SLOT_WIDTH: usize = 40;

#[derive(Debug, Error)]
pub enum LinkError {
    /// Only reachable if plan validation was bypassed: the resolver refuses
    /// plans where a library is referenced before its deployment.
    #[error("library `{0}` has no deployed address to link against")]
    UnresolvedLink(String),
    #[error("malformed link placeholder at byte {0} of the bytecode")]
    MalformedPlaceholder(usize),
}

/// Whether any unlinked slot remains.
pub fn has_placeholders(bytecode: &str) -> bool {
    bytecode.contains("__")
}

fn slot_name(slot: &str) -> &str {
    slot.trim_start_matches("__").trim_end_matches('_')
}

fn lookup(links: &LinkMap, name: &str) -> Option<Address> {
    // Exact match first, then the unqualified name of a `path:Name` slot.
    links
        .get(name)
        .or_else(|| name.rsplit(':').next().and_then(|bare| links.get(bare)))
        .copied()
}

/// Replaces every placeholder slot with its library's address.
///
/// All-or-nothing: a slot whose library is absent from `links` fails the
/// whole call, and no partially substituted bytecode escapes. Fully linked
/// input is returned unchanged, so linking is idempotent.
pub fn link(bytecode: &str, links: &LinkMap) -> Result<String, LinkError> {
    let mut out = String::with_capacity(bytecode.len());
    let mut rest = bytecode;
    let mut offset = 0;

    while let Some(pos) = rest.find("__") {
        out.push_str(&rest[..pos]);
        let slot = rest
            .get(pos..pos + SLOT_WIDTH)
            .ok_or(LinkError::MalformedPlaceholder(offset + pos))?;

        let name = slot_name(slot);
        let address =
            lookup(links, name).ok_or_else(|| LinkError::UnresolvedLink(name.to_string()))?;

        out.push_str(&hex::encode(address));
        rest = &rest[pos + SLOT_WIDTH..];
        offset += pos + SLOT_WIDTH;
    }

    out.push_str(rest);
    Ok(out)
}
