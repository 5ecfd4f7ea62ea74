//! Time-boxed request signatures for public/private-key marketplaces.
//!
//! The remote verifier recomputes the same digest inside a coarse 4-digit
//! time window (unix time modulo 10000), so a signature is only valid within
//! the marketplace's tolerance around that window. Callers recompute per
//! request instead of caching.

use sha2::{Digest, Sha512};
use std::time::{SystemTime, UNIX_EPOCH};

/// Joins the signed segments; the verifier treats `|` as reserved, so the
/// canonical query string leaves it unescaped.
const SEGMENT_SEPARATOR: &str = "||";

fn sha512_hex(input: &str) -> String {
    // {:x} renders lowercase, which the verifier expects.
    format!("{:x}", Sha512::digest(input.as_bytes()))
}

fn encode_component(raw: &str) -> String {
    urlencoding::encode(raw).replace("%7C", "|")
}

/// Canonical query string over the pagination parameters. Key order is fixed
/// (`page_nr` first) because the verifier hashes the literal string.
pub fn canonical_query(page_nr: u32, items_per_page: u32) -> String {
    format!(
        "page_nr={}&items_per_page={}",
        encode_component(&page_nr.to_string()),
        encode_component(&items_per_page.to_string())
    )
}

fn time_window(unix_time: u64) -> String {
    format!("{:04}", unix_time % 10_000)
}

/// Deterministic core: signature for an explicit unix timestamp.
pub fn sign_at(
    public_key: &str,
    private_key: &str,
    page_nr: u32,
    items_per_page: u32,
    unix_time: u64,
) -> String {
    let window = time_window(unix_time);
    let to_hash = [
        public_key,
        &sha512_hex(private_key),
        &canonical_query(page_nr, items_per_page),
        &window,
    ]
    .join(SEGMENT_SEPARATOR);
    format!("{window}{}", sha512_hex(&to_hash))
}

/// Signature for the current time window. Always succeeds for well-formed
/// string inputs.
pub fn sign(public_key: &str, private_key: &str, page_nr: u32, items_per_page: u32) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    sign_at(public_key, private_key, page_nr, items_per_page, now)
}
