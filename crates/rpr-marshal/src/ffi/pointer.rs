//! Tagged pointer strings
//!
//! The scripting side sees native addresses as decorated strings such as
//! `(MediaItem_Take*)0x00000001000000AB`: the C type tag in parentheses, then
//! sixteen uppercase hex digits (bits 63–32, then bits 31–0).
//!
//! Encoding never fails. A malformed string, or one whose tag is not the
//! expected one, becomes the null address so a stale or foreign handle
//! reaches the host as null instead of aborting the caller.

use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

/// Expected tag that accepts any declared tag
pub const VOID_TAG: &str = "void*";

/// Window handle tag (the one tag without a trailing `*`)
pub const HWND_TAG: &str = "HWND";

fn pointer_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\((\w+\*|HWND)\)0x([0-9A-F]{16})$").expect("pointer pattern is valid")
    })
}

/// Split a pointer string into its tag and address, without checking the tag
///
/// ```
/// # use rpr_marshal::ffi::pointer;
/// let (tag, addr) = pointer::parse("(MediaTrack*)0x00000000DEADBEEF").unwrap();
/// assert_eq!(tag, "MediaTrack*");
/// assert_eq!(addr, 0xDEAD_BEEF);
/// ```
pub fn parse(text: &str) -> Option<(&str, u64)> {
    let caps = pointer_pattern().captures(text)?;
    let tag = caps.get(1)?.as_str();
    let digits = caps.get(2)?.as_str();

    let high = u32::from_str_radix(&digits[..8], 16).ok()?;
    let low = u32::from_str_radix(&digits[8..], 16).ok()?;

    Some((tag, (u64::from(high) << 32) | u64::from(low)))
}

/// Encode a pointer string into a native address
///
/// Returns 0 when the string is malformed or when its tag differs from
/// `expected_tag` (unless `expected_tag` is [`VOID_TAG`]).
///
/// ```
/// # use rpr_marshal::ffi::pointer;
/// let s = "(MediaItem_Take*)0x00000001000000AB";
/// assert_eq!(pointer::encode("MediaItem_Take*", s), 0x1_0000_00AB);
/// assert_eq!(pointer::encode("MediaTrack*", s), 0);
/// assert_eq!(pointer::encode("void*", s), 0x1_0000_00AB);
/// ```
pub fn encode(expected_tag: &str, text: &str) -> u64 {
    match parse(text) {
        Some((tag, address)) if tag == expected_tag || expected_tag == VOID_TAG => address,
        Some((tag, _)) => {
            debug!(expected = expected_tag, declared = tag, "pointer tag mismatch, passing null");
            0
        }
        None => {
            debug!(expected = expected_tag, text, "malformed pointer string, passing null");
            0
        }
    }
}

/// Format a native address as a pointer string carrying `tag`
pub fn decode(tag: &str, address: u64) -> String {
    format!("({})0x{:016X}", tag, address)
}
