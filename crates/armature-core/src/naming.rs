//! Deterministic name generation for links and joints.
//!
//! Output names must be stable across re-exports of the same assembly:
//! identical inputs yield byte-identical names. Links and joints share
//! one namespace, managed by [`NameRegistry`].

use std::collections::BTreeSet;

/// Maximum length of a derived link name.
const MAX_NAME_LEN: usize = 128;

/// Hex digits of content hash appended to truncated names.
const HASH_LEN: usize = 8;

/// Reduce an arbitrary human label to a lowercase identifier.
///
/// ASCII alphanumerics are kept (lowercased); every other run of
/// characters collapses to a single `_`. Leading and trailing
/// separators are trimmed. May return an empty string.
pub fn sanitize(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut pending_sep = false;
    for c in label.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            pending_sep = false;
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Derive a cluster's canonical link name from its member display names.
///
/// Members are sanitized, deduplicated, sorted, and joined with `_`.
/// Anonymous clusters fall back to `link_<index>`. Names longer than
/// 128 characters are truncated with an 8-hex-digit content hash of the
/// untruncated name appended, preserving uniqueness.
pub fn compose_link_name(members: &[&str], index: usize) -> String {
    let names: BTreeSet<String> = members
        .iter()
        .map(|m| sanitize(m))
        .filter(|s| !s.is_empty())
        .collect();
    if names.is_empty() {
        return format!("link_{index}");
    }
    let joined = names.into_iter().collect::<Vec<_>>().join("_");
    bound_name(joined)
}

/// Enforce the length bound on a derived name.
fn bound_name(name: String) -> String {
    if name.len() <= MAX_NAME_LEN {
        return name;
    }
    let digest = fnv1a(name.as_bytes());
    let folded = (digest >> 32) as u32 ^ digest as u32;
    let mut out = name;
    out.truncate(MAX_NAME_LEN - HASH_LEN - 1);
    out.push('_');
    out.push_str(&format!("{folded:08x}"));
    out
}

/// FNV-1a 64-bit hash.
///
/// Pinned here rather than using the standard hasher so the appended
/// suffix is identical across Rust releases and platforms.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Collision-resolving registry over one shared link/joint namespace.
///
/// Claimed names never repeat: a candidate that is already taken gets
/// a numeric suffix (`_1`, `_2`, ...) counted per candidate, so claim
/// order alone determines the outcome.
#[derive(Debug, Default)]
pub struct NameRegistry {
    used: BTreeSet<String>,
}

impl NameRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `candidate`, suffixing it if taken. Returns the final name.
    pub fn claim(&mut self, candidate: &str) -> String {
        if self.used.insert(candidate.to_string()) {
            return candidate.to_string();
        }
        let mut n = 1usize;
        loop {
            let attempt = format!("{candidate}_{n}");
            if self.used.insert(attempt.clone()) {
                return attempt;
            }
            n += 1;
        }
    }

    /// Whether a name has been claimed.
    pub fn contains(&self, name: &str) -> bool {
        self.used.contains(name)
    }
}
