//! Signed review-link tokens
//!
//! Review invitations are plain GET links, so the vote parameters ride in
//! the URL where anyone can edit them. Each link therefore carries an
//! HMAC-SHA256 tag over the (city, reviewer, vote) triple, keyed by a
//! per-installation secret. Changing any of the three fields, or pointing
//! the link at another city, produces a tag mismatch.
//!
//! Tokens do not expire. A link stays valid until the secret is rotated,
//! which invalidates every outstanding link at once.

use crate::db::models::VoteChoice;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Length of a well-formed token: HMAC-SHA256 output as lowercase hex
pub const TOKEN_LEN: usize = 64;

/// Generate the signed token for one (city, reviewer, vote) triple
///
/// The returned string is 64 lowercase hex characters.
pub fn generate_vote_token(
    secret: &str,
    city_id: Uuid,
    reviewer_email: &str,
    vote: VoteChoice,
) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(format!("{}:{}:{}", city_id, reviewer_email, vote.as_str()).as_bytes());

    let tag = mac.finalize().into_bytes();
    tag.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Verify a presented token against the expected (city, reviewer, vote)
/// triple
///
/// Tokens of the wrong length are rejected before any comparison; byte
/// comparison is constant-time so callers cannot probe for near-misses.
pub fn verify_vote_token(
    secret: &str,
    city_id: Uuid,
    reviewer_email: &str,
    vote: VoteChoice,
    presented: &str,
) -> bool {
    if presented.len() != TOKEN_LEN {
        return false;
    }

    let expected = generate_vote_token(secret, city_id, reviewer_email, vote);
    constant_time_eq(expected.as_bytes(), presented.as_bytes())
}

/// Constant-time byte comparison for equal-length slices
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    debug_assert_eq!(a.len(), b.len());

    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

// ============================================================================
// Tests
// ============================================================================
