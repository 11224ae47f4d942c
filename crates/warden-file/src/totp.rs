//! RFC 6238 time-based one-time codes (HMAC-SHA1, 30 second step, 6 digits).

use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Seconds per time step.
pub const STEP_SECS: u64 = 30;

/// Digits per code.
pub const DIGITS: u32 = 6;

/// Steps of clock drift accepted on either side of the current one.
const SKEW_STEPS: u64 = 1;

/// Compute the code for `unix_time`.
pub fn generate(secret: &[u8], unix_time: u64) -> Option<String> {
    hotp(secret, unix_time / STEP_SECS).map(format_code)
}

/// Check `code` against the codes for `unix_time` and its neighbouring steps.
pub fn verify(secret: &[u8], code: &str, unix_time: u64) -> bool {
    let code = code.trim();
    if code.len() != DIGITS as usize || !code.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    let counter = unix_time / STEP_SECS;
    (counter.saturating_sub(SKEW_STEPS)..=counter + SKEW_STEPS)
        .filter_map(|c| hotp(secret, c))
        .any(|candidate| format_code(candidate) == code)
}

fn hotp(secret: &[u8], counter: u64) -> Option<u32> {
    let mut mac = HmacSha1::new_from_slice(secret).ok()?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = (u32::from(digest[offset] & 0x7f) << 24)
        | (u32::from(digest[offset + 1]) << 16)
        | (u32::from(digest[offset + 2]) << 8)
        | u32::from(digest[offset + 3]);

    Some(binary % 10u32.pow(DIGITS))
}

fn format_code(value: u32) -> String {
    format!("{:0width$}", value, width = DIGITS as usize)
}
