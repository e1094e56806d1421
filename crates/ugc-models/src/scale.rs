//! Upscale factor resolution.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Smallest accepted upscale factor.
pub const MIN_SCALE: u32 = 1;
/// Largest accepted upscale factor.
pub const MAX_SCALE: u32 = 4;
/// Factor used when the client sends nothing usable.
pub const DEFAULT_SCALE: u32 = 2;

/// Integer upscale factor, always within `[MIN_SCALE, MAX_SCALE]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ScaleFactor(u32);

impl ScaleFactor {
    /// Clamp an arbitrary integer into the accepted range.
    pub fn clamped(value: u32) -> Self {
        Self(value.clamp(MIN_SCALE, MAX_SCALE))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for ScaleFactor {
    fn default() -> Self {
        Self(DEFAULT_SCALE)
    }
}

impl std::fmt::Display for ScaleFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resolve the `scale` form field into a usable factor.
///
/// Lenient on purpose: a missing or non-numeric value falls back to the
/// default, and out-of-range values are clamped rather than rejected. The
/// leading digits of strings like `"3x"` still parse, matching the
/// permissive integer parse the endpoint has always had.
pub fn resolve_scale(raw: Option<&str>) -> ScaleFactor {
    let parsed = raw.map(str::trim).and_then(parse_leading_int);

    match parsed {
        Some(value) => {
            ScaleFactor::clamped(value.clamp(MIN_SCALE as i64, MAX_SCALE as i64) as u32)
        }
        None => ScaleFactor::default(),
    }
}

/// Parse an optionally signed leading integer, `parseInt`-style. Negatives
/// are well-formed numbers; they clamp to `MIN_SCALE` rather than default.
fn parse_leading_int(s: &str) -> Option<i64> {
    let (sign, rest) = match s.strip_prefix('-') {
        Some(rest) => (-1i64, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    // Saturate on overflow so absurd inputs still clamp to the range edge.
    Some(sign * digits.parse::<i64>().unwrap_or(i64::MAX))
}
