//! String masking and the unmasked-customer policy.

pub mod policy;

pub use policy::MaskingPolicy;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Returned in place of the input when the mode is not recognised.
pub const MASK_ERROR_SENTINEL: &str = "XXERRORXX";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskMode {
    /// Keep the first `n` characters.
    First,
    /// Keep the last `n` characters.
    Last,
    /// Exactly `n` mask characters, whatever the input length.
    Fixed,
}

impl MaskMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaskMode::First => "first",
            MaskMode::Last => "last",
            MaskMode::Fixed => "fixed",
        }
    }
}

impl fmt::Display for MaskMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MaskMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(MaskMode::First),
            "last" => Ok(MaskMode::Last),
            "fixed" => Ok(MaskMode::Fixed),
            other => Err(format!("unknown mask mode '{}'", other)),
        }
    }
}

/// Masks `s` according to `mode`, a mode name as accepted by [`MaskMode`].
///
/// Unknown modes yield [`MASK_ERROR_SENTINEL`].
pub fn mask(s: &str, mask_char: &str, mode: &str, n: usize) -> String {
    match mode.parse::<MaskMode>() {
        Ok(mode) => mask_with(s, mask_char, mode, n),
        Err(_) => MASK_ERROR_SENTINEL.to_string(),
    }
}

pub fn mask_with(s: &str, mask_char: &str, mode: MaskMode, n: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    let kept = n.min(chars.len());
    let masked = mask_char.repeat(chars.len() - kept);

    match mode {
        MaskMode::First => {
            let head: String = chars[..kept].iter().collect();
            head + &masked
        }
        MaskMode::Last => {
            let tail: String = chars[chars.len() - kept..].iter().collect();
            masked + &tail
        }
        MaskMode::Fixed => mask_char.repeat(n),
    }
}

/// Applies [`mask`] with the same parameters to every value of `values`.
pub fn mask_map(
    values: &HashMap<String, String>,
    mask_char: &str,
    mode: &str,
    n: usize,
) -> HashMap<String, String> {
    values
        .iter()
        .map(|(key, value)| (key.clone(), mask(value, mask_char, mode, n)))
        .collect()
}
