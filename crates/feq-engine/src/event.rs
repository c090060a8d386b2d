//! Control-surface event types and persisted-state value naming
//!
//! The persisted-state collaborator sees the equalizer as a flat list of
//! named values (`Band0Cutoff`, `Band2Gain`, `Solo`, ...) that it can store
//! and later replay through the controller in order.

use serde::{Deserialize, Serialize};

use feq_dsp::chain::NUM_BANDS;

/// Which musical parameter of a band an event addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamKind {
    Cutoff,
    Q,
    Gain,
}

impl ParamKind {
    fn suffix(self) -> &'static str {
        match self {
            ParamKind::Cutoff => "Cutoff",
            ParamKind::Q => "Q",
            ParamKind::Gain => "Gain",
        }
    }
}

/// Snapshot key for the solo selection; value is the band index, or -1 for
/// no solo
pub const SOLO_KEY: &str = "Solo";

/// Name of a band parameter in a state snapshot
pub fn param_name(band: usize, kind: ParamKind) -> String {
    format!("Band{band}{}", kind.suffix())
}

/// Name of a band's bypass flag in a state snapshot (value 0 or 1)
pub fn bypass_name(band: usize) -> String {
    format!("Band{band}Bypass")
}

/// A parsed snapshot key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKey {
    Param(usize, ParamKind),
    Bypass(usize),
    Solo,
}

/// Parse a snapshot name back into a key; None for unknown names
pub fn parse_name(name: &str) -> Option<StateKey> {
    if name == SOLO_KEY {
        return Some(StateKey::Solo);
    }
    let rest = name.strip_prefix("Band")?;
    let mut chars = rest.chars();
    let band = chars.next()?.to_digit(10)? as usize;
    if band >= NUM_BANDS {
        return None;
    }
    match chars.as_str() {
        "Cutoff" => Some(StateKey::Param(band, ParamKind::Cutoff)),
        "Q" => Some(StateKey::Param(band, ParamKind::Q)),
        "Gain" => Some(StateKey::Param(band, ParamKind::Gain)),
        "Bypass" => Some(StateKey::Bypass(band)),
        _ => None,
    }
}
