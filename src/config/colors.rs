//! List colors for the rendered timeline.

use std::collections::BTreeMap;

use crate::app::OptionError;

/// Fallback colors, picked by list identifier when the color map has no entry.
///
/// Blue, green, yellow, magenta, cyan, red, then their bright variants.
pub const DEFAULT_PALETTE: [u8; 12] = [4, 2, 3, 5, 6, 1, 12, 10, 11, 13, 14, 9];

/// Resolve the display color of the list with the given identifier.
///
/// An explicit mapping wins; otherwise the identifier rotates through `palette`.
/// An empty palette falls back to color 7 (white).
pub fn assign_color(list_id: u8, color_map: &BTreeMap<u8, u8>, palette: &[u8]) -> u8 {
    if let Some(&code) = color_map.get(&list_id) {
        return code;
    }
    if palette.is_empty() {
        return 7;
    }
    palette[list_id as usize % palette.len()]
}

/// Every terminal color code rendered in its own color, for picking map values.
pub fn color_range() -> String {
    let mut out = String::with_capacity(256 * 16);
    for code in 0..=255u8 {
        out.push_str(&format!("\x1b[38;5;{}m{} \x1b[0m", code, code));
    }
    out.push('\n');
    out
}

/// A parsed `--map-colors` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorMapUpdate {
    /// Empty argument: drop every mapping.
    Clear,
    /// `(list id, Some(color))` sets a mapping, `(list id, None)` removes it.
    Entries(Vec<(u8, Option<u8>)>),
}

impl ColorMapUpdate {
    /// Parse `"1:2,3:4"` (set), `"1:"` (remove) or `""` (clear).
    ///
    /// Colors may be given as codes (0-255) or as one of the sixteen basic
    /// color names, e.g. `"2:cyan"`.
    pub fn parse(s: &str) -> Result<Self, OptionError> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::Clear);
        }

        let invalid = || OptionError::InvalidColorMap(s.to_string());
        let mut entries = Vec::new();
        for pair in s.split(',') {
            let (key, value) = pair.split_once(':').ok_or_else(invalid)?;
            let key = key.trim().parse::<u8>().map_err(|_| invalid())?;
            let value = value.trim();
            if value.is_empty() {
                entries.push((key, None));
            } else {
                let code = parse_color_code(value).ok_or_else(invalid)?;
                entries.push((key, Some(code)));
            }
        }
        Ok(Self::Entries(entries))
    }

    pub fn apply(&self, color_map: &mut BTreeMap<u8, u8>) {
        match self {
            Self::Clear => color_map.clear(),
            Self::Entries(entries) => {
                for (key, value) in entries {
                    match value {
                        Some(code) => {
                            color_map.insert(*key, *code);
                        }
                        None => {
                            color_map.remove(key);
                        }
                    }
                }
            }
        }
    }
}

/// Parse a color code or a basic color name (case-insensitive).
pub fn parse_color_code(s: &str) -> Option<u8> {
    if let Ok(code) = s.parse::<u8>() {
        return Some(code);
    }

    let code = match s.to_lowercase().as_str() {
        "black" => 0,
        "red" => 1,
        "green" => 2,
        "yellow" => 3,
        "blue" => 4,
        "magenta" => 5,
        "cyan" => 6,
        "white" | "gray" | "grey" => 7,
        "darkgray" | "darkgrey" => 8,
        "lightred" => 9,
        "lightgreen" => 10,
        "lightyellow" => 11,
        "lightblue" => 12,
        "lightmagenta" => 13,
        "lightcyan" => 14,
        "lightwhite" => 15,
        _ => return None,
    };
    Some(code)
}
