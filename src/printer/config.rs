//! # Printer Profiles
//!
//! A [`PrinterProfile`] describes the paper and the command dialect of
//! the printer a stream is built for.
//!
//! ## Built-in Profiles
//!
//! | Key | Dialect | Width (dots) | Columns | Raster | Cutter |
//! |-----|---------|--------------|---------|--------|--------|
//! | `tsp650ii` | StarPRNT | 576 | 48 | yes | yes |
//! | `escpos-80` | ESC/POS | 576 | 48 | yes | yes |
//! | `escpos-58` | ESC/POS | 384 | 32 | yes | yes |
//! | `text-only` | ESC/POS | 576 | 48 | no | no |
//!
//! ## Usage
//!
//! ```
//! use recibo::printer::{Dialect, PrinterProfile};
//!
//! let profile = PrinterProfile::parse("escpos-58").unwrap();
//! assert_eq!(profile.dialect, Dialect::EscPos);
//! assert_eq!(profile.width_bytes(), 48);
//! ```

use serde::{Deserialize, Serialize};

/// Command set spoken by the printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// Star Micronics StarPRNT (`ESC GS S` raster)
    StarPrnt,
    /// Epson ESC/POS (`GS v 0` raster)
    EscPos,
}

/// What an endpoint can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Widest image in dots
    pub max_width: u16,
    pub supports_raster: bool,
    pub supports_cut: bool,
}

/// A logical printer offered by a spooler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterEndpoint {
    pub id: String,
    pub display_name: String,
    pub capabilities: Capabilities,
}

/// # Printer Profile
///
/// ```text
/// dots_per_mm = dpi / 25.4
///
/// 80mm paper at 203 DPI:
///   576 dots / 8 dots/mm = 72mm printable
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterProfile {
    /// Human-readable name
    pub name: String,

    /// Printable width in dots
    pub width_dots: u16,

    /// Resolution in dots per inch
    pub dpi: u16,

    pub dialect: Dialect,

    pub capabilities: Capabilities,

    /// Times the whole stream is repeated
    #[serde(default = "one")]
    pub copies: u16,

    /// Characters per line in the default font
    pub chars_per_line: usize,

    /// Maximum rows per raster command (device buffer limit)
    pub max_chunk_rows: u16,
}

fn one() -> u16 {
    1
}

impl PrinterProfile {
    /// Star TSP650II, 80mm paper.
    pub fn tsp650ii() -> Self {
        Self {
            name: "Star TSP650II".into(),
            width_dots: 576,
            dpi: 203,
            dialect: Dialect::StarPrnt,
            capabilities: Capabilities {
                max_width: 576,
                supports_raster: true,
                supports_cut: true,
            },
            copies: 1,
            chars_per_line: 48,
            max_chunk_rows: 256,
        }
    }

    /// Generic ESC/POS printer, 80mm paper.
    pub fn escpos_80() -> Self {
        Self {
            name: "ESC/POS 80mm".into(),
            dialect: Dialect::EscPos,
            ..Self::tsp650ii()
        }
    }

    /// Generic ESC/POS printer, 58mm paper.
    pub fn escpos_58() -> Self {
        Self {
            name: "ESC/POS 58mm".into(),
            width_dots: 384,
            dialect: Dialect::EscPos,
            capabilities: Capabilities {
                max_width: 384,
                supports_raster: true,
                supports_cut: true,
            },
            chars_per_line: 32,
            ..Self::tsp650ii()
        }
    }

    /// A text-mode printer without raster graphics or a cutter.
    pub fn text_only() -> Self {
        Self {
            name: "Text only".into(),
            dialect: Dialect::EscPos,
            capabilities: Capabilities {
                max_width: 576,
                supports_raster: false,
                supports_cut: false,
            },
            ..Self::tsp650ii()
        }
    }

    /// Width in bytes of one raster row.
    #[inline]
    pub fn width_bytes(&self) -> usize {
        (self.width_dots as usize).div_ceil(8)
    }

    #[inline]
    pub fn dots_per_mm(&self) -> f32 {
        self.dpi as f32 / 25.4
    }

    #[inline]
    pub fn mm_to_dots(&self, mm: f32) -> u16 {
        (mm * self.dots_per_mm()).round() as u16
    }

    /// Same profile printing `copies` times.
    pub fn with_copies(mut self, copies: u16) -> Self {
        self.copies = copies;
        self
    }

    /// Narrow this profile to what an endpoint can actually do.
    pub fn restricted_to(&self, caps: &Capabilities) -> Self {
        let mut profile = self.clone();
        profile.capabilities = Capabilities {
            max_width: self.capabilities.max_width.min(caps.max_width),
            supports_raster: self.capabilities.supports_raster && caps.supports_raster,
            supports_cut: self.capabilities.supports_cut && caps.supports_cut,
        };
        profile
    }

    /// Parse a profile string (CLI args or display name).
    ///
    /// Formats:
    /// - a built-in key: `tsp650ii`, `escpos-80`, `escpos-58`, `text-only`
    /// - a built-in display name, e.g. `"Star TSP650II"`
    /// - `escpos:WIDTH` for an ESC/POS printer of custom width
    pub fn parse(s: &str) -> Result<Self, String> {
        if let Some(profile) = Self::built_in().into_iter().find(|(_, p)| p.name == s) {
            return Ok(profile.1);
        }

        match s.trim().to_lowercase().as_str() {
            "tsp650ii" | "star" => Ok(Self::tsp650ii()),
            "escpos-80" | "escpos" => Ok(Self::escpos_80()),
            "escpos-58" => Ok(Self::escpos_58()),
            "text-only" | "text" => Ok(Self::text_only()),
            other if other.starts_with("escpos:") => {
                let dims = &other["escpos:".len()..];
                let width: u16 = dims
                    .parse()
                    .ok()
                    .filter(|w| *w > 0)
                    .ok_or_else(|| format!("Invalid width: {}", dims))?;
                Ok(Self {
                    name: format!("ESC/POS {} dots", width),
                    width_dots: width,
                    capabilities: Capabilities {
                        max_width: width,
                        supports_raster: true,
                        supports_cut: true,
                    },
                    chars_per_line: (width / 12).max(1) as usize,
                    ..Self::escpos_80()
                })
            }
            _ => Err(format!(
                "Unknown profile '{}'. Use one of tsp650ii, escpos-80, escpos-58, text-only or escpos:WIDTH",
                s
            )),
        }
    }

    /// All built-in profiles with their keys.
    pub fn built_in() -> Vec<(&'static str, Self)> {
        vec![
            ("tsp650ii", Self::tsp650ii()),
            ("escpos-80", Self::escpos_80()),
            ("escpos-58", Self::escpos_58()),
            ("text-only", Self::text_only()),
        ]
    }
}

impl Default for PrinterProfile {
    fn default() -> Self {
        Self::tsp650ii()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tsp650ii_dimensions() {
        let profile = PrinterProfile::tsp650ii();
        assert_eq!(profile.width_dots, 576);
        assert_eq!(profile.width_bytes(), 72);
        assert_eq!(profile.dialect, Dialect::StarPrnt);
    }

    #[test]
    fn test_dots_per_mm() {
        let profile = PrinterProfile::default();
        assert!((profile.dots_per_mm() - 8.0).abs() < 0.1);
        assert!((profile.mm_to_dots(10.0) as i32 - 80).abs() < 2);
    }

    #[test]
    fn test_parse_keys_and_names() {
        assert_eq!(PrinterProfile::parse("escpos-58").unwrap().width_dots, 384);
        assert_eq!(
            PrinterProfile::parse("Star TSP650II").unwrap(),
            PrinterProfile::tsp650ii()
        );
        assert!(!PrinterProfile::parse("TEXT-ONLY").unwrap().capabilities.supports_raster);
        assert!(PrinterProfile::parse("laser").is_err());
    }

    #[test]
    fn test_parse_custom_width() {
        let profile = PrinterProfile::parse("escpos:512").unwrap();
        assert_eq!(profile.width_dots, 512);
        assert_eq!(profile.capabilities.max_width, 512);
        assert!(PrinterProfile::parse("escpos:0").is_err());
        assert!(PrinterProfile::parse("escpos:wide").is_err());
    }

    #[test]
    fn test_restricted_to_endpoint() {
        let caps = Capabilities {
            max_width: 384,
            supports_raster: false,
            supports_cut: true,
        };
        let profile = PrinterProfile::tsp650ii().restricted_to(&caps);
        assert_eq!(profile.capabilities.max_width, 384);
        assert!(!profile.capabilities.supports_raster);
        assert!(profile.capabilities.supports_cut);
    }

    #[test]
    fn test_json_defaults_copies() {
        let json = r#"{
            "name": "Kitchen",
            "width_dots": 576,
            "dpi": 203,
            "dialect": "esc_pos",
            "capabilities": { "max_width": 576, "supports_raster": true, "supports_cut": false },
            "chars_per_line": 48,
            "max_chunk_rows": 128
        }"#;
        let profile: PrinterProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.copies, 1);
        assert_eq!(profile.dialect, Dialect::EscPos);
    }
}
