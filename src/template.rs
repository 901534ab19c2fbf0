//! # Template Configuration
//!
//! A [`TemplateConfig`] decides which optional sections of a receipt get
//! printed. It is plain data supplied by the caller and never mutated by
//! the pipeline.
//!
//! Templates can come from JSON (unknown fields are rejected) or from
//! string-keyed toggles, as stored by a settings screen:
//!
//! ```
//! use recibo::template::TemplateConfig;
//!
//! let cfg = TemplateConfig::from_toggles(
//!     "kiosk",
//!     &[("show_qr", "off"), ("currency", "ZAR"), ("columns", "32")],
//! )
//! .unwrap();
//! assert!(!cfg.show_qr);
//! assert_eq!(cfg.columns, Some(32));
//!
//! assert!(TemplateConfig::from_toggles("bad", &[("show_qrcode", "on")]).is_err());
//! ```

use serde::{Deserialize, Serialize};

use crate::error::RenderError;
use crate::money::Currency;

/// Characters per line when neither the template nor the profile says otherwise
/// (Font A on 72mm paper).
pub const DEFAULT_COLUMNS: usize = 48;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplateConfig {
    pub name: String,
    pub show_policy: bool,
    pub show_qr: bool,
    pub show_points: bool,
    pub show_tagline: bool,
    pub show_category_glyphs: bool,
    /// Overrides the business tagline when set
    pub tagline: Option<String>,
    /// ISO 4217 code, resolved through [`Currency::by_code`]
    pub currency: String,
    /// Key of a logo stored in the printer's NV memory
    pub logo: Option<String>,
    /// Characters per line; `None` means "use the printer profile's value"
    pub columns: Option<usize>,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            name: "standard".into(),
            show_policy: true,
            show_qr: true,
            show_points: true,
            show_tagline: true,
            show_category_glyphs: false,
            tagline: None,
            currency: "USD".into(),
            logo: None,
            columns: None,
        }
    }
}

impl TemplateConfig {
    /// Build a template from string key/value toggles on top of the defaults.
    pub fn from_toggles(name: &str, toggles: &[(&str, &str)]) -> Result<Self, RenderError> {
        let mut cfg = Self {
            name: name.to_string(),
            ..Self::default()
        };

        for &(key, value) in toggles {
            let value = value.trim();
            match key.trim() {
                "show_policy" => cfg.show_policy = parse_flag(key, value)?,
                "show_qr" => cfg.show_qr = parse_flag(key, value)?,
                "show_points" => cfg.show_points = parse_flag(key, value)?,
                "show_tagline" => cfg.show_tagline = parse_flag(key, value)?,
                "show_category_glyphs" => cfg.show_category_glyphs = parse_flag(key, value)?,
                "tagline" => cfg.tagline = non_empty(value),
                "logo" => cfg.logo = non_empty(value),
                "currency" => {
                    Currency::by_code(value)
                        .ok_or_else(|| RenderError::UnknownCurrency(value.to_string()))?;
                    cfg.currency = value.to_uppercase();
                }
                "columns" => {
                    let n: usize = value.parse().map_err(|_| invalid(key, value))?;
                    if n == 0 {
                        return Err(invalid(key, value));
                    }
                    cfg.columns = Some(n);
                }
                other => return Err(RenderError::UnknownToggle(other.to_string())),
            }
        }

        Ok(cfg)
    }

    /// Resolve the currency code.
    pub fn currency(&self) -> Result<Currency, RenderError> {
        Currency::by_code(&self.currency)
            .ok_or_else(|| RenderError::UnknownCurrency(self.currency.clone()))
    }

    /// Same template with `columns` filled in when it was left open.
    pub fn with_default_columns(&self, columns: usize) -> Self {
        let mut cfg = self.clone();
        if cfg.columns.is_none() {
            cfg.columns = Some(columns);
        }
        cfg
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, RenderError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn invalid(key: &str, value: &str) -> RenderError {
    RenderError::InvalidToggle {
        key: key.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_show_everything() {
        let cfg = TemplateConfig::default();
        assert!(cfg.show_policy && cfg.show_qr && cfg.show_points && cfg.show_tagline);
        assert_eq!(cfg.currency().unwrap(), Currency::USD);
    }

    #[test]
    fn test_unknown_toggle_rejected() {
        let err = TemplateConfig::from_toggles("x", &[("show_receipt_art", "yes")]).unwrap_err();
        assert_eq!(err, RenderError::UnknownToggle("show_receipt_art".into()));
    }

    #[test]
    fn test_bad_flag_value_rejected() {
        let err = TemplateConfig::from_toggles("x", &[("show_policy", "maybe")]).unwrap_err();
        assert!(matches!(err, RenderError::InvalidToggle { .. }));
        assert!(TemplateConfig::from_toggles("x", &[("columns", "0")]).is_err());
    }

    #[test]
    fn test_unknown_currency_rejected() {
        let err = TemplateConfig::from_toggles("x", &[("currency", "ABC")]).unwrap_err();
        assert_eq!(err, RenderError::UnknownCurrency("ABC".into()));
    }

    #[test]
    fn test_json_rejects_unknown_fields() {
        let ok: TemplateConfig = serde_json::from_str(r#"{"show_qr": false}"#).unwrap();
        assert!(!ok.show_qr);
        assert!(ok.show_policy);
        assert!(serde_json::from_str::<TemplateConfig>(r#"{"show_qrcode": false}"#).is_err());
    }

    #[test]
    fn test_default_columns_only_fill_gaps() {
        let cfg = TemplateConfig::default().with_default_columns(32);
        assert_eq!(cfg.columns, Some(32));
        let fixed = TemplateConfig {
            columns: Some(40),
            ..Default::default()
        };
        assert_eq!(fixed.with_default_columns(32).columns, Some(40));
    }
}
