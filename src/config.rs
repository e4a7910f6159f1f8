use crate::header::DEFAULT_SEPARATOR;
use crate::sanitize::{SanitizeRules, DEFAULT_SEQUENCE_LABEL};
use crate::RenderOptions;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Pipeline settings, read from a JSON file. Every field is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Column dropped as a running sequence number
    pub sequence_label: String,
    /// Extra statistic keywords on top of the built-in set
    pub extra_keywords: Vec<String>,
    /// Joins header levels into column names
    pub header_separator: String,
    pub render: RenderOptions,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            sequence_label: DEFAULT_SEQUENCE_LABEL.to_string(),
            extra_keywords: Vec::new(),
            header_separator: DEFAULT_SEPARATOR.to_string(),
            render: RenderOptions::default(),
        }
    }
}

impl ChartConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: ChartConfig = serde_json::from_str(text).context("Failed to parse chart config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.header_separator.is_empty() {
            bail!("header_separator must not be empty");
        }
        if self.render.width == 0 || self.render.height == 0 {
            bail!(
                "render size must be non-zero (got {}x{})",
                self.render.width,
                self.render.height
            );
        }
        Ok(())
    }

    pub fn sanitize_rules(&self) -> SanitizeRules {
        SanitizeRules {
            sequence_label: self.sequence_label.clone(),
            ..SanitizeRules::default()
        }
        .with_extra_keywords(self.extra_keywords.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OutputFormat;

    #[test]
    fn test_defaults_from_empty_object() {
        let config = ChartConfig::from_json_str("{}").unwrap();
        assert_eq!(config.sequence_label, "序号");
        assert_eq!(config.header_separator, "-");
        assert_eq!(config.render.width, 800);
        assert_eq!(config.render.height, 600);
    }

    #[test]
    fn test_overrides() {
        let config = ChartConfig::from_json_str(
            r#"{"sequence_label": "No.", "extra_keywords": ["sum"], "render": {"width": 400, "type": "svg"}}"#,
        )
        .unwrap();
        assert_eq!(config.render.width, 400);
        assert_eq!(config.render.height, 600);
        assert!(matches!(config.render.format, OutputFormat::Svg));

        let rules = config.sanitize_rules();
        assert!(rules.is_sequence_column("No."));
        assert!(rules.is_stats_text("Sum of all"));
        assert!(rules.is_stats_text("平均值"));
    }

    #[test]
    fn test_validation() {
        assert!(ChartConfig::from_json_str(r#"{"header_separator": ""}"#).is_err());
        assert!(ChartConfig::from_json_str(r#"{"render": {"width": 0}}"#).is_err());
        assert!(ChartConfig::from_json_str(r#"{"sequence_label": 3}"#).is_err());
    }
}
