//! Configuration management
//!
//! Compatible with the app's settings.json format:
//! ```json
//! {
//!   "app": { "demoMode": false, ... },
//!   "dedup": { "lookbackYears": 5 },
//!   "formats": [ { "institution": "...", "dateColumn": "...", ... } ]
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
    #[serde(default)]
    dedup: DedupSettings,
    #[serde(default)]
    formats: Vec<StatementFormat>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default)]
    demo_mode: bool,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DedupSettings {
    #[serde(default = "default_lookback_years")]
    lookback_years: i32,
}

impl Default for DedupSettings {
    fn default() -> Self {
        Self {
            lookback_years: default_lookback_years(),
        }
    }
}

fn default_lookback_years() -> i32 {
    5
}

/// Bucketeer configuration (simplified view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    pub demo_mode: bool,
    /// Partition owner for all store operations
    pub user_id: String,
    /// How many years of partitions the duplicate filter scans,
    /// current year included
    pub lookback_years: i32,
    /// User-supplied statement layouts, appended to the built-in catalog
    pub custom_formats: Vec<StatementFormat>,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            demo_mode: false,
            user_id: "default".to_string(),
            lookback_years: default_lookback_years(),
            custom_formats: Vec::new(),
            _raw_settings: SettingsFile::default(),
        }
    }
}

impl Config {
    /// Load config from the bucketeer directory
    ///
    /// Demo mode can be enabled via:
    /// 1. Settings file (bkt demo on)
    /// 2. Environment variable BUCKETEER_DEMO_MODE (for CI/testing)
    pub fn load(app_dir: &Path) -> Result<Self> {
        let settings_path = app_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content).unwrap_or_default()
        } else {
            SettingsFile::default()
        };

        // Check env var for demo mode override (for CI/testing)
        let demo_mode = match std::env::var("BUCKETEER_DEMO_MODE").ok().as_deref() {
            Some("true" | "1" | "yes" | "TRUE" | "YES") => true,
            Some("false" | "0" | "no" | "FALSE" | "NO") => false,
            _ => raw.app.demo_mode,
        };

        Ok(Self {
            demo_mode,
            user_id: raw
                .app
                .user_id
                .clone()
                .unwrap_or_else(|| "default".to_string()),
            lookback_years: raw.dedup.lookback_years.max(1),
            custom_formats: raw.formats.clone(),
            _raw_settings: raw,
        })
    }

    /// Save config to the bucketeer directory
    /// Preserves other settings that the CLI doesn't manage
    pub fn save(&self, app_dir: &Path) -> Result<()> {
        let settings_path = app_dir.join("settings.json");

        // Load existing settings to preserve fields we don't manage
        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).unwrap_or_default()
        } else {
            SettingsFile::default()
        };

        // Update only the fields we manage
        settings.app.demo_mode = self.demo_mode;
        settings.app.user_id = Some(self.user_id.clone());
        settings.dedup.lookback_years = self.lookback_years;
        settings.formats = self.custom_formats.clone();

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }

    /// Enable demo mode
    pub fn enable_demo_mode(&mut self) {
        self.demo_mode = true;
    }

    /// Disable demo mode
    pub fn disable_demo_mode(&mut self) {
        self.demo_mode = false;
    }
}

/// One known statement layout: which columns carry which role
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementFormat {
    pub institution: String,
    pub date_column: String,
    pub description_column: String,
    pub amount_column: String,
    #[serde(default)]
    pub raw_description_column: Option<String>,
}

impl StatementFormat {
    pub fn new(
        institution: &str,
        date_column: &str,
        description_column: &str,
        amount_column: &str,
    ) -> Self {
        Self {
            institution: institution.to_string(),
            date_column: date_column.to_string(),
            description_column: description_column.to_string(),
            amount_column: amount_column.to_string(),
            raw_description_column: None,
        }
    }

    pub fn with_raw_description(mut self, column: &str) -> Self {
        self.raw_description_column = Some(column.to_string());
        self
    }
}

/// Column roles resolved against one concrete file's headers.
///
/// Values are the actual header strings (original casing) so rows can be
/// addressed directly. Immutable once detected for a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    pub date_column: String,
    pub description_column: String,
    pub amount_column: String,
    #[serde(default)]
    pub raw_description_column: Option<String>,
}

/// Built-in statement layouts.
///
/// Order matters: institution-specific entries come before the generic
/// ones, and score ties resolve to the first entry listed.
pub fn builtin_formats() -> Vec<StatementFormat> {
    vec![
        StatementFormat::new("Chase Bank", "Transaction Date", "Description", "Amount"),
        StatementFormat::new("Bank of America", "Date", "Description", "Amount"),
        StatementFormat::new("Citibank", "Date", "Description", "Debit"),
        StatementFormat::new("Wells Fargo", "Date", "Description", "Amount"),
        StatementFormat::new(
            "Capital One",
            "Transaction Date",
            "Description",
            "Transaction Amount",
        ),
        StatementFormat::new("American Express", "Date", "Description", "Amount"),
        StatementFormat::new("US Bank", "Date", "Description", "Amount"),
        StatementFormat::new("PNC Bank", "Date", "Description", "Withdrawals"),
        StatementFormat::new("TD Bank", "Date", "Description", "Amount"),
        StatementFormat::new("Monarch/Generic", "Date", "Merchant", "Amount")
            .with_raw_description("Original Statement"),
        StatementFormat::new("Generic CSV", "Date", "Description", "Amount"),
    ]
}
