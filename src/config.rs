//! Run configuration: the expected-tabs map and the input paths of one tracing run.

use crate::error::TrailSheetError;
use indexmap::IndexMap;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Expected tabs file '{0}' lists no tabs")]
    EmptyExpectedTabsError(String),
}

/// Tabs the workbook must contain, each mapped to its guidebook section label.
///
/// Entries keep the order of the configuration file, which is the order used when
/// reporting missing tabs.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct ExpectedTabs {
    entries: IndexMap<String, String>,
}

impl ExpectedTabs {
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut tabs = ExpectedTabs::default();
        for (tab, section) in entries {
            tabs.insert(tab.into(), section.into());
        }
        tabs
    }

    /// Later entries for the same tab replace the label but keep the first position.
    fn insert(&mut self, tab: String, section: String) {
        self.entries.insert(tab, section);
    }

    pub fn from_json_str(json: &str) -> Result<Self, TrailSheetError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_path<P: AsRef<Path>>(path: P) -> Result<Self, TrailSheetError> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let tabs: ExpectedTabs = serde_json::from_reader(reader)?;
        if tabs.is_empty() {
            Err(ConfigError::EmptyExpectedTabsError(path.display().to_string()))?
        }
        Ok(tabs)
    }

    pub fn tab_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Section label configured for a tab.
    pub fn section(&self, tab: &str) -> Option<&str> {
        self.entries.get(tab).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Inputs of one tracing run. Nothing is read from process-wide state.
#[derive(Clone, Debug)]
pub struct TraceConfig {
    pub workbook: PathBuf,
    pub expected_tabs: ExpectedTabs,
    /// GeoJSON trail geometry exported from the trails shapefile
    pub geometry: PathBuf,
    pub peaks: Option<PathBuf>,
}
