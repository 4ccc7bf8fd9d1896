use crate::error::TrailSheetError;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// A summit from the peaks list (`Peak,Elevation,LAT,LNG`).
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Peak {
    #[serde(rename = "Peak")]
    pub name: String,
    /// Elevation in feet, as written in the file
    #[serde(rename = "Elevation")]
    pub elevation: String,
    #[serde(rename = "LAT")]
    pub latitude: f64,
    #[serde(rename = "LNG")]
    pub longitude: f64,
}

impl Peak {
    pub fn tooltip(&self) -> String {
        format!("{} ({} ft)", self.name, self.elevation)
    }
}

pub fn read_peaks<R: Read>(reader: R) -> Result<Vec<Peak>, TrailSheetError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut peaks = Vec::new();
    for record in reader.deserialize() {
        peaks.push(record?);
    }
    Ok(peaks)
}

/// Reads the peaks file; the handle is closed before returning.
pub fn load_peaks<P: AsRef<Path>>(path: P) -> Result<Vec<Peak>, TrailSheetError> {
    let peaks = read_peaks(std::fs::File::open(path.as_ref())?)?;
    debug!(path = %path.as_ref().display(), peaks = peaks.len(), "loaded peaks");
    Ok(peaks)
}
