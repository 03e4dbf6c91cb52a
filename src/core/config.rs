//! Configuration handling for the cell pipeline.
//!
//! This module provides the per-sample configuration structures, the
//! discovery logic that locates a sample's configuration file by naming
//! convention, and validation of the parsed values. Both YAML and JSON
//! configuration files are supported, selected by file extension.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default image filename used when a configuration omits `image_path`.
const DEFAULT_IMAGE_PATH: &str = "reg001_expr.ome.tiff";

/// Errors that can occur while locating, parsing, or validating a sample
/// configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error indicating that no configuration file was found in a sample directory.
    #[error("no configuration file matching '*config*' found in {dir}")]
    NotFound { dir: PathBuf },

    /// Error indicating that more than one configuration file matched.
    #[error("found {count} configuration files matching '*config*' in {dir}, expected exactly one")]
    Ambiguous { dir: PathBuf, count: usize },

    /// Error indicating an extension the loader cannot parse.
    #[error("unsupported configuration format: {path}")]
    UnsupportedFormat { path: PathBuf },

    /// Error indicating that a configuration file failed to parse.
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Error indicating that fewer than two channels were configured.
    #[error("configuration must list at least two channels, found {found}")]
    TooFewChannels { found: usize },

    /// Error indicating a marker map entry without a usable name.
    #[error("marker entry missing 'name' (or 'marker') key")]
    MarkerMissingName,

    /// IO error while reading the configuration file.
    #[error("io")]
    Io(#[from] std::io::Error),
}

/// A single channel selection: a human-readable name and the 0-based index
/// of the channel along the (resolved) channel axis.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ChannelSpec {
    /// Name of the imaging channel (e.g. a stain or marker name).
    pub name: String,
    /// 0-based channel index as recorded in the sample configuration.
    pub number: usize,
}

/// A marker entry as it appears in configuration files.
///
/// The original datasets are inconsistent here: markers appear as plain
/// strings or as maps keyed by `name` or `marker`. Both forms are accepted.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MarkerEntry {
    /// A bare marker name.
    Plain(String),
    /// A map form carrying the marker name under `name` or `marker`.
    Map {
        name: Option<String>,
        marker: Option<String>,
    },
}

impl MarkerEntry {
    /// Returns the marker name, or a ConfigError if a map entry carries
    /// neither recognised key.
    pub fn name(&self) -> Result<String, ConfigError> {
        match self {
            MarkerEntry::Plain(s) => Ok(s.clone()),
            MarkerEntry::Map { name, marker } => name
                .clone()
                .or_else(|| marker.clone())
                .ok_or(ConfigError::MarkerMissingName),
        }
    }
}

/// The `markers` field: either a list of entries or a single map entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MarkersField {
    /// The usual list form.
    List(Vec<MarkerEntry>),
    /// A single map entry, treated as a one-element list.
    Single(MarkerEntry),
}

impl Default for MarkersField {
    fn default() -> Self {
        MarkersField::List(Vec::new())
    }
}

/// Per-sample pipeline configuration.
///
/// One such file is expected in every sample directory, discovered by the
/// `*config*` naming convention (see [`find_config_file`]).
#[derive(Debug, Clone, Deserialize)]
pub struct SampleConfig {
    /// Image file path, relative to the sample directory.
    #[serde(default = "default_image_path")]
    pub image_path: String,

    /// Whether the segmentation collaborator should run in whole-slide mode.
    #[serde(default = "default_use_wsi")]
    pub use_wsi: bool,

    /// Microns per pixel, forwarded to the annotation collaborator.
    #[serde(rename = "MPP", default)]
    pub mpp: f64,

    /// Ordered channel selections; the first two are the primary (nuclear)
    /// and secondary (membrane) channels used for the composite image.
    #[serde(default)]
    pub channels: Vec<ChannelSpec>,

    /// Marker names forwarded to the annotation collaborator.
    #[serde(default)]
    pub markers: MarkersField,
}

fn default_image_path() -> String {
    DEFAULT_IMAGE_PATH.to_string()
}

fn default_use_wsi() -> bool {
    true
}

impl SampleConfig {
    /// Loads and validates a configuration file, dispatching on extension.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to a `.yaml`, `.yml`, or `.json` configuration file.
    ///
    /// # Returns
    ///
    /// The parsed configuration, or a ConfigError if the file cannot be
    /// read, parsed, or validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let config: SampleConfig = match extension.as_str() {
            "yaml" | "yml" => serde_yaml::from_str(&text).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?,
            "json" => serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?,
            _ => {
                return Err(ConfigError::UnsupportedFormat {
                    path: path.to_path_buf(),
                });
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the parsed configuration.
    ///
    /// # Returns
    ///
    /// Ok if the configuration is usable, or a ConfigError describing the
    /// first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channels.len() < 2 {
            return Err(ConfigError::TooFewChannels {
                found: self.channels.len(),
            });
        }
        // Surface malformed marker entries at load time, not mid-pipeline.
        self.marker_names()?;
        Ok(())
    }

    /// Resolves the configured marker entries to plain names, preserving
    /// order.
    pub fn marker_names(&self) -> Result<Vec<String>, ConfigError> {
        let entries: Vec<&MarkerEntry> = match &self.markers {
            MarkersField::List(list) => list.iter().collect(),
            MarkersField::Single(entry) => vec![entry],
        };
        entries.into_iter().map(MarkerEntry::name).collect()
    }

    /// Returns the primary (nuclear) channel spec.
    pub fn primary_channel(&self) -> &ChannelSpec {
        &self.channels[0]
    }

    /// Returns the secondary (membrane) channel spec.
    pub fn secondary_channel(&self) -> &ChannelSpec {
        &self.channels[1]
    }

    /// Returns the largest channel index requested by this configuration's
    /// first two channels.
    pub fn required_max_index(&self) -> usize {
        self.primary_channel()
            .number
            .max(self.secondary_channel().number)
    }
}

/// Locates the single configuration file inside a sample directory.
///
/// A configuration file is any regular file whose name contains `config`
/// (case-insensitive). Exactly one such file must exist; zero or multiple
/// matches are configuration errors for that sample.
///
/// # Arguments
///
/// * `sample_dir` - The sample directory to search.
///
/// # Returns
///
/// The path of the configuration file, or a ConfigError.
pub fn find_config_file(sample_dir: &Path) -> Result<PathBuf, ConfigError> {
    let mut matches: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(sample_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy().to_ascii_lowercase();
        if name.contains("config") {
            matches.push(entry.path());
        }
    }

    match matches.len() {
        0 => Err(ConfigError::NotFound {
            dir: sample_dir.to_path_buf(),
        }),
        1 => Ok(matches.remove(0)),
        count => Err(ConfigError::Ambiguous {
            dir: sample_dir.to_path_buf(),
            count,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    const YAML_CONFIG: &str = "\
image_path: reg001_expr.ome.tiff
use_wsi: false
MPP: 0.377
channels:
  - name: Hoechst1
    number: 0
  - name: Cytokeratin
    number: 9
markers:
  - CD4
  - CD8
";

    #[test]
    fn parses_yaml_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "config.yaml", YAML_CONFIG);

        let config = SampleConfig::load(&path).unwrap();
        assert_eq!(config.image_path, "reg001_expr.ome.tiff");
        assert!(!config.use_wsi);
        assert_eq!(config.mpp, 0.377);
        assert_eq!(config.primary_channel().name, "Hoechst1");
        assert_eq!(config.secondary_channel().number, 9);
        assert_eq!(config.required_max_index(), 9);
        assert_eq!(config.marker_names().unwrap(), vec!["CD4", "CD8"]);
    }

    #[test]
    fn parses_json_config_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "pipelineConfig.json",
            r#"{
                "channels": [
                    {"name": "DAPI", "number": 0},
                    {"name": "PanCK", "number": 3}
                ],
                "markers": [{"name": "CD45"}, {"marker": "CD20"}]
            }"#,
        );

        let config = SampleConfig::load(&path).unwrap();
        assert_eq!(config.image_path, "reg001_expr.ome.tiff");
        assert!(config.use_wsi);
        assert_eq!(config.mpp, 0.0);
        assert_eq!(config.marker_names().unwrap(), vec!["CD45", "CD20"]);
    }

    #[test]
    fn rejects_single_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "config.yaml",
            "channels:\n  - name: DAPI\n    number: 0\n",
        );

        let err = SampleConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooFewChannels { found: 1 }));
    }

    #[test]
    fn rejects_marker_map_without_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "config.yaml",
            "channels:\n  - name: A\n    number: 0\n  - name: B\n    number: 1\nmarkers:\n  - other_key: x\n",
        );

        let err = SampleConfig::load(&path).unwrap_err();
        // The stray key deserializes into the map form with both names absent.
        assert!(matches!(
            err,
            ConfigError::MarkerMissingName | ConfigError::Parse { .. }
        ));
    }

    #[test]
    fn find_config_requires_exactly_one_match() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_config_file(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));

        write_file(dir.path(), "config.yaml", "");
        let found = find_config_file(dir.path()).unwrap();
        assert_eq!(found.file_name().unwrap(), "config.yaml");

        write_file(dir.path(), "pipelineConfig.json", "{}");
        let err = find_config_file(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Ambiguous { count: 2, .. }));
    }

    #[test]
    fn config_match_is_case_insensitive_and_skips_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("config_backup")).unwrap();
        write_file(dir.path(), "PipelineConfig.json", "{}");

        let found = find_config_file(dir.path()).unwrap();
        assert_eq!(found.file_name().unwrap(), "PipelineConfig.json");
    }
}
