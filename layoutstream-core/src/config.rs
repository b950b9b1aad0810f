use crate::error::{LayoutError, Result};
use serde::{Deserialize, Serialize};

// Default value functions for serde
fn default_eps() -> f64 {
    50.0
}

fn default_min_samples() -> usize {
    2
}

fn default_y_tolerance() -> f64 {
    5.0
}

fn default_images_dir() -> String {
    "images".to_string()
}

fn default_content_file() -> String {
    "document_content.json".to_string()
}

fn default_summary_file() -> String {
    "summary.json".to_string()
}

fn default_jpeg_quality() -> u8 {
    90
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Figure grouping of graphic fragments
    #[serde(default)]
    pub clustering: ClusterConfig,
    /// Row bucketing for reading order
    #[serde(default)]
    pub reading_order: ReadingOrderConfig,
    /// Output file layout
    #[serde(default)]
    pub output: OutputConfig,
    /// What to do when a page raster cannot be produced
    #[serde(default)]
    pub missing_bitmap: MissingBitmapPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Neighborhood radius in page coordinate units
    #[serde(default = "default_eps")]
    pub eps: f64,
    /// Minimum points (including the point itself) within `eps` to seed a cluster
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
    /// How fragments that belong to no dense region become figures
    #[serde(default)]
    pub noise_policy: NoisePolicy,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            eps: default_eps(),
            min_samples: default_min_samples(),
            noise_policy: NoisePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoisePolicy {
    /// Every noise fragment becomes its own figure
    #[default]
    Singleton,
    /// All noise fragments on a page are enveloped into one figure
    Merged,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingOrderConfig {
    /// Vertical distance (points) within which elements share a row
    #[serde(default = "default_y_tolerance")]
    pub y_tolerance: f64,
}

impl Default for ReadingOrderConfig {
    fn default() -> Self {
        Self {
            y_tolerance: default_y_tolerance(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory (relative to the document output dir) receiving crops
    #[serde(default = "default_images_dir")]
    pub images_dir: String,
    /// Ordered page records, relative to the document output dir
    #[serde(default = "default_content_file")]
    pub content_file: String,
    #[serde(default = "default_summary_file")]
    pub summary_file: String,
    /// JPEG quality for saved crops (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// Write a run summary next to the content file
    #[serde(default)]
    pub write_summary: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            images_dir: default_images_dir(),
            content_file: default_content_file(),
            summary_file: default_summary_file(),
            jpeg_quality: default_jpeg_quality(),
            write_summary: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingBitmapPolicy {
    /// Abort the run
    #[default]
    Fail,
    /// Keep the page's text and drop its figures and tables
    TextOnly,
}

impl LayoutConfig {
    /// Load config from a YAML file and validate it
    pub fn load_from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: LayoutConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config with fallback to default
    pub fn load_with_fallback(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                log::warn!("Failed to load config from {p} ({e}), using defaults");
                Self::default()
            }),
            None => Self::default(),
        }
    }

    /// Effective config rendered as YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.clustering.validate()?;
        self.reading_order.validate()?;
        if !(1..=100).contains(&self.output.jpeg_quality) {
            return Err(LayoutError::InvalidConfig(format!(
                "jpeg_quality must be in 1..=100, got {}",
                self.output.jpeg_quality
            )));
        }
        if self.output.images_dir.trim().is_empty() || self.output.content_file.trim().is_empty() {
            return Err(LayoutError::InvalidConfig(
                "images_dir and content_file must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl ClusterConfig {
    pub fn new(eps: f64, min_samples: usize) -> Self {
        Self {
            eps,
            min_samples,
            noise_policy: NoisePolicy::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.eps.is_finite() || self.eps < 0.0 {
            return Err(LayoutError::InvalidConfig(format!(
                "eps must be a finite non-negative number, got {}",
                self.eps
            )));
        }
        if self.min_samples == 0 {
            return Err(LayoutError::InvalidConfig(
                "min_samples must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl ReadingOrderConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.y_tolerance.is_finite() || self.y_tolerance <= 0.0 {
            return Err(LayoutError::InvalidConfig(format!(
                "y_tolerance must be a finite positive number, got {}",
                self.y_tolerance
            )));
        }
        Ok(())
    }
}
