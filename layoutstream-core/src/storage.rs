use crate::error::{LayoutError, Result};
use crate::render::PageBitmap;
use image::codecs::jpeg::JpegEncoder;
use image::ColorType;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Destination for cropped figure and table regions
pub trait ImageStore {
    /// Persist one region under `name`; returns where it went
    fn save(&mut self, name: &str, region: &PageBitmap) -> Result<PathBuf>;

    /// Number of regions saved so far
    fn saved_count(&self) -> usize;
}

/// Writes JPEG files into one per-document images directory
pub struct FileImageStore {
    images_dir: PathBuf,
    jpeg_quality: u8,
    saved: usize,
}

impl FileImageStore {
    /// Creates the directory (idempotently) before anything is written
    pub fn new(images_dir: impl Into<PathBuf>, jpeg_quality: u8) -> Result<Self> {
        let images_dir = images_dir.into();
        fs::create_dir_all(&images_dir).map_err(|e| LayoutError::unwritable(&images_dir, e))?;
        Ok(Self {
            images_dir,
            jpeg_quality,
            saved: 0,
        })
    }

    fn write_jpeg(&self, path: &Path, region: &PageBitmap) -> std::result::Result<(), String> {
        // JPEG has no alpha channel
        let rgb = region.image().to_rgb8();
        let file = fs::File::create(path).map_err(|e| e.to_string())?;
        let mut writer = BufWriter::new(file);
        JpegEncoder::new_with_quality(&mut writer, self.jpeg_quality)
            .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
            .map_err(|e| e.to_string())?;
        writer.flush().map_err(|e| e.to_string())
    }
}

impl ImageStore for FileImageStore {
    fn save(&mut self, name: &str, region: &PageBitmap) -> Result<PathBuf> {
        let path = self.images_dir.join(name);
        self.write_jpeg(&path, region)
            .map_err(|reason| LayoutError::unwritable(&path, reason))?;
        self.saved += 1;
        Ok(path)
    }

    fn saved_count(&self) -> usize {
        self.saved
    }
}

/// A region kept by [`MemoryImageStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRegion {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

/// Keeps region names and sizes in memory; nothing touches the disk
#[derive(Debug, Default)]
pub struct MemoryImageStore {
    regions: Vec<StoredRegion>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn regions(&self) -> &[StoredRegion] {
        &self.regions
    }

    pub fn names(&self) -> Vec<&str> {
        self.regions.iter().map(|r| r.name.as_str()).collect()
    }
}

impl ImageStore for MemoryImageStore {
    fn save(&mut self, name: &str, region: &PageBitmap) -> Result<PathBuf> {
        self.regions.push(StoredRegion {
            name: name.to_string(),
            width: region.width(),
            height: region.height(),
        });
        Ok(PathBuf::from(name))
    }

    fn saved_count(&self) -> usize {
        self.regions.len()
    }
}
