use crate::config::{LayoutConfig, MissingBitmapPolicy};
use crate::error::{LayoutError, Result};
use crate::merger::LayoutMerger;
use crate::render::PageRenderer;
use crate::sources::LayoutSource;
use crate::storage::{FileImageStore, ImageStore};
use crate::types::*;
use serde::Serialize;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Pipeline stages timed by [`StageProfiler`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Fetching primitives from the layout source
    Layout,
    /// Clustering and reading-order sort
    Merge,
    /// Loading and resizing the page raster
    Raster,
    /// Cropping regions, writing JPEGs and building the record
    Emit,
    /// Writing the content file (and summary)
    Finish,
}

impl Stage {
    const ALL: [Stage; 5] = [Stage::Layout, Stage::Merge, Stage::Raster, Stage::Emit, Stage::Finish];

    fn label(self) -> &'static str {
        match self {
            Stage::Layout => "layout",
            Stage::Merge => "merge",
            Stage::Raster => "raster",
            Stage::Emit => "emit",
            Stage::Finish => "finish",
        }
    }
}

/// Accumulates wall time per stage over a whole document.
///
/// Disabled profilers run the closures untimed.
pub struct StageProfiler {
    enabled: bool,
    totals: [Duration; 5],
    pages: usize,
}

impl StageProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            totals: [Duration::ZERO; 5],
            pages: 0,
        }
    }

    pub fn time<R>(&mut self, stage: Stage, f: impl FnOnce() -> R) -> R {
        if !self.enabled {
            return f();
        }
        let start = Instant::now();
        let result = f();
        self.totals[stage as usize] += start.elapsed();
        result
    }

    pub fn page_done(&mut self) {
        self.pages += 1;
    }

    pub fn total(&self, stage: Stage) -> Duration {
        self.totals[stage as usize]
    }

    pub fn report(&self) {
        if !self.enabled {
            return;
        }
        let total: Duration = self.totals.iter().sum();
        log::info!("⏱️  {} pages in {:.1}ms", self.pages, total.as_secs_f64() * 1e3);
        for stage in Stage::ALL {
            let spent = self.total(stage);
            let per_page = if self.pages == 0 {
                0.0
            } else {
                spent.as_secs_f64() * 1e3 / self.pages as f64
            };
            log::info!(
                "   {:<8} {:>9.1}ms  ({:.2}ms/page)",
                stage.label(),
                spent.as_secs_f64() * 1e3,
                per_page
            );
        }
    }
}

/// Per-document state: where output goes and what has been produced so far.
///
/// Created once before the first page, finished once after the last.
pub struct DocumentContext {
    output_dir: PathBuf,
    images_dir: PathBuf,
    content_file: PathBuf,
    summary_file: Option<PathBuf>,
    store: Box<dyn ImageStore>,
    records: Vec<PageContent>,
    totals: PageStats,
}

impl DocumentContext {
    /// Create the output and images directories and a JPEG store writing
    /// into the latter.
    pub fn create(output_dir: impl Into<PathBuf>, config: &LayoutConfig) -> Result<Self> {
        let output_dir = output_dir.into();
        let images_dir = output_dir.join(&config.output.images_dir);
        let store = FileImageStore::new(&images_dir, config.output.jpeg_quality)?;
        Self::with_store(output_dir, config, Box::new(store))
    }

    /// Same as [`DocumentContext::create`] with a caller-supplied store
    pub fn with_store(
        output_dir: impl Into<PathBuf>,
        config: &LayoutConfig,
        store: Box<dyn ImageStore>,
    ) -> Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir).map_err(|e| LayoutError::unwritable(&output_dir, e))?;

        Ok(Self {
            images_dir: output_dir.join(&config.output.images_dir),
            content_file: output_dir.join(&config.output.content_file),
            summary_file: config
                .output
                .write_summary
                .then(|| output_dir.join(&config.output.summary_file)),
            output_dir,
            store,
            records: Vec::new(),
            totals: PageStats::default(),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    pub fn store_mut(&mut self) -> &mut dyn ImageStore {
        self.store.as_mut()
    }

    pub fn records(&self) -> &[PageContent] {
        &self.records
    }

    pub fn totals(&self) -> &PageStats {
        &self.totals
    }

    pub fn push(&mut self, record: PageContent, stats: &PageStats) {
        self.totals.accumulate(stats);
        self.records.push(record);
    }

    /// Write the ordered page records (and the summary when configured)
    pub fn finish(self, source_name: &str) -> Result<DocumentSummary> {
        write_json_pretty(&self.content_file, &self.records)?;

        let summary = DocumentSummary {
            source: source_name.to_string(),
            pages: self.records.len(),
            totals: self.totals,
            content_file: self.content_file,
            images_dir: self.images_dir,
            generated_at: chrono::Utc::now(),
        };

        if let Some(summary_file) = &self.summary_file {
            write_json_pretty(summary_file, &summary)?;
        }

        Ok(summary)
    }
}

/// Pretty JSON with four-space indentation; non-ASCII text is kept as is
fn write_json_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let file = fs::File::create(path).map_err(|e| LayoutError::unwritable(path, e))?;
    let mut writer = BufWriter::new(file);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|e| LayoutError::unwritable(path, e))?;
    writer.flush().map_err(|e| LayoutError::unwritable(path, e))
}

/// `<dir of input>/<stem of document name>`, the default output location
pub fn default_output_dir(input_path: &Path, document_name: &str) -> PathBuf {
    let stem = Path::new(document_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("document");
    input_path
        .parent()
        .map(|p| p.join(stem))
        .unwrap_or_else(|| PathBuf::from(stem))
}

/// Runs layout reconstruction over every page of a document, in order
pub struct DocumentProcessor {
    config: LayoutConfig,
}

impl DocumentProcessor {
    pub fn new(config: LayoutConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Reconstruct one page and append its record to the context.
    ///
    /// The page raster is only requested when the page has figures or
    /// tables to crop.
    pub fn process_page(
        &self,
        source: &dyn LayoutSource,
        position: usize,
        ctx: &mut DocumentContext,
    ) -> Result<PageContent> {
        self.process_page_timed(source, position, ctx, &mut StageProfiler::new(false))
    }

    fn process_page_timed(
        &self,
        source: &dyn LayoutSource,
        position: usize,
        ctx: &mut DocumentContext,
        profiler: &mut StageProfiler,
    ) -> Result<PageContent> {
        let layout = profiler.time(Stage::Layout, || source.page_layout(position))?;
        let (index, media_box) = (layout.index, layout.media_box);
        if layout.is_empty() {
            log::debug!("page {index}: no elements");
        }

        let merger = LayoutMerger::new(&self.config);
        let merged = profiler.time(Stage::Merge, || merger.merge_elements(layout))?;

        let bitmap = if merged.needs_bitmap() {
            let rendered = profiler.time(Stage::Raster, || {
                source
                    .page_raster(position)
                    .and_then(|raster| PageRenderer::rasterize(index, raster, media_box))
            });
            match rendered {
                Ok(bitmap) => Some(bitmap),
                Err(LayoutError::MissingBitmap { page, reason })
                    if self.config.missing_bitmap == MissingBitmapPolicy::TextOnly =>
                {
                    log::warn!("page {page}: {reason}; keeping text only");
                    None
                }
                Err(e) => return Err(e),
            }
        } else {
            None
        };

        let (record, stats) = profiler.time(Stage::Emit, || {
            merger.emit_page(merged, bitmap.as_ref(), ctx.store_mut())
        })?;
        profiler.page_done();
        log::info!(
            "page {}: {} figures, {} tables, {} images written",
            record.page,
            stats.figures,
            stats.tables,
            stats.images_written
        );
        ctx.push(record.clone(), &stats);
        Ok(record)
    }

    /// Process every page of `source` into `output_dir` and write the
    /// content file.
    pub fn process_document(
        &self,
        source: &dyn LayoutSource,
        output_dir: &Path,
        enable_profiling: bool,
    ) -> Result<DocumentSummary> {
        let mut profiler = StageProfiler::new(enable_profiling);
        let mut ctx = DocumentContext::create(output_dir, &self.config)?;

        self.process_into(source, &mut ctx, &mut profiler)?;

        let summary = profiler.time(Stage::Finish, || ctx.finish(source.name()))?;
        profiler.report();
        Ok(summary)
    }

    /// Process every page into an existing context, without finishing it
    pub fn process_into(
        &self,
        source: &dyn LayoutSource,
        ctx: &mut DocumentContext,
        profiler: &mut StageProfiler,
    ) -> Result<()> {
        log::info!(
            "📄 Processing {} ({} pages)",
            source.name(),
            source.page_count()
        );
        for position in 0..source.page_count() {
            self.process_page_timed(source, position, ctx, profiler)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_dir_uses_document_stem() {
        let dir = default_output_dir(Path::new("/data/exams/manifest.json"), "biology_2021.pdf");
        assert_eq!(dir, PathBuf::from("/data/exams/biology_2021"));
    }

    #[test]
    fn test_default_output_dir_without_parent() {
        let dir = default_output_dir(Path::new("manifest.json"), "");
        assert_eq!(dir, PathBuf::from("document"));
    }

    #[test]
    fn test_disabled_profiler_records_nothing() {
        let mut profiler = StageProfiler::new(false);
        let value = profiler.time(Stage::Merge, || {
            std::thread::sleep(Duration::from_millis(2));
            42
        });
        assert_eq!(value, 42);
        assert_eq!(profiler.total(Stage::Merge), Duration::ZERO);
    }

    #[test]
    fn test_profiler_accumulates_per_stage() {
        let mut profiler = StageProfiler::new(true);
        for _ in 0..2 {
            profiler.time(Stage::Raster, || std::thread::sleep(Duration::from_millis(2)));
            profiler.page_done();
        }
        assert!(profiler.total(Stage::Raster) >= Duration::from_millis(4));
        assert_eq!(profiler.total(Stage::Emit), Duration::ZERO);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = LayoutConfig::default();
        config.reading_order.y_tolerance = -1.0;
        assert!(DocumentProcessor::new(config).is_err());
    }
}
