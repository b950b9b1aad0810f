//! Layout sources
//!
//! The boundary between the external PDF / table-detection collaborators and
//! the layout reconstruction core. A source hands over, page by page, the
//! typed geometric primitives and a raster of the page.
//!
//! ## Architecture
//!
//! ```text
//! PDF (interpreted elsewhere)
//!     ↓
//! [LayoutSource]  text blocks, fragments, tables, page raster
//!     ↓
//! [LayoutMerger]  cluster → merge → sort → emit/crop
//!     ↓
//! PageContent records + images/
//! ```
//!
//! ## Available Sources
//!
//! - `ManifestSource` - JSON layout manifest dumped by a PDF front end

pub mod manifest;
pub mod source;

pub use manifest::{LayoutManifest, ManifestSource};
pub use source::LayoutSource;
