//! Structural, visual and document exports of a snapshot.
//!
//! JSON and SVG are produced here. Raster images and PDF pages come from
//! host-supplied backends behind [`Rasterizer`] and [`DocumentComposer`].

use serde::{Deserialize, Serialize};

use crate::model::Snapshot;
use crate::svg::{SvgDocument, SvgRenderer};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Rasterization failed: {0}")]
    Raster(String),
    #[error("Document composition failed: {0}")]
    Document(String),
    #[error("No backend available for {0:?} export")]
    MissingBackend(ExportFormat),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Svg,
    Png,
    Pdf,
}

impl ExportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "svg" => Some(Self::Svg),
            "png" => Some(Self::Png),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Svg => "svg",
            Self::Png => "png",
            Self::Pdf => "pdf",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Svg => "image/svg+xml",
            Self::Png => "image/png",
            Self::Pdf => "application/pdf",
        }
    }
}

/// Bytes ready to be offered as a download.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    pub fn file_name(&self, stem: &str) -> String {
        format!("{}.{}", stem, self.format.extension())
    }

    pub fn mime(&self) -> &'static str {
        self.format.mime()
    }
}

/// Turns the rendered current view into PNG bytes.
pub trait Rasterizer {
    fn rasterize(&self, view: &SvgDocument) -> Result<Vec<u8>, ExportError>;
}

/// Lays a raster image out on document pages.
pub trait DocumentComposer {
    fn compose(&self, png: &[u8], placement: &PagePlacement) -> Result<Vec<u8>, ExportError>;
}

/// Page geometry in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
    pub margin: f64,
}

impl Default for PageSize {
    /// A4 portrait.
    fn default() -> Self {
        Self {
            width: 595.0,
            height: 842.0,
            margin: 36.0,
        }
    }
}

/// The image scaled to the page's content width, cut into pages.
#[derive(Debug, Clone, PartialEq)]
pub struct PagePlacement {
    pub page: PageSize,
    pub scale: f64,
    pub image_width: f64,
    pub image_height: f64,
    /// Vertical offset of the image on each page, in page units.
    pub page_offsets: Vec<f64>,
}

impl PagePlacement {
    pub fn fit_width(page: PageSize, width: f64, height: f64) -> Self {
        let width = if width.is_finite() { width.max(0.0) } else { 0.0 };
        let height = if height.is_finite() { height.max(0.0) } else { 0.0 };
        let content_width = (page.width - page.margin * 2.0).max(1.0);
        let content_height = (page.height - page.margin * 2.0).max(1.0);
        let scale = if width > 0.0 { content_width / width } else { 1.0 };
        let image_height = height * scale;

        let pages = (image_height / content_height).ceil().max(1.0) as usize;
        let page_offsets = (0..pages).map(|i| -(i as f64) * content_height).collect();

        Self {
            page,
            scale,
            image_width: width * scale,
            image_height,
            page_offsets,
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_offsets.len()
    }
}

#[derive(Default, Clone, Copy)]
pub struct ExportBackends<'a> {
    pub rasterizer: Option<&'a dyn Rasterizer>,
    pub composer: Option<&'a dyn DocumentComposer>,
}

/// An export pinned to the snapshot taken when it was requested.
#[derive(Debug, Clone)]
pub struct ExportJob {
    snapshot: Snapshot,
    format: ExportFormat,
    page: PageSize,
}

impl ExportJob {
    pub fn new(snapshot: Snapshot, format: ExportFormat, page: PageSize) -> Self {
        Self {
            snapshot,
            format,
            page,
        }
    }

    pub fn format(&self) -> ExportFormat {
        self.format
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn run(&self, backends: ExportBackends<'_>) -> Result<ExportArtifact, ExportError> {
        let bytes = match self.format {
            ExportFormat::Json => to_json(&self.snapshot)?.into_bytes(),
            ExportFormat::Svg => render_view(&self.snapshot).body.into_bytes(),
            ExportFormat::Png => {
                let rasterizer = backends
                    .rasterizer
                    .ok_or(ExportError::MissingBackend(self.format))?;
                rasterizer.rasterize(&render_view(&self.snapshot))?
            }
            ExportFormat::Pdf => {
                let (Some(rasterizer), Some(composer)) = (backends.rasterizer, backends.composer)
                else {
                    return Err(ExportError::MissingBackend(self.format));
                };
                let view = render_view(&self.snapshot);
                let png = rasterizer.rasterize(&view)?;
                let placement = PagePlacement::fit_width(self.page, view.width, view.height);
                composer.compose(&png, &placement)?
            }
        };

        Ok(ExportArtifact {
            format: self.format,
            bytes,
        })
    }
}

pub fn render_view(snapshot: &Snapshot) -> SvgDocument {
    SvgRenderer::default().render(snapshot)
}

/// Full re-importable snapshot.
pub fn to_json(snapshot: &Snapshot) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

pub fn from_json(json: &str) -> Result<Snapshot, ExportError> {
    Ok(serde_json::from_str(json)?)
}
