//! OCR engines and their lifecycle.
//!
//! An engine is acquired from an [`OcrEngineProvider`] for a single
//! extraction and released through an [`OcrSession`], which terminates the
//! engine when it goes out of scope whatever the outcome of recognition.

mod preprocessing;
#[cfg(feature = "native")]
mod pure_engine;

pub use preprocessing::ImagePreprocessor;
#[cfg(feature = "native")]
pub use pure_engine::{PureOcrEngine, PureOcrProvider};

use std::cmp::Ordering;

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::OcrError;

/// Text recognized from one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recognition {
    /// Recognized lines in reading order, joined with newlines.
    pub text: String,

    /// Overall confidence on a 0-100 scale, if the engine reports one.
    pub confidence: Option<f32>,
}

/// A recognition engine.
pub trait OcrEngine {
    /// Recognize the text of a prepared image.
    fn recognize(&mut self, image: &DynamicImage) -> Result<Recognition, OcrError>;

    /// Release engine resources. Called exactly once by [`OcrSession`].
    fn terminate(&mut self) {}
}

/// Source of OCR engines, one per extraction.
pub trait OcrEngineProvider: Send + Sync {
    type Engine: OcrEngine;

    /// Create a fresh engine.
    fn acquire(&self) -> Result<Self::Engine, OcrError>;
}

/// Scoped use of an engine, terminated on drop.
pub struct OcrSession<E: OcrEngine> {
    engine: E,
}

impl<E: OcrEngine> OcrSession<E> {
    /// Acquire an engine from a provider.
    pub fn open<P>(provider: &P) -> Result<Self, OcrError>
    where
        P: OcrEngineProvider<Engine = E>,
    {
        let engine = provider.acquire()?;
        debug!("OCR engine acquired");
        Ok(Self { engine })
    }

    pub fn recognize(&mut self, image: &DynamicImage) -> Result<Recognition, OcrError> {
        self.engine.recognize(image)
    }
}

impl<E: OcrEngine> Drop for OcrSession<E> {
    fn drop(&mut self) {
        self.engine.terminate();
        debug!("OCR engine terminated");
    }
}

/// Provider for builds and callers without OCR.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledOcr;

/// Engine type of [`DisabledOcr`]; never constructed.
#[derive(Debug)]
pub enum NoEngine {}

impl OcrEngine for NoEngine {
    fn recognize(&mut self, _image: &DynamicImage) -> Result<Recognition, OcrError> {
        match *self {}
    }
}

impl OcrEngineProvider for DisabledOcr {
    type Engine = NoEngine;

    fn acquire(&self) -> Result<NoEngine, OcrError> {
        Err(OcrError::Unavailable(
            "OCR is disabled for this pipeline".to_string(),
        ))
    }
}

/// A recognized text region with its quadrilateral.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextRegion {
    /// Corner coordinates (x1, y1, x2, y2, x3, y3, x4, y4).
    pub bbox: [f32; 8],

    /// Recognized text content.
    pub text: String,

    /// Recognition confidence (0.0 - 1.0).
    pub confidence: f32,
}

impl TextRegion {
    /// Get the axis-aligned bounding rectangle.
    pub fn rect(&self) -> (f32, f32, f32, f32) {
        let xs = [self.bbox[0], self.bbox[2], self.bbox[4], self.bbox[6]];
        let ys = [self.bbox[1], self.bbox[3], self.bbox[5], self.bbox[7]];

        let min_x = xs.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_x = xs.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let min_y = ys.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_y = ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max);

        (min_x, min_y, max_x, max_y)
    }

    fn center_y(&self) -> f32 {
        let (_, min_y, _, max_y) = self.rect();
        (min_y + max_y) / 2.0
    }

    fn height(&self) -> f32 {
        let (_, min_y, _, max_y) = self.rect();
        max_y - min_y
    }
}

/// Regions printed on one line, left to right.
#[derive(Debug, Default)]
struct Row {
    regions: Vec<TextRegion>,
    center_sum: f32,
    height: f32,
}

impl Row {
    fn center_y(&self) -> f32 {
        self.center_sum / self.regions.len() as f32
    }

    /// A region belongs to the row when its vertical center is within half a
    /// line height of the row's mean center.
    fn accepts(&self, region: &TextRegion) -> bool {
        let tolerance = self.height.max(region.height()) / 2.0;
        (region.center_y() - self.center_y()).abs() <= tolerance
    }

    fn push(&mut self, region: TextRegion) {
        self.center_sum += region.center_y();
        self.height = self.height.max(region.height());
        self.regions.push(region);
    }

    fn into_text(mut self) -> String {
        self.regions
            .sort_by(|a, b| a.rect().0.partial_cmp(&b.rect().0).unwrap_or(Ordering::Equal));
        self.regions
            .iter()
            .map(|r| r.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Group regions into printed lines, top to bottom.
fn group_into_rows(mut regions: Vec<TextRegion>) -> Vec<Row> {
    regions.sort_by(|a, b| {
        a.center_y()
            .partial_cmp(&b.center_y())
            .unwrap_or(Ordering::Equal)
    });

    let mut rows: Vec<Row> = Vec::new();
    for region in regions {
        match rows.last_mut() {
            Some(row) if row.accepts(&region) => row.push(region),
            _ => {
                let mut row = Row::default();
                row.push(region);
                rows.push(row);
            }
        }
    }
    rows
}

/// Combine regions into a single recognition.
///
/// Regions on the same printed line are joined with a space in left-to-right
/// order; lines are joined with newlines. Confidence is the mean region
/// confidence scaled to 0-100, or 0 when nothing was recognized.
pub fn merge_regions(regions: Vec<TextRegion>) -> Recognition {
    let confidence = if regions.is_empty() {
        0.0
    } else {
        regions.iter().map(|r| r.confidence).sum::<f32>() / regions.len() as f32 * 100.0
    };

    let rows = group_into_rows(regions);
    debug!("Merged text regions into {} lines", rows.len());

    let text = rows
        .into_iter()
        .map(Row::into_text)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    Recognition {
        text,
        confidence: Some(confidence),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    /// Scripted engine outcome.
    #[derive(Debug, Clone)]
    pub enum Script {
        Text(&'static str, f32),
        Fail,
    }

    /// Provider that counts acquisitions and terminations.
    #[derive(Debug, Clone)]
    pub struct FakeProvider {
        pub script: Script,
        pub acquired: Arc<AtomicUsize>,
        pub terminated: Arc<AtomicUsize>,
    }

    impl FakeProvider {
        pub fn new(script: Script) -> Self {
            Self {
                script,
                acquired: Arc::new(AtomicUsize::new(0)),
                terminated: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn acquired(&self) -> usize {
            self.acquired.load(Ordering::SeqCst)
        }

        pub fn terminated(&self) -> usize {
            self.terminated.load(Ordering::SeqCst)
        }
    }

    pub struct FakeEngine {
        script: Script,
        terminated: Arc<AtomicUsize>,
    }

    impl OcrEngine for FakeEngine {
        fn recognize(&mut self, _image: &DynamicImage) -> Result<Recognition, OcrError> {
            match self.script {
                Script::Text(text, confidence) => Ok(Recognition {
                    text: text.to_string(),
                    confidence: Some(confidence),
                }),
                Script::Fail => Err(OcrError::Recognition("scripted failure".to_string())),
            }
        }

        fn terminate(&mut self) {
            self.terminated.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl OcrEngineProvider for FakeProvider {
        type Engine = FakeEngine;

        fn acquire(&self) -> Result<FakeEngine, OcrError> {
            self.acquired.fetch_add(1, Ordering::SeqCst);
            Ok(FakeEngine {
                script: self.script.clone(),
                terminated: Arc::clone(&self.terminated),
            })
        }
    }
}
