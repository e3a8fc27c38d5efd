//! Vision collaborator types.
//!
//! The inference pipeline lives outside this workspace. What the pipeline
//! core consumes from it is defined here: binary detection masks grouped by
//! class id, fiducial marker positions, and the encoded frames/crops of the
//! two classification cameras.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

// ─── Geometry ───────────────────────────────────────────────────────

/// Image-space point [px].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[inline]
    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Midpoint between `self` and `other`.
    #[inline]
    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

// ─── Masks ──────────────────────────────────────────────────────────

/// Row-major binary mask in camera resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: usize,
    height: usize,
    data: Vec<bool>,
}

impl Mask {
    /// Empty mask of the given size.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![false; width * height],
        }
    }

    /// Mask with pixel `(x, y)` set where `f(x, y)` is true.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> bool) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Mask with the axis-aligned rectangle `[x0, x1) × [y0, y1)` set.
    pub fn from_rect(width: usize, height: usize, x0: usize, y0: usize, x1: usize, y1: usize) -> Self {
        Self::from_fn(width, height, |x, y| x >= x0 && x < x1 && y >= y0 && y < y1)
    }

    /// Mask with a filled disc of `radius` around `(cx, cy)` set.
    pub fn from_disc(width: usize, height: usize, cx: f64, cy: f64, radius: f64) -> Self {
        Self::from_fn(width, height, |x, y| {
            (x as f64 - cx).hypot(y as f64 - cy) <= radius
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Pixel value; out-of-bounds reads as unset.
    #[inline]
    pub fn get(&self, x: isize, y: isize) -> bool {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return false;
        }
        self.data[y as usize * self.width + x as usize]
    }

    /// Number of set pixels.
    pub fn area(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    /// Center of mass of the set pixels, `None` for an empty mask.
    pub fn centroid(&self) -> Option<Point> {
        let (mut sx, mut sy, mut n) = (0.0_f64, 0.0_f64, 0_usize);
        for y in 0..self.height {
            for x in 0..self.width {
                if self.data[y * self.width + x] {
                    sx += x as f64;
                    sy += y as f64;
                    n += 1;
                }
            }
        }
        (n > 0).then(|| Point::new(sx / n as f64, sy / n as f64))
    }

    /// Set pixels with at least one unset 4-neighbour (image border counts as unset).
    pub fn edge_pixels(&self) -> Vec<(usize, usize)> {
        let mut edges = Vec::new();
        for y in 0..self.height {
            for x in 0..self.width {
                if !self.data[y * self.width + x] {
                    continue;
                }
                let (xi, yi) = (x as isize, y as isize);
                if !self.get(xi - 1, yi)
                    || !self.get(xi + 1, yi)
                    || !self.get(xi, yi - 1)
                    || !self.get(xi, yi + 1)
                {
                    edges.push((x, y));
                }
            }
        }
        edges
    }

    /// Square dilation by `radius` pixels (Chebyshev distance).
    ///
    /// Separable: a horizontal then a vertical sliding-window max.
    pub fn dilate(&self, radius: usize) -> Mask {
        if radius == 0 {
            return self.clone();
        }
        let r = radius as isize;
        let mut horizontal = Mask::new(self.width, self.height);
        for y in 0..self.height {
            let mut count = 0_isize;
            // window [x - r, x + r]
            for x in 0..r.min(self.width as isize) {
                count += self.get(x, y as isize) as isize;
            }
            for x in 0..self.width as isize {
                count += self.get(x + r, y as isize) as isize;
                if x - r - 1 >= 0 {
                    count -= self.get(x - r - 1, y as isize) as isize;
                }
                horizontal.data[y * self.width + x as usize] = count > 0;
            }
        }
        let mut out = Mask::new(self.width, self.height);
        for x in 0..self.width {
            let mut count = 0_isize;
            for y in 0..r.min(self.height as isize) {
                count += horizontal.get(x as isize, y) as isize;
            }
            for y in 0..self.height as isize {
                count += horizontal.get(x as isize, y + r) as isize;
                if y - r - 1 >= 0 {
                    count -= horizontal.get(x as isize, y - r - 1) as isize;
                }
                out.data[y as usize * self.width + x] = count > 0;
            }
        }
        out
    }

    /// Fraction of this mask's edge pixels lying within `radius` pixels of
    /// any set pixel of `other`. 0.0 for an empty mask.
    pub fn edge_proximity(&self, other: &Mask, radius: usize) -> f64 {
        let edges = self.edge_pixels();
        if edges.is_empty() {
            return 0.0;
        }
        let grown = other.dilate(radius);
        let near = edges
            .iter()
            .filter(|(x, y)| grown.get(*x as isize, *y as isize))
            .count();
        near as f64 / edges.len() as f64
    }

    /// True if any pixel of `self` is within `radius` pixels of `other`.
    pub fn within_distance(&self, other: &Mask, radius: usize) -> bool {
        let grown = other.dilate(radius);
        (0..self.height).any(|y| {
            (0..self.width).any(|x| self.data[y * self.width + x] && grown.get(x as isize, y as isize))
        })
    }
}

/// One instance detection from the segmentation model.
#[derive(Debug, Clone)]
pub struct DetectedMask {
    pub mask: Mask,
    pub confidence: f32,
    pub class_id: u8,
    pub instance_id: u32,
}

// ─── Feeder camera ──────────────────────────────────────────────────

/// Everything the feeder camera knows at one instant.
#[derive(Debug, Clone, Default)]
pub struct FeederSnapshot {
    /// Detections grouped by class id.
    pub masks: HashMap<u8, Vec<DetectedMask>>,
    /// Fiducial marker centers keyed by marker id.
    pub markers: HashMap<u32, Point>,
}

impl FeederSnapshot {
    /// Detections of `class_id` (empty slice if none).
    pub fn masks_of(&self, class_id: u8) -> &[DetectedMask] {
        self.masks.get(&class_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Add a detection, grouping by its class id.
    pub fn push(&mut self, detection: DetectedMask) {
        self.masks.entry(detection.class_id).or_default().push(detection);
    }

    pub fn marker(&self, id: u32) -> Option<Point> {
        self.markers.get(&id).copied()
    }
}

// ─── Classification cameras ─────────────────────────────────────────

/// JPEG-encoded camera frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraFrame {
    pub jpeg: Vec<u8>,
    /// Annotated rendering (detections drawn), if the pipeline produced one.
    pub annotated_jpeg: Option<Vec<u8>>,
    /// Capture time, milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
}

impl CameraFrame {
    /// Annotated rendering when available, raw otherwise.
    pub fn display_jpeg(&self) -> &[u8] {
        self.annotated_jpeg.as_deref().unwrap_or(&self.jpeg)
    }
}

/// JPEG-encoded crop of the largest qualifying detection.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageCrop {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// A frame pair from the top and bottom classification cameras.
#[derive(Debug, Clone, Default)]
pub struct FramePair {
    pub top: Option<CameraFrame>,
    pub bottom: Option<CameraFrame>,
}

/// Crops extracted from a frame pair.
#[derive(Debug, Clone, Default)]
pub struct CropPair {
    pub top: Option<ImageCrop>,
    pub bottom: Option<ImageCrop>,
}

/// Vision collaborator.
///
/// Shared between the tick thread and background workers, so it must be
/// `Send + Sync`. `capture_fresh_frames` and `classification_crops` may
/// block up to `timeout`; never call them from a state's `step()`.
pub trait VisionSource: Send + Sync {
    /// Latest feeder detections and marker positions.
    fn feeder_snapshot(&self) -> FeederSnapshot;

    /// Wait for a frame pair captured after this call, up to `timeout`,
    /// then fall back to the latest frames available.
    fn capture_fresh_frames(&self, timeout: Duration) -> FramePair;

    /// Largest qualifying object crop per classification camera.
    fn classification_crops(&self, timeout: Duration) -> CropPair;
}
