/// Declarative image expressions evaluated by an imagery platform.
///
/// Building an expression never touches the platform; the tree is handed
/// to a `Platform`, which either encodes it for the remote query engine or
/// evaluates it in memory. Builders mirror the platform's fluent API:
///
/// ```text
/// CollectionExpr::load("COPERNICUS/S2_HARMONIZED")
///     .filter_date(range)
///     .filter_bounds(&region)
///     .clip(&region)
///     .mean()
/// ```

use crate::model::DateRange;
use crate::region::Region;

#[derive(Debug, Clone, PartialEq)]
pub enum CollectionExpr {
    /// Every image of a catalog collection.
    Load { id: String },
    /// Images acquired in `[start, end)`.
    FilterDate { source: Box<CollectionExpr>, range: DateRange },
    /// Images whose footprint intersects the region.
    FilterBounds { source: Box<CollectionExpr>, region: Region },
    /// A per-image operation applied to every member.
    Map { source: Box<CollectionExpr>, op: ImageOp },
}

/// Operations that can be mapped over a collection.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageOp {
    /// Masks pixels outside the region.
    Clip(Region),
    /// `(a - b) / (a + b)` as a single band called `name`.
    NormalizedDifference { bands: [String; 2], name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Gt,
    Lt,
}

impl Comparison {
    pub fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            Comparison::Gt => value > threshold,
            Comparison::Lt => value < threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImageExpr {
    /// Per-pixel mean over the unmasked members of a collection.
    Mean(Box<CollectionExpr>),
    /// 1 where the comparison holds, 0 where it does not; masked stays masked.
    Compare { source: Box<ImageExpr>, op: Comparison, threshold: f64 },
    /// Masks pixels whose value is 0.
    SelfMask(Box<ImageExpr>),
    /// Masks pixels where `mask` is masked or 0.
    UpdateMask { source: Box<ImageExpr>, mask: Box<ImageExpr> },
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

impl CollectionExpr {
    pub fn load(id: impl Into<String>) -> Self {
        CollectionExpr::Load { id: id.into() }
    }

    pub fn filter_date(self, range: DateRange) -> Self {
        CollectionExpr::FilterDate { source: Box::new(self), range }
    }

    pub fn filter_bounds(self, region: &Region) -> Self {
        CollectionExpr::FilterBounds { source: Box::new(self), region: region.clone() }
    }

    pub fn clip(self, region: &Region) -> Self {
        CollectionExpr::Map { source: Box::new(self), op: ImageOp::Clip(region.clone()) }
    }

    pub fn normalized_difference(self, band_a: &str, band_b: &str, name: &str) -> Self {
        CollectionExpr::Map {
            source: Box::new(self),
            op: ImageOp::NormalizedDifference {
                bands: [band_a.to_string(), band_b.to_string()],
                name: name.to_string(),
            },
        }
    }

    pub fn mean(self) -> ImageExpr {
        ImageExpr::Mean(Box::new(self))
    }
}

impl ImageExpr {
    pub fn gt(self, threshold: f64) -> Self {
        ImageExpr::Compare { source: Box::new(self), op: Comparison::Gt, threshold }
    }

    pub fn lt(self, threshold: f64) -> Self {
        ImageExpr::Compare { source: Box::new(self), op: Comparison::Lt, threshold }
    }

    pub fn self_mask(self) -> Self {
        ImageExpr::SelfMask(Box::new(self))
    }

    pub fn update_mask(self, mask: ImageExpr) -> Self {
        ImageExpr::UpdateMask { source: Box::new(self), mask: Box::new(mask) }
    }
}
