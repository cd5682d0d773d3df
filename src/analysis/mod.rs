/// Water and flood analysis over platform expressions.
///
/// Submodules:
/// - `water` - MNDWI-style index composites and thresholded water masks.
/// - `flood` - pre/post composition into the flood extent.
///
/// Both only build expressions; evaluation happens on the platform.

pub mod flood;
pub mod water;
