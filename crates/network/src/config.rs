/// Maximum distance (world units) between two linked road boundaries before the
/// link is reported as broken.
pub const LINK_DISTANCE_TOLERANCE: f32 = 0.001;

/// Allowed difference between a road's length and the length of its
/// reference-curve sub-range.
pub const LENGTH_TOLERANCE: f32 = 1e-3;

/// Two `s` values closer than this are treated as the same record position.
pub const S_EPSILON: f32 = 1e-4;

/// Arc-length lookup samples per control-point span of a reference curve.
pub const CURVE_SAMPLES_PER_SPAN: usize = 32;

/// Minimum length (world units) a road may shrink to before an edit is
/// considered degenerate.
pub const MIN_ROAD_LENGTH: f32 = 0.01;

/// Number of lanes per side on a road created without an explicit layout.
pub const DEFAULT_LANES_PER_SIDE: usize = 3;

/// Minimum control points a reference curve needs to describe geometry.
pub const MIN_CURVE_POINTS: usize = 2;
