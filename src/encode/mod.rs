//! Visual encoding transformers -- domain entities to render-ready models.
//!
//! Pure functions only: no network access, no shared state, idempotent for
//! identical input. The output structs serialize in the camelCase shape the
//! charting backend consumes; everything a renderer needs (symbol, size,
//! color, lane) is precomputed here so the backend stays a dumb drawing
//! surface.

pub mod features;
pub mod graph;
pub mod timeline;

pub use features::{rank_features, ImpactBand, ImpactDirection, RankedFeature};
pub use graph::{encode_graph, GraphEdge, GraphModel, GraphNode};
pub use timeline::{encode_timeline, TimelinePoint, SOURCE_LANES};

/// Severity band colors shared across charts.
pub const COLOR_HIGH: &str = "#ff4d4f";
pub const COLOR_MEDIUM: &str = "#faad14";
pub const COLOR_LOW: &str = "#52c41a";
/// Accent blue, also the fallback node color.
pub const COLOR_ACCENT: &str = "#1890ff";
/// Green used for "contributes toward normal" framing in legends.
pub const COLOR_NORMAL: &str = "#52c41a";
