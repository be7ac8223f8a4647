//! Plot world configuration, plot areas, fragment overlay and the hybrid generator.
#![forbid(unsafe_code)]

pub mod area;
pub mod config;
pub mod generator;
pub mod overlay;

pub use area::{AreaBlocks, HostWorld, PlotArea, PlotAreaManager, Region2};
pub use config::{
    ConfigError, PlotGeometry, PlotWorldConfig, PlotWorldsFile, SchematicSettings, Settings,
};
pub use generator::{ColumnKind, HybridGen, PlotGenerator};
pub use overlay::{
    Anchors, Fragments, Overlay, OverlayError, OverlayHandle, OverlaySummary, build_overlay,
    compute_anchors, pair, unpair,
};
