//! Markdown scanning used to feed the engine.

pub mod region_extractor;

pub use region_extractor::RegionExtractor;
