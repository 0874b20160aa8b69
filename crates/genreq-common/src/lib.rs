//! Shared source-location plumbing for the generic requirement engine.
//!
//! - [`loc`]: [`SourceLoc`], a byte range that may be invalid
//! - [`line_index`]: [`LineIndex`], on-demand line/column lookup

pub mod line_index;
pub mod loc;

pub use line_index::LineIndex;
pub use loc::SourceLoc;
