//! Combat event extraction.
//!
//! Turns a delta block of gamelog text into the eight summed event
//! categories consumed by the visualization.

mod rules;
mod totals;

pub use rules::{EventKind, ExtractError, Extractor, Rule, NEUT_DONE_COLOR, NEUT_RECEIVED_COLOR};
pub use totals::{EventTotals, Total};
