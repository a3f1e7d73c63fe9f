//! Rubric-driven diagnosis of how well a web page is prepared for AI search.
//!
//! A diagnosis fetches one page, evaluates every rubric item against its markup
//! (optionally consulting a language model), and aggregates the graded items into a
//! scored report.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
