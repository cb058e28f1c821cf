//! Dashboard building and rendering.

pub mod dashboard;
pub mod generator;
pub mod plotly;

pub use dashboard::build_dashboard;
pub use generator::{render, write_dashboard};
