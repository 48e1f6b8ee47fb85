pub mod comparison;

pub use comparison::{render_comparison, render_comparison_with, Chart, ChartError, ChartLine};
