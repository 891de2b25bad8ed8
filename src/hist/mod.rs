pub mod axis;
pub mod bin;
pub mod histogram;
pub mod output;

pub use axis::Axis;
pub use bin::SumW2;
pub use histogram::{Histogram, HistogramSet, Observable};
pub use output::{Format, output_tree, write_output};
