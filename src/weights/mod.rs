pub mod catalog;
pub mod grid;
pub mod reweight;

pub use catalog::WeightCatalog;
pub use reweight::{Reweight, ReweightDef, Reweighter};
