pub mod inputs;
pub mod normalize;

pub use inputs::{FinancingTerms, ProjectInputs, ProjectParameters};
pub use normalize::{normalize, NormalizedParameters};
