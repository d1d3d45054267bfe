pub mod interpolation;
pub mod task;

pub use interpolation::{interpolate, Inputs, InterpolationError};
pub use task::*;
