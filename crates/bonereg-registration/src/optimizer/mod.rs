//! Optimizer for affine registration.
//!
//! Regular gradient descent on the flat parameter vector, with step scales
//! derived from the physical shift each parameter produces.

pub mod scales;
pub mod gradient_descent;

pub use scales::PhysicalShiftScales;
pub use gradient_descent::{GradientDescentOptimizer, OptimizationResult, OptimizerDiagnostics, StopCondition};
