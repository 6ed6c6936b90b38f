//! Affine registration of 3D images by Mattes mutual information.
//!
//! [`AffineRegistration`] seeds a centered affine transform, then minimises
//! negative mutual information with scaled gradient descent. The resulting
//! transform maps fixed physical points into the moving image.

pub mod config;
pub mod error;
pub mod initializer;
pub mod metric;
pub mod optimizer;
pub mod progress;
pub mod registration;
pub mod validation;

pub use config::{InitializationStrategy, LearningRateEstimation, RegistrationConfig, SamplingStrategy};
pub use error::{RegistrationError, Result};
pub use initializer::CenteredTransformInitializer;
pub use optimizer::{OptimizerDiagnostics, StopCondition};
pub use progress::{CancellationToken, ConsoleProgressCallback, HistoryCallback, ProgressCallback, ProgressInfo, ProgressTracker};
pub use registration::{AffineRegistration, RegistrationResult};
pub use validation::ConvergenceMonitor;
