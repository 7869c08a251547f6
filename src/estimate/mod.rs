//! Hyperparameter estimation
//!
//! Gamma comes from the training data alone; C from cross-validation with
//! gamma held fixed.

pub mod folds;
pub mod gamma;
pub mod regularization;

pub use self::folds::*;
pub use self::gamma::*;
pub use self::regularization::*;
