//! SVM solver implementations
//!
//! Binary C-SVC dual solved by Sequential Minimal Optimization with
//! second-order working set selection (Fan, Chen and Lin, 2005).

pub mod smo;

pub use self::smo::*;
