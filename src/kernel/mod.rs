//! Kernel functions for mixed-type records
//!
//! Sub-kernels (RBF, linear, Jaccard, univariate) compare one feature or
//! feature group. The inner kernel averages them over a configuration and
//! the aggregate kernel reshapes the average with a single gamma.

pub mod aggregate;
pub mod gram;
pub mod inner;
pub mod jaccard;
pub mod linear;
pub mod rbf;
pub mod traits;
pub mod univariate;

pub use self::aggregate::*;
pub use self::gram::*;
pub use self::inner::*;
pub use self::jaccard::*;
pub use self::linear::*;
pub use self::rbf::*;
pub use self::traits::*;
pub use self::univariate::*;
