//! Data loading and dataset implementations

pub mod csv;

pub use self::csv::*;
