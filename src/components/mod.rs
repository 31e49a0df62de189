// src/components/mod.rs

//! Pre-built process shapes for fan-in stages.
//!
//! - [`Concatenator`]: open-arity fan-in, concatenates its inputs in binding
//!   order into one output.
//! - [`summation`] and [`ratio`]: ordinary single-output processes whose
//!   command templates do the arithmetic.

pub mod aggregate;
pub mod concatenator;

pub use aggregate::{RATIO_PRECISION, ratio, summation};
pub use concatenator::Concatenator;
