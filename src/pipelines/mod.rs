// src/pipelines/mod.rs

//! Ready-made GC/AT ratio pipelines over two DNA segment files.
//!
//! Both variants share the same shape: two independent parameter producers
//! fan out to four character counters, which fan back in through two
//! concatenators, two summations and a final ratio:
//!
//! ```text
//!  p1   p2          producers (one integer each)
//!   |\  /|
//!  gc1 at1 gc2 at2  counters (GC / AT characters per segment)
//!    \   \ /   /
//!   gccat   atcat   concatenators
//!     |       |
//!   gcsum   atsum   summations ({i:in}.sum)
//!      \     /
//!      gcratio      gc / (gc + at)
//! ```
//!
//! Parameters are drawn from an injected [`rand::Rng`], or passed in directly
//! so tests can pin them.

pub mod gc;

pub use gc::{
    PrefixMode, PrefixParams, SEGMENT_FILES, WindowMode, WindowParams, gc_ratio_prefix,
    gc_ratio_window,
};
