//! Offline audio mixing: a plan built once from the page timeline, rendered
//! faster than real time into the single track the encoder consumes.

pub mod mix;
pub mod plan;

pub use mix::{mix_plan, write_mix_to_f32le_file};
pub use plan::{AudioSegment, MixPlan, build_mix_plan, ms_to_sample};
