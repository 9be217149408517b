// Frame domain: pixel buffers and the mirror transform.

pub mod mirror;
pub mod types;
