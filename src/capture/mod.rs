// Capture domain: timers, per-tick sampling and the session lifecycle.

pub mod controller;
pub mod sampler;
pub mod scheduler;
pub mod session;
