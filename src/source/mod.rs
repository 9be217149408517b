// Video source domain: device opening and per-tick frame polling.

pub mod backend;
pub mod dummy;
pub mod frame_buffer;
