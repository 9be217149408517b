// Render domain: output surfaces and still export.

pub mod dual;
pub mod export;
pub mod surface;
