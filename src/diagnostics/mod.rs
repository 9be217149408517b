// Diagnostics: sampling statistics for a capture session.

pub mod stats;
