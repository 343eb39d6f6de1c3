//! Cross-cutting helpers that are not specific to any file format.

pub mod parallel;
