//! Shared utilities: filesystem walks, content digests and test fixtures.

pub mod fs;
pub mod hash;

#[cfg(test)]
pub mod testutil;
