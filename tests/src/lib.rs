//! Shared setup and fixtures for end-to-end API tests.

pub mod fixtures;
