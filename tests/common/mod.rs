#![allow(dead_code)]

pub mod builders;
pub mod mocks;

pub use builders::{CatalogBuilder, ModelBuilder};
pub use mocks::{CountingProvider, FixedTicks};
