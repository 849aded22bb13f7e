#![allow(missing_docs)]

mod catalog;
mod config;
mod pipeline;
