//! # Route Modules

pub mod passes;
