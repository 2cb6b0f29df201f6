//! Adapters layer: implementations of ports and the HTTP surface.

pub mod ai;
pub mod archive;
pub mod http;
