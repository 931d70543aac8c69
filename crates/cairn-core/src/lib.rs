//! Core types for the cairn signaling hub: configuration, the wire-frame
//! vocabulary, and peer identifier generation.

pub mod config;
pub mod frame;
pub mod ident;
