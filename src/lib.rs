//! Stagewright - Consistency-Checked Dialogue Engine
//!
//! This crate drives a multi-character interactive-fiction game: every
//! conversational turn produces a character line, checks it against persona-
//! and story-consistency rules, and rewrites it when it violates those rules,
//! within a fixed refinement budget.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
