//! Outie wellness facts - generation pipeline with an HTTP API
//!
//! This crate provides the backend the quiz frontend calls: it turns a
//! description of someone's innie into five short facts about their Outie.

pub mod api;
pub mod config;
pub mod facts;
