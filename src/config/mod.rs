//! # Configuration Module
//!
//! This module provides the grabber configuration and its validation.

pub mod config;

pub use config::GrabberConfig;
