//! Core library for the `sockstress` CLI.
//!
//! This crate provides the building blocks used by the binary: CLI argument
//! types, configuration loading, the concurrent connection driver (workers,
//! scheduler and sample sink), the echo peer and report assembly. The primary
//! user-facing interface is the `sockstress` command-line application; library
//! APIs may evolve as the CLI grows.
pub mod args;
pub mod config;
pub mod domain;
pub mod echo;
pub mod error;
pub mod report;
pub mod runtime;
pub mod samples;
pub mod shutdown;
