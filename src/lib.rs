//! Batch code-execution orchestration for a coding-practice platform:
//! engine adapters, batch dispatch and polling, verdict evaluation, and
//! the run/submit service on top.

pub mod batch;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod service;
pub mod store;
pub mod verdict;

#[cfg(test)]
mod integration_test;
