//! GitHub Actions workflow-dispatch client.
//!
//! This module provides [`GithubDispatchClient`], the
//! [`DispatchClient`](kbuilder_core::dispatch::DispatchClient) implementation
//! that triggers the kernel build workflow through the GitHub REST API.

pub mod client;
pub mod types;

pub use client::GithubDispatchClient;
