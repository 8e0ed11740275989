// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 buildflow contributors

//! Task graphs
//!
//! A [`TaskGraph`] is a validated set of named tasks with explicit
//! dependencies; a [`GraphExecutor`] runs it.

mod dag;
mod executor;

pub use dag::{Task, TaskGraph, TaskGraphBuilder, TaskResults};
pub use executor::{Finalizer, GraphExecutor, GraphOutcome, TaskFailure};
