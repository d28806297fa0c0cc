//! flowline-core
//!
//! Core building blocks of the Flowline process engine: business
//! processes defined as DAGs of tasks, executed by humans over chat.
//! A run advances as team members claim and complete task executions;
//! completing a final task terminates the run.
//!
//! # Module layout
//! - **domain**: entities, strongly-typed ids, statuses, error kinds
//! - **graph**: prerequisite graph validation and ordering
//! - **ports**: trait seams (stores, notifier, clock, id generation)
//! - **engine**: authoring, teams, execution managers, dispatch
//! - **impls**: in-memory adapters for development and tests
//! - **observability**: status views

pub mod domain;
pub mod engine;
pub mod graph;
pub mod impls;
pub mod observability;
pub mod ports;

pub use domain::FlowlineError;
pub use engine::Engine;
pub use graph::TaskGraph;
