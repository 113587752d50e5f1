//! janitor-core
//!
//! Recurring deletion of stored attachments past a retention threshold.
//!
//! # Module layout
//! - **domain**: value types (ScheduleSpec, CleanupReport, states, errors)
//! - **ports**: seams to the external collaborators (AttachmentStore, Clock,
//!   ReportSink)
//! - **app**: scheduling/execution logic (deadline math, RetentionExecutor,
//!   JobCoordinator)
//! - **impls**: in-memory port implementations for development and tests

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;
