//! Application layer orchestrating the ordering workflow.
//!
//! `OrderService` is the entry point for every operation: it validates
//! requests, runs the pricing engine and the status state machine, and turns
//! each write path into one unit of work committed against the order store.

pub mod service;
