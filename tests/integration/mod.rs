//! Integration tests that exercise the library through its public API

// Parameter graph tests
mod parameter_graph;

// Constraint engine tests
mod constraints;

// Experiment data handling tests
mod experiment_data;

// Fit orchestration tests
mod fitting;

// Configuration and diagnostics tests
mod configuration;
