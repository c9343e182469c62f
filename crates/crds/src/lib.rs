//! DemoPod CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the DemoPod operator.

pub mod demo_pod;

pub use demo_pod::*;
