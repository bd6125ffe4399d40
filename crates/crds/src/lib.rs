//! Tenant Provisioner CRD Definitions
//!
//! Typed view of the custom resources the tenant provisioner declares.
//! The resources themselves are owned and reconciled by the OpenClaw operator.

pub mod openclaw_instance;

pub use openclaw_instance::*;
