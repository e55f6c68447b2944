//! Resources managed by the provider.

pub mod project_domain;
