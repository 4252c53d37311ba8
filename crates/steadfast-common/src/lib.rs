//! # Steadfast Common
//!
//! Common types, utilities, and shared abstractions for Steadfast.
//!
//! This crate provides foundational types used across all Steadfast crates:
//! - ID types (UserId, EventId)
//! - Version information for persisted schemas
//! - Framed binary encoding for snapshots
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod frame;
pub mod ids;
pub mod version;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::frame::*;
    pub use crate::ids::*;
    pub use crate::version::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_roundtrip_display() {
        let id = UserId::new("user-42");
        assert_eq!(id.as_str(), "user-42");
        assert_eq!(id.to_string(), "user-42");
    }

    #[test]
    fn test_version_compatibility() {
        let v1 = SchemaVersion::new(1, 0, 0);
        let v2 = SchemaVersion::new(1, 1, 0);
        let v3 = SchemaVersion::new(2, 0, 0);

        // A newer minor reads older data
        assert!(v2.is_compatible_with(&v1));
        // Different major versions are incompatible
        assert!(!v1.is_compatible_with(&v3));
    }

    #[test]
    fn test_version_parse() {
        assert_eq!(SchemaVersion::parse("1.2.3"), Some(SchemaVersion::new(1, 2, 3)));
        assert_eq!(SchemaVersion::parse(" 1.0.0 "), Some(SchemaVersion::new(1, 0, 0)));
        assert_eq!(SchemaVersion::parse("1.0"), None);
        assert_eq!(SchemaVersion::parse("1.0.0.0"), None);
        assert_eq!(SchemaVersion::parse("one.0.0"), None);
    }
}
