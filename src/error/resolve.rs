//! Registry and version resolution errors

use super::BpmError;

/// Creates a package not found error
pub fn package_not_found(name: impl Into<String>, constraint: impl Into<String>) -> BpmError {
    BpmError::PackageNotFound {
        name: name.into(),
        constraint: constraint.into(),
    }
}

/// Creates a constraint conflict error from `requester: constraint` pairs
pub fn constraint_conflict(name: impl Into<String>, requirements: &[String]) -> BpmError {
    BpmError::ConstraintConflict {
        name: name.into(),
        requirements: requirements.join(", "),
    }
}

/// Creates a registry transport error
pub fn transport(name: impl Into<String>, reason: impl Into<String>) -> BpmError {
    BpmError::FetchTransportError {
        name: name.into(),
        reason: reason.into(),
    }
}

/// Creates a registry rejection error
pub fn rejected(name: impl Into<String>, reason: impl Into<String>) -> BpmError {
    BpmError::RegistryRejected {
        name: name.into(),
        reason: reason.into(),
    }
}
