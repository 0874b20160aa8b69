//! Requirement errors with provenance.
//!
//! Errors are plain records. They never abort lowering of sibling
//! requirements, and they only become user-facing text when passed through
//! [`crate::diagnostics::diagnose_requirement_errors`].

use std::fmt;

use genreq_common::SourceLoc;

use crate::requirement::Requirement;
use crate::ty::Ty;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RequirementErrorKind {
    InvalidTypeRequirement,
    ConcreteTypeMismatch,
    ConflictingRequirement,
    RedundantRequirement,
}

/// A problem found while lowering a requirement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequirementError {
    /// `T: C` where `C` is neither protocol-like nor a class.
    InvalidTypeRequirement {
        subject: Ty,
        constraint: Ty,
        loc: SourceLoc,
    },
    /// `A == B` for two concrete types that can never be equal.
    ConcreteTypeMismatch { first: Ty, second: Ty, loc: SourceLoc },
    /// A requirement on a concrete subject that does not hold.
    ConflictingRequirement { requirement: Requirement, loc: SourceLoc },
    /// A requirement on a concrete subject that always holds.
    RedundantRequirement { requirement: Requirement, loc: SourceLoc },
}

impl RequirementError {
    pub fn loc(&self) -> SourceLoc {
        match self {
            RequirementError::InvalidTypeRequirement { loc, .. }
            | RequirementError::ConcreteTypeMismatch { loc, .. }
            | RequirementError::ConflictingRequirement { loc, .. }
            | RequirementError::RedundantRequirement { loc, .. } => *loc,
        }
    }

    pub fn kind(&self) -> RequirementErrorKind {
        match self {
            RequirementError::InvalidTypeRequirement { .. } => {
                RequirementErrorKind::InvalidTypeRequirement
            }
            RequirementError::ConcreteTypeMismatch { .. } => {
                RequirementErrorKind::ConcreteTypeMismatch
            }
            RequirementError::ConflictingRequirement { .. } => {
                RequirementErrorKind::ConflictingRequirement
            }
            RequirementError::RedundantRequirement { .. } => {
                RequirementErrorKind::RedundantRequirement
            }
        }
    }

    /// Whether any type involved failed to resolve. Such errors are
    /// follow-on noise and are never shown.
    pub fn has_error_type(&self) -> bool {
        match self {
            RequirementError::InvalidTypeRequirement { subject, constraint, .. } => {
                subject.has_error() || constraint.has_error()
            }
            RequirementError::ConcreteTypeMismatch { first, second, .. } => {
                first.has_error() || second.has_error()
            }
            RequirementError::ConflictingRequirement { requirement, .. }
            | RequirementError::RedundantRequirement { requirement, .. } => requirement.has_error(),
        }
    }
}

impl fmt::Display for RequirementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequirementError::InvalidTypeRequirement { subject, constraint, .. } => {
                write!(f, "invalid type requirement `{}: {}`", subject, constraint)
            }
            RequirementError::ConcreteTypeMismatch { first, second, .. } => {
                write!(f, "concrete type mismatch `{} == {}`", first, second)
            }
            RequirementError::ConflictingRequirement { requirement, .. } => {
                write!(f, "conflicting requirement `{}`", requirement)
            }
            RequirementError::RedundantRequirement { requirement, .. } => {
                write!(f, "redundant requirement `{}`", requirement)
            }
        }
    }
}

impl std::error::Error for RequirementError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_kind() {
        let err = RequirementError::RedundantRequirement {
            requirement: Requirement::conformance(Ty::int(), Ty::protocol("Hashable")),
            loc: SourceLoc::new(3, 9),
        };
        assert_eq!(err.to_string(), "redundant requirement `Int: Hashable`");
        assert_eq!(err.kind(), RequirementErrorKind::RedundantRequirement);
        assert_eq!(err.loc(), SourceLoc::new(3, 9));
    }

    #[test]
    fn error_type_is_detected() {
        let err = RequirementError::ConcreteTypeMismatch {
            first: Ty::array(Ty::Error),
            second: Ty::int(),
            loc: SourceLoc::INVALID,
        };
        assert!(err.has_error_type());
    }
}
