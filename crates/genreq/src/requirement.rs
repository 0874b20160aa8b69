//! Requirements and their provenance.

use std::fmt;

use genreq_common::SourceLoc;
use serde::Serialize;

use crate::module::Module;
use crate::subst::SubstitutionMap;
use crate::ty::Ty;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum RequirementKind {
    Conformance,
    Superclass,
    Layout,
    SameType,
}

/// A layout constraint, e.g. "must be a class".
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum LayoutConstraint {
    /// `AnyObject`: any class reference.
    Class,
    /// A native (non-foreign) class reference.
    NativeClass,
    /// A trivially copyable type.
    Trivial,
}

impl LayoutConstraint {
    pub fn is_class(&self) -> bool {
        matches!(self, LayoutConstraint::Class | LayoutConstraint::NativeClass)
    }
}

impl fmt::Display for LayoutConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutConstraint::Class => write!(f, "AnyObject"),
            LayoutConstraint::NativeClass => write!(f, "_NativeClass"),
            LayoutConstraint::Trivial => write!(f, "_Trivial"),
        }
    }
}

/// A generic requirement. Equality is structural.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Requirement {
    /// `subject: P`, where `constraint` is a protocol, composition or
    /// parameterized protocol.
    Conformance { subject: Ty, constraint: Ty },
    /// `subject: SomeClass`.
    Superclass { subject: Ty, constraint: Ty },
    /// `subject: AnyObject` and friends.
    Layout { subject: Ty, layout: LayoutConstraint },
    /// `first == second`.
    SameType { first: Ty, second: Ty },
}

impl Requirement {
    pub fn conformance(subject: Ty, constraint: Ty) -> Self {
        Requirement::Conformance { subject, constraint }
    }

    pub fn superclass(subject: Ty, constraint: Ty) -> Self {
        Requirement::Superclass { subject, constraint }
    }

    pub fn layout(subject: Ty, layout: LayoutConstraint) -> Self {
        Requirement::Layout { subject, layout }
    }

    pub fn same_type(first: Ty, second: Ty) -> Self {
        Requirement::SameType { first, second }
    }

    pub fn kind(&self) -> RequirementKind {
        match self {
            Requirement::Conformance { .. } => RequirementKind::Conformance,
            Requirement::Superclass { .. } => RequirementKind::Superclass,
            Requirement::Layout { .. } => RequirementKind::Layout,
            Requirement::SameType { .. } => RequirementKind::SameType,
        }
    }

    /// The subject, or the left side of a same-type requirement.
    pub fn first_type(&self) -> &Ty {
        match self {
            Requirement::Conformance { subject, .. }
            | Requirement::Superclass { subject, .. }
            | Requirement::Layout { subject, .. } => subject,
            Requirement::SameType { first, .. } => first,
        }
    }

    /// The constraint or right side; `None` for layout requirements.
    pub fn second_type(&self) -> Option<&Ty> {
        match self {
            Requirement::Conformance { constraint, .. }
            | Requirement::Superclass { constraint, .. } => Some(constraint),
            Requirement::SameType { second, .. } => Some(second),
            Requirement::Layout { .. } => None,
        }
    }

    /// The protocol of a conformance requirement to a single protocol.
    pub fn protocol_name(&self) -> Option<&str> {
        match self {
            Requirement::Conformance { constraint, .. } => match constraint.desugared() {
                Ty::Protocol(name) => Some(name),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn has_error(&self) -> bool {
        self.first_type().has_error() || self.second_type().is_some_and(Ty::has_error)
    }

    /// Apply a substitution to both sides. `None` if either side cannot be
    /// substituted.
    pub fn subst(&self, map: &SubstitutionMap, module: &Module) -> Option<Requirement> {
        Some(match self {
            Requirement::Conformance { subject, constraint } => Requirement::Conformance {
                subject: map.apply(subject, module)?,
                constraint: map.apply(constraint, module)?,
            },
            Requirement::Superclass { subject, constraint } => Requirement::Superclass {
                subject: map.apply(subject, module)?,
                constraint: map.apply(constraint, module)?,
            },
            Requirement::Layout { subject, layout } => Requirement::Layout {
                subject: map.apply(subject, module)?,
                layout: *layout,
            },
            Requirement::SameType { first, second } => Requirement::SameType {
                first: map.apply(first, module)?,
                second: map.apply(second, module)?,
            },
        })
    }

    /// Printed as it would appear in a protocol's own `where` clause.
    pub fn display_without_self(&self) -> String {
        match self {
            Requirement::Conformance { subject, constraint }
            | Requirement::Superclass { subject, constraint } => {
                format!("{}: {}", subject.display_without_self(), constraint)
            }
            Requirement::Layout { subject, layout } => {
                format!("{}: {}", subject.display_without_self(), layout)
            }
            Requirement::SameType { first, second } => format!(
                "{} == {}",
                first.display_without_self(),
                second.display_without_self()
            ),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Conformance { subject, constraint }
            | Requirement::Superclass { subject, constraint } => {
                write!(f, "{}: {}", subject, constraint)
            }
            Requirement::Layout { subject, layout } => write!(f, "{}: {}", subject, layout),
            Requirement::SameType { first, second } => write!(f, "{} == {}", first, second),
        }
    }
}

/// A desugared requirement with provenance, as consumed by signature
/// building.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StructuralRequirement {
    pub req: Requirement,
    pub loc: SourceLoc,
    /// Derived by requirement inference rather than written by the user.
    pub was_inferred: bool,
}

impl StructuralRequirement {
    pub fn explicit(req: Requirement, loc: SourceLoc) -> Self {
        StructuralRequirement { req, loc, was_inferred: false }
    }

    pub fn inferred(req: Requirement, loc: SourceLoc) -> Self {
        StructuralRequirement { req, loc, was_inferred: true }
    }
}

impl fmt::Display for StructuralRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.req)?;
        if self.was_inferred {
            write!(f, " [inferred]")?;
        }
        Ok(())
    }
}

/// Source positions of a written requirement's parts.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RequirementRepr {
    /// The `:` or `==`.
    pub separator: SourceLoc,
    /// Start of the subject / left-hand type.
    pub first: SourceLoc,
    /// Start of the constraint / right-hand type.
    pub second: SourceLoc,
    /// The whole requirement.
    pub range: SourceLoc,
}

/// An entry of a `where` clause: the resolved requirement plus where it was
/// written, if anywhere.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WrittenRequirement {
    pub req: Requirement,
    pub repr: Option<RequirementRepr>,
}

impl WrittenRequirement {
    pub fn new(req: Requirement, repr: RequirementRepr) -> Self {
        WrittenRequirement { req, repr: Some(repr) }
    }

    pub fn synthesized(req: Requirement) -> Self {
        WrittenRequirement { req, repr: None }
    }
}
