//! Requirement desugaring.
//!
//! Reduces one requirement to zero or more requirements whose subject is a
//! type parameter, recording an error for everything that cannot be
//! reduced. Afterwards:
//! - conformance, superclass and layout subjects are type parameters
//! - conformance constraints name a single protocol
//! - same-type requirements have a type parameter on at least one side

use genreq_common::SourceLoc;
use tracing::{trace, warn};

use crate::error::RequirementError;
use crate::matcher::{match_types, TypeMatcher};
use crate::module::{ConformanceRef, Module};
use crate::requirement::{LayoutConstraint, Requirement};
use crate::ty::Ty;

/// Default bound on nested conditional-conformance expansion.
pub const DEFAULT_MAX_CONDITIONAL_DEPTH: usize = 64;

/// Desugars requirements against a module.
///
/// Expanding the conditional requirements of a concrete conformance can
/// reach the same conformance again; the desugarer tracks the chain being
/// expanded and cuts it on a repeat or past `max_conditional_depth`.
pub struct Desugarer<'m> {
    module: &'m Module,
    max_conditional_depth: usize,
    /// (canonical subject, protocol) pairs currently being expanded.
    expanding: Vec<(Ty, String)>,
}

impl<'m> Desugarer<'m> {
    pub fn new(module: &'m Module) -> Self {
        Desugarer {
            module,
            max_conditional_depth: DEFAULT_MAX_CONDITIONAL_DEPTH,
            expanding: Vec::new(),
        }
    }

    pub fn with_max_conditional_depth(mut self, depth: usize) -> Self {
        self.max_conditional_depth = depth;
        self
    }

    pub fn module(&self) -> &'m Module {
        self.module
    }

    /// Desugar any requirement, dispatching on its kind.
    pub fn desugar(
        &mut self,
        req: &Requirement,
        loc: SourceLoc,
        result: &mut Vec<Requirement>,
        errors: &mut Vec<RequirementError>,
    ) {
        trace!(requirement = %req, "desugaring requirement");
        match req {
            Requirement::Conformance { subject, constraint } => {
                self.desugar_conformance(subject, constraint, loc, result, errors)
            }
            Requirement::Superclass { subject, constraint } => {
                self.desugar_superclass(subject, constraint, loc, result, errors)
            }
            Requirement::Layout { subject, layout } => {
                self.desugar_layout(subject, *layout, loc, result, errors)
            }
            Requirement::SameType { first, second } => {
                self.desugar_same_type(first, second, loc, result, errors)
            }
        }
    }

    /// `subject: constraint`, splitting compositions and parameterized
    /// protocols.
    pub fn desugar_conformance(
        &mut self,
        subject: &Ty,
        constraint: &Ty,
        loc: SourceLoc,
        result: &mut Vec<Requirement>,
        errors: &mut Vec<RequirementError>,
    ) {
        match constraint.desugared() {
            Ty::Protocol(protocol) => {
                if subject.is_type_parameter() {
                    result.push(Requirement::conformance(subject.clone(), constraint.clone()));
                    return;
                }
                let requirement = Requirement::conformance(subject.clone(), constraint.clone());
                let conformance = self.module.lookup_conformance(subject, protocol);
                if conformance.is_invalid() {
                    errors.push(RequirementError::ConflictingRequirement { requirement, loc });
                    return;
                }
                errors.push(RequirementError::RedundantRequirement { requirement, loc });
                if let ConformanceRef::Concrete(conformance) = conformance {
                    self.expand_conditional(
                        subject,
                        protocol,
                        &conformance.conditional_requirements,
                        result,
                        errors,
                    );
                }
            }
            Ty::Parameterized(protocol, args) => {
                self.desugar_conformance(subject, &Ty::protocol(protocol), loc, result, errors);
                let primary = self
                    .module
                    .protocol(protocol)
                    .map(|p| p.primary_associated_types.clone())
                    .unwrap_or_default();
                for (name, arg) in primary.iter().zip(args) {
                    let member = self.module.member_type(subject, protocol, name);
                    let req = Requirement::same_type(member, arg.clone());
                    self.desugar(&req, SourceLoc::INVALID, result, errors);
                }
            }
            Ty::Composition(composition) => {
                if composition.any_object {
                    self.desugar_layout(subject, LayoutConstraint::Class, loc, result, errors);
                }
                for member in &composition.members {
                    if member.is_existential_type() {
                        self.desugar_conformance(subject, member, loc, result, errors);
                    } else {
                        self.desugar_superclass(subject, member, loc, result, errors);
                    }
                }
            }
            _ if self.module.is_class_type(constraint) => {
                self.desugar_superclass(subject, constraint, loc, result, errors)
            }
            _ => errors.push(RequirementError::InvalidTypeRequirement {
                subject: subject.clone(),
                constraint: constraint.clone(),
                loc,
            }),
        }
    }

    fn expand_conditional(
        &mut self,
        subject: &Ty,
        protocol: &str,
        conditional: &[Requirement],
        result: &mut Vec<Requirement>,
        errors: &mut Vec<RequirementError>,
    ) {
        if conditional.is_empty() {
            return;
        }
        let key = (subject.canonical(), protocol.to_string());
        if self.expanding.contains(&key) || self.expanding.len() >= self.max_conditional_depth {
            warn!(
                subject = %subject,
                protocol,
                depth = self.expanding.len(),
                "stopped expanding conditional requirements"
            );
            return;
        }
        self.expanding.push(key);
        for req in conditional {
            self.desugar(req, SourceLoc::INVALID, result, errors);
        }
        self.expanding.pop();
    }

    /// `subject: SomeClass`.
    pub fn desugar_superclass(
        &self,
        subject: &Ty,
        constraint: &Ty,
        loc: SourceLoc,
        result: &mut Vec<Requirement>,
        errors: &mut Vec<RequirementError>,
    ) {
        let requirement = Requirement::superclass(subject.clone(), constraint.clone());
        if subject.is_type_parameter() {
            result.push(requirement);
        } else if self.module.is_exact_superclass_of(constraint, subject) {
            errors.push(RequirementError::RedundantRequirement { requirement, loc });
        } else {
            errors.push(RequirementError::ConflictingRequirement { requirement, loc });
        }
    }

    /// `subject: AnyObject` and other layouts.
    pub fn desugar_layout(
        &self,
        subject: &Ty,
        layout: LayoutConstraint,
        loc: SourceLoc,
        result: &mut Vec<Requirement>,
        errors: &mut Vec<RequirementError>,
    ) {
        let requirement = Requirement::layout(subject.clone(), layout);
        if subject.is_type_parameter() {
            result.push(requirement);
        } else if layout.is_class() && self.module.is_any_class_reference_type(subject) {
            errors.push(RequirementError::RedundantRequirement { requirement, loc });
        } else {
            errors.push(RequirementError::ConflictingRequirement { requirement, loc });
        }
    }

    /// `first == second`, one requirement per structurally divergent
    /// position.
    pub fn desugar_same_type(
        &self,
        first: &Ty,
        second: &Ty,
        loc: SourceLoc,
        result: &mut Vec<Requirement>,
        errors: &mut Vec<RequirementError>,
    ) {
        let mut matcher = SameTypeMatcher {
            loc,
            result: &mut *result,
            errors: &mut *errors,
            recorded_requirements: false,
            recorded_errors: false,
        };
        match_types(&mut matcher, first, second);
        let (recorded_requirements, recorded_errors) =
            (matcher.recorded_requirements, matcher.recorded_errors);

        if !recorded_requirements
            && !recorded_errors
            && !first.is_type_parameter()
            && !second.is_type_parameter()
        {
            errors.push(RequirementError::RedundantRequirement {
                requirement: Requirement::same_type(first.clone(), second.clone()),
                loc,
            });
        }
    }
}

struct SameTypeMatcher<'a> {
    loc: SourceLoc,
    result: &'a mut Vec<Requirement>,
    errors: &'a mut Vec<RequirementError>,
    recorded_requirements: bool,
    recorded_errors: bool,
}

impl TypeMatcher for SameTypeMatcher<'_> {
    fn always_mismatch_type_parameters(&self) -> bool {
        true
    }

    fn mismatch(&mut self, first: &Ty, second: &Ty, sugared_first: &Ty) -> bool {
        if first.is_type_parameter() {
            self.result.push(Requirement::same_type(sugared_first.clone(), second.clone()));
            self.recorded_requirements = true;
        } else if second.is_type_parameter() {
            self.result.push(Requirement::same_type(second.clone(), sugared_first.clone()));
            self.recorded_requirements = true;
        } else {
            self.errors.push(RequirementError::ConcreteTypeMismatch {
                first: first.clone(),
                second: second.clone(),
                loc: self.loc,
            });
            self.recorded_errors = true;
        }
        true
    }
}

/// Desugar a single requirement with no source location.
pub fn desugar_requirement(
    req: &Requirement,
    module: &Module,
) -> (Vec<Requirement>, Vec<RequirementError>) {
    let mut result = Vec::new();
    let mut errors = Vec::new();
    Desugarer::new(module).desugar(req, SourceLoc::INVALID, &mut result, &mut errors);
    (result, errors)
}
