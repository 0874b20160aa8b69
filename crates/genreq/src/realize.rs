//! Requirement realization: inference plus desugaring for one written
//! requirement, with provenance.
//!
//! Inferred requirements are appended before the explicit ones they came
//! with, so diagnostics read in declaration order.

use genreq_common::SourceLoc;

use crate::config::ResolutionConfig;
use crate::desugar::{Desugarer, DEFAULT_MAX_CONDITIONAL_DEPTH};
use crate::error::RequirementError;
use crate::infer::infer_with;
use crate::module::{GenericDecl, Module, ProtocolDecl, TypeLoc};
use crate::requirement::{Requirement, RequirementRepr, StructuralRequirement};
use crate::ty::{GenericParam, Ty};

pub struct Realizer<'m> {
    module: &'m Module,
    max_conditional_depth: usize,
}

impl<'m> Realizer<'m> {
    pub fn new(module: &'m Module) -> Self {
        Realizer { module, max_conditional_depth: DEFAULT_MAX_CONDITIONAL_DEPTH }
    }

    pub fn with_config(module: &'m Module, config: &ResolutionConfig) -> Self {
        Realizer { module, max_conditional_depth: config.max_conditional_depth }
    }

    pub fn module(&self) -> &'m Module {
        self.module
    }

    fn desugarer(&self) -> Desugarer<'m> {
        Desugarer::new(self.module).with_max_conditional_depth(self.max_conditional_depth)
    }

    fn infer(
        &self,
        infer_in: Option<&Module>,
        ty: &Ty,
        loc: SourceLoc,
        result: &mut Vec<StructuralRequirement>,
    ) {
        if let Some(module) = infer_in {
            let mut desugarer =
                Desugarer::new(module).with_max_conditional_depth(self.max_conditional_depth);
            infer_with(&mut desugarer, ty, loc, result);
        }
    }

    /// Realize a written requirement. With `infer_in`, requirements
    /// inferred from each side come first, located at that side.
    pub fn realize_requirement(
        &self,
        req: &Requirement,
        repr: Option<&RequirementRepr>,
        infer_in: Option<&Module>,
        result: &mut Vec<StructuralRequirement>,
        errors: &mut Vec<RequirementError>,
    ) {
        let loc = repr.map_or(SourceLoc::INVALID, |r| r.separator);
        let first_loc = repr.map_or(SourceLoc::INVALID, |r| r.first);
        let second_loc = repr.map_or(SourceLoc::INVALID, |r| r.second);

        match req {
            Requirement::Conformance { subject, constraint }
            | Requirement::Superclass { subject, constraint } => {
                self.infer(infer_in, subject, first_loc, result);
                self.infer(infer_in, constraint, second_loc, result);
                self.realize_type_requirement(subject, constraint, loc, result, errors);
            }
            Requirement::Layout { subject, layout } => {
                self.infer(infer_in, subject, first_loc, result);
                let mut reqs = Vec::new();
                self.desugarer().desugar_layout(subject, *layout, loc, &mut reqs, errors);
                push_explicit(reqs, loc, result);
            }
            Requirement::SameType { first, second } => {
                self.infer(infer_in, first, first_loc, result);
                self.infer(infer_in, second, second_loc, result);
                let mut reqs = Vec::new();
                self.desugarer().desugar_same_type(first, second, loc, &mut reqs, errors);
                push_explicit(reqs, loc, result);
            }
        }
    }

    /// `subject: constraint` before knowing whether `constraint` is a
    /// protocol or a class.
    pub fn realize_type_requirement(
        &self,
        subject: &Ty,
        constraint: &Ty,
        loc: SourceLoc,
        result: &mut Vec<StructuralRequirement>,
        errors: &mut Vec<RequirementError>,
    ) {
        let mut reqs = Vec::new();
        if constraint.is_constraint_type() {
            self.desugarer().desugar_conformance(subject, constraint, loc, &mut reqs, errors);
        } else if self.module.is_class_type(constraint) {
            self.desugarer().desugar_superclass(subject, constraint, loc, &mut reqs, errors);
        } else {
            errors.push(RequirementError::InvalidTypeRequirement {
                subject: subject.clone(),
                constraint: constraint.clone(),
                loc,
            });
            return;
        }
        push_explicit(reqs, loc, result);
    }

    /// Realize an inheritance clause as requirements on `subject`.
    ///
    /// When `owner` is set, `subject` is one of its associated types, and an
    /// entry spelled `Self.Name` is resolved against the owner's typealiases
    /// and associated types first.
    pub fn realize_inherited_requirements(
        &self,
        inherited: &[TypeLoc],
        subject: &Ty,
        owner: Option<&ProtocolDecl>,
        infer_in: Option<&Module>,
        result: &mut Vec<StructuralRequirement>,
        errors: &mut Vec<RequirementError>,
    ) {
        for entry in inherited {
            let ty = match owner {
                Some(proto) => resolve_self_member(&entry.ty, proto),
                None => entry.ty.clone(),
            };
            self.infer(infer_in, &ty, entry.loc, result);
            self.realize_type_requirement(subject, &ty, entry.loc, result, errors);
        }
    }

    /// Structural requirements of a generic function or type: parameter
    /// inheritance clauses, the `where` clause, then everything inferred
    /// from the signature's types.
    pub fn generic_decl_requirements(
        &self,
        decl: &GenericDecl,
        result: &mut Vec<StructuralRequirement>,
        errors: &mut Vec<RequirementError>,
    ) {
        let infer_in = Some(self.module);
        for param in &decl.params {
            let subject = Ty::Param(param.param.clone());
            self.realize_inherited_requirements(
                &param.inherited,
                &subject,
                None,
                infer_in,
                result,
                errors,
            );
        }
        for written in &decl.where_clause {
            self.realize_requirement(&written.req, written.repr.as_ref(), infer_in, result, errors);
        }
        for source in &decl.signature_types {
            self.infer(infer_in, &source.ty, source.loc, result);
        }
    }
}

fn push_explicit(reqs: Vec<Requirement>, loc: SourceLoc, result: &mut Vec<StructuralRequirement>) {
    result.extend(reqs.into_iter().map(|req| StructuralRequirement::explicit(req, loc)));
}

/// `Self.Name` inside `proto`: a typealias's underlying type, or the
/// associated type itself.
fn resolve_self_member(ty: &Ty, proto: &ProtocolDecl) -> Ty {
    if let Ty::Member { base, name, protocol: None } = ty.desugared() {
        if matches!(base.desugared(), Ty::Param(p) if *p == GenericParam::protocol_self()) {
            if let Some(alias) = proto.type_alias(name) {
                return alias.underlying.clone();
            }
            if proto.associated_type(name).is_some() {
                return proto.associated_type_interface(name);
            }
        }
    }
    ty.clone()
}
