//! Requirement inference.
//!
//! Writing `Set<T>` in a signature implies `T: Hashable`, because `Set`
//! itself requires it of its element. The walker visits a type bottom-up and
//! collects such implied requirements from:
//! - generic typealias applications (the alias's own requirements)
//! - `@differentiable` function types (`Differentiable` conformances and,
//!   for `_linear`, `T == T.TangentVector`)
//! - specialized nominal types (the nominal's generic signature)
//!
//! Errors produced while inferring are not reported: inferred requirements
//! on concrete types are simply dropped.

use genreq_common::SourceLoc;
use tracing::{debug, trace};

use crate::desugar::Desugarer;
use crate::error::RequirementError;
use crate::module::{GenericSignature, Module};
use crate::requirement::{Requirement, StructuralRequirement};
use crate::subst::SubstitutionMap;
use crate::ty::{Differentiability, FunctionTy, Ty};

/// Name of the protocol differentiable function types require.
const DIFFERENTIABLE: &str = "Differentiable";
const TANGENT_VECTOR: &str = "TangentVector";

/// Infer requirements from `ty`, appending them to `result` as inferred
/// requirements at `loc`.
pub fn infer_requirements(
    ty: &Ty,
    loc: SourceLoc,
    module: &Module,
    result: &mut Vec<StructuralRequirement>,
) {
    let mut desugarer = Desugarer::new(module);
    infer_with(&mut desugarer, ty, loc, result);
}

/// [`infer_requirements`] with a caller-configured desugarer.
pub fn infer_with(
    desugarer: &mut Desugarer<'_>,
    ty: &Ty,
    loc: SourceLoc,
    result: &mut Vec<StructuralRequirement>,
) {
    let mut walker = InferenceWalker { desugarer, reqs: Vec::new(), errors: Vec::new() };
    walker.walk(ty);
    if !walker.errors.is_empty() {
        let dropped = walker.errors.len();
        debug!(ty = %ty, dropped, "dropped errors from requirement inference");
    }
    for req in walker.reqs {
        trace!(requirement = %req, "inferred requirement");
        result.push(StructuralRequirement::inferred(req, loc));
    }
}

struct InferenceWalker<'a, 'm> {
    desugarer: &'a mut Desugarer<'m>,
    reqs: Vec<Requirement>,
    errors: Vec<RequirementError>,
}

impl InferenceWalker<'_, '_> {
    /// Post-order walk. Returns `false` once the walk has been stopped.
    fn walk(&mut self, ty: &Ty) -> bool {
        // Unbound generics come from recovered code; there is nothing to
        // substitute.
        if matches!(ty, Ty::Unbound(_)) {
            return false;
        }

        let children_done = match ty {
            Ty::Param(_) | Ty::Protocol(_) | Ty::Error | Ty::Unbound(_) => true,
            Ty::Member { base, .. } => self.walk(base),
            Ty::Nominal(_, args) | Ty::Parameterized(_, args) | Ty::Tuple(args) => {
                self.walk_all(args)
            }
            Ty::Fun(f) => f.params.iter().all(|p| self.walk(&p.ty)) && self.walk(&f.result),
            Ty::Composition(c) => self.walk_all(&c.members),
            Ty::Alias(alias) => self.walk_all(&alias.args),
        };
        if !children_done {
            return false;
        }

        self.visit_post(ty);
        true
    }

    fn walk_all(&mut self, tys: &[Ty]) -> bool {
        tys.iter().all(|t| self.walk(t))
    }

    fn visit_post(&mut self, ty: &Ty) {
        let module = self.desugarer.module();
        match ty {
            Ty::Alias(alias) => {
                if let Some(decl) = module.alias(&alias.name) {
                    self.apply_signature(&decl.signature, &alias.args);
                }
            }
            Ty::Fun(f) => self.infer_differentiable(f),
            Ty::Nominal(name, args) if ty.is_specialized() => {
                if let Some(decl) = module.nominal(name) {
                    self.apply_signature(&decl.signature, args);
                }
            }
            _ => {}
        }
    }

    /// Substitute a declaration's requirements through the application's
    /// arguments and desugar each one that substitutes cleanly.
    fn apply_signature(&mut self, signature: &GenericSignature, args: &[Ty]) {
        if signature.is_empty() {
            return;
        }
        let module = self.desugarer.module();
        let map = SubstitutionMap::from_params(&signature.params, args);
        for raw in &signature.requirements {
            if let Some(req) = raw.subst(&map, module) {
                self.desugar(&req);
            }
        }
    }

    fn infer_differentiable(&mut self, f: &FunctionTy) {
        let Some(kind) = f.differentiability else {
            return;
        };
        if self.desugarer.module().protocol(DIFFERENTIABLE).is_none() {
            return;
        }
        let linear = kind == Differentiability::Linear;
        for param in f.params.iter().filter(|p| !p.no_derivative) {
            self.require_differentiable(&param.ty, linear);
        }
        self.require_differentiable(&f.result, linear);
    }

    fn require_differentiable(&mut self, ty: &Ty, linear: bool) {
        self.desugar(&Requirement::conformance(ty.clone(), Ty::protocol(DIFFERENTIABLE)));
        if linear {
            let tangent = self.desugarer.module().member_type(ty, DIFFERENTIABLE, TANGENT_VECTOR);
            self.desugar(&Requirement::same_type(ty.clone(), tangent));
        }
    }

    fn desugar(&mut self, req: &Requirement) {
        self.desugarer.desugar(req, SourceLoc::INVALID, &mut self.reqs, &mut self.errors);
    }
}
