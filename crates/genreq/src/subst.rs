//! Substitution of generic parameters.

use rustc_hash::FxHashMap;

use crate::module::Module;
use crate::ty::{AliasTy, CompositionTy, FnParam, FunctionTy, GenericParam, Ty};

/// Maps generic parameters (by position) to replacement types.
#[derive(Clone, Debug, Default)]
pub struct SubstitutionMap {
    replacements: FxHashMap<(u32, u32), Ty>,
}

impl SubstitutionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The context substitution map of an application: each declared
    /// parameter maps to the argument at the same position. Extra
    /// parameters or arguments are ignored.
    pub fn from_params(params: &[GenericParam], args: &[Ty]) -> Self {
        let mut map = SubstitutionMap::new();
        for (param, arg) in params.iter().zip(args) {
            map.insert(param, arg.clone());
        }
        map
    }

    pub fn insert(&mut self, param: &GenericParam, ty: Ty) {
        self.replacements.insert((param.depth, param.index), ty);
    }

    pub fn get(&self, param: &GenericParam) -> Option<&Ty> {
        self.replacements.get(&(param.depth, param.index))
    }

    pub fn len(&self) -> usize {
        self.replacements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }

    /// Substitute through `ty`.
    ///
    /// A member type whose base becomes concrete is projected through the
    /// module's type witnesses. Returns `None` when a parameter is unmapped
    /// or a projection has no witness.
    pub fn apply(&self, ty: &Ty, module: &Module) -> Option<Ty> {
        Some(match ty {
            Ty::Param(p) => self.get(p)?.clone(),
            Ty::Member { base, name, protocol } => {
                let base = self.apply(base, module)?;
                if base.is_type_parameter() {
                    Ty::Member {
                        base: Box::new(base),
                        name: name.clone(),
                        protocol: protocol.clone(),
                    }
                } else {
                    module.type_witness(&base, protocol.as_deref(), name)?
                }
            }
            Ty::Nominal(name, args) => Ty::Nominal(name.clone(), self.apply_all(args, module)?),
            Ty::Parameterized(name, args) => {
                Ty::Parameterized(name.clone(), self.apply_all(args, module)?)
            }
            Ty::Tuple(elems) => Ty::Tuple(self.apply_all(elems, module)?),
            Ty::Fun(f) => {
                let mut params = Vec::with_capacity(f.params.len());
                for p in &f.params {
                    let ty = self.apply(&p.ty, module)?;
                    params.push(FnParam { ty, no_derivative: p.no_derivative });
                }
                Ty::Fun(FunctionTy {
                    params,
                    result: Box::new(self.apply(&f.result, module)?),
                    differentiability: f.differentiability,
                })
            }
            Ty::Composition(c) => Ty::Composition(CompositionTy {
                members: self.apply_all(&c.members, module)?,
                any_object: c.any_object,
            }),
            Ty::Alias(alias) => Ty::Alias(Box::new(AliasTy {
                name: alias.name.clone(),
                args: self.apply_all(&alias.args, module)?,
                underlying: self.apply(&alias.underlying, module)?,
            })),
            Ty::Unbound(_) | Ty::Protocol(_) | Ty::Error => ty.clone(),
        })
    }

    fn apply_all(&self, tys: &[Ty], module: &Module) -> Option<Vec<Ty>> {
        tys.iter().map(|t| self.apply(t, module)).collect()
    }
}
