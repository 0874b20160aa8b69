//! Type representation for generic requirement resolution.
//!
//! [`Ty`] is a tagged union over the type shapes the engine has to look
//! inside: type parameters (generic parameters and dependent members rooted
//! in them), nominal applications, tuples, functions, protocol existentials,
//! compositions, parameterized protocols and typealias sugar. Every other
//! type in the surrounding language is opaque to requirement lowering and is
//! modeled as a non-generic nominal type.

use std::fmt;

use serde::Serialize;

/// A generic parameter, identified by its position in a generic context.
///
/// The `name` is used ONLY for display. It is excluded from `PartialEq` and
/// `Hash` so that `T` and `τ_0_0` at the same position are the same type.
#[derive(Clone, Debug, Serialize)]
pub struct GenericParam {
    pub depth: u32,
    pub index: u32,
    pub name: String,
}

impl PartialEq for GenericParam {
    fn eq(&self, other: &Self) -> bool {
        self.depth == other.depth && self.index == other.index
    }
}

impl Eq for GenericParam {}

impl std::hash::Hash for GenericParam {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.depth.hash(state);
        self.index.hash(state);
    }
}

impl GenericParam {
    pub fn new(depth: u32, index: u32, name: impl Into<String>) -> Self {
        GenericParam { depth, index, name: name.into() }
    }

    /// The implicit `Self` parameter of a protocol.
    pub fn protocol_self() -> Self {
        GenericParam::new(0, 0, "Self")
    }
}

/// How a function type is differentiable.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Differentiability {
    Normal,
    Forward,
    Reverse,
    Linear,
}

/// A function parameter.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct FnParam {
    pub ty: Ty,
    /// `@noDerivative`: excluded from differentiability requirements.
    pub no_derivative: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct FunctionTy {
    pub params: Vec<FnParam>,
    pub result: Box<Ty>,
    pub differentiability: Option<Differentiability>,
}

/// `P & Q & SomeClass`, optionally with an explicit `AnyObject`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct CompositionTy {
    pub members: Vec<Ty>,
    pub any_object: bool,
}

/// A reference to a typealias, kept for spelling in diagnostics.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct AliasTy {
    pub name: String,
    pub args: Vec<Ty>,
    pub underlying: Ty,
}

/// A type as seen by requirement lowering.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Ty {
    /// A generic parameter: `T`, `Self`.
    Param(GenericParam),
    /// A member type `Base.Name`. `protocol` is set once the name has been
    /// resolved to an associated type of that protocol; `Self.[P1]X` and
    /// `Self.[P2]X` are distinct types.
    Member {
        base: Box<Ty>,
        name: String,
        protocol: Option<String>,
    },
    /// A nominal type, possibly applied to generic arguments: `Int`, `Set<T>`.
    Nominal(String, Vec<Ty>),
    /// A generic nominal type written without its arguments (recovered code).
    Unbound(String),
    Tuple(Vec<Ty>),
    Fun(FunctionTy),
    /// A protocol used as a type or a constraint: `P`, `any P`.
    Protocol(String),
    Composition(CompositionTy),
    /// `P<Arg, ...>`, constraining the primary associated types of `P`.
    Parameterized(String, Vec<Ty>),
    Alias(Box<AliasTy>),
    /// The type of something that failed to resolve.
    Error,
}

impl Ty {
    pub fn param(depth: u32, index: u32, name: &str) -> Ty {
        Ty::Param(GenericParam::new(depth, index, name))
    }

    /// The protocol `Self` type.
    pub fn self_ty() -> Ty {
        Ty::Param(GenericParam::protocol_self())
    }

    /// An unresolved member type `base.name`.
    pub fn member(base: Ty, name: &str) -> Ty {
        Ty::Member { base: Box::new(base), name: name.to_string(), protocol: None }
    }

    /// The associated type `name` of `protocol`, projected from `base`.
    pub fn assoc(base: Ty, protocol: &str, name: &str) -> Ty {
        Ty::Member {
            base: Box::new(base),
            name: name.to_string(),
            protocol: Some(protocol.to_string()),
        }
    }

    pub fn con(name: &str) -> Ty {
        Ty::Nominal(name.to_string(), Vec::new())
    }

    pub fn nominal(name: &str, args: Vec<Ty>) -> Ty {
        Ty::Nominal(name.to_string(), args)
    }

    pub fn protocol(name: &str) -> Ty {
        Ty::Protocol(name.to_string())
    }

    pub fn composition(members: Vec<Ty>, any_object: bool) -> Ty {
        Ty::Composition(CompositionTy { members, any_object })
    }

    pub fn parameterized(protocol: &str, args: Vec<Ty>) -> Ty {
        Ty::Parameterized(protocol.to_string(), args)
    }

    pub fn alias(name: &str, args: Vec<Ty>, underlying: Ty) -> Ty {
        Ty::Alias(Box::new(AliasTy { name: name.to_string(), args, underlying }))
    }

    /// A plain (non-differentiable) function type.
    pub fn fun(params: Vec<Ty>, result: Ty) -> Ty {
        Ty::Fun(FunctionTy {
            params: params
                .into_iter()
                .map(|ty| FnParam { ty, no_derivative: false })
                .collect(),
            result: Box::new(result),
            differentiability: None,
        })
    }

    pub fn differentiable_fun(params: Vec<FnParam>, result: Ty, kind: Differentiability) -> Ty {
        Ty::Fun(FunctionTy {
            params,
            result: Box::new(result),
            differentiability: Some(kind),
        })
    }

    pub fn int() -> Ty {
        Ty::con("Int")
    }

    pub fn string() -> Ty {
        Ty::con("String")
    }

    pub fn bool() -> Ty {
        Ty::con("Bool")
    }

    pub fn float() -> Ty {
        Ty::con("Float")
    }

    pub fn array(element: Ty) -> Ty {
        Ty::nominal("Array", vec![element])
    }

    pub fn set(element: Ty) -> Ty {
        Ty::nominal("Set", vec![element])
    }

    pub fn optional(wrapped: Ty) -> Ty {
        Ty::nominal("Optional", vec![wrapped])
    }

    /// Strip typealias sugar at the top level only.
    pub fn desugared(&self) -> &Ty {
        let mut ty = self;
        while let Ty::Alias(alias) = ty {
            ty = &alias.underlying;
        }
        ty
    }

    /// Strip typealias sugar everywhere.
    pub fn canonical(&self) -> Ty {
        match self {
            Ty::Alias(alias) => alias.underlying.canonical(),
            Ty::Param(_) | Ty::Unbound(_) | Ty::Protocol(_) | Ty::Error => self.clone(),
            Ty::Member { base, name, protocol } => Ty::Member {
                base: Box::new(base.canonical()),
                name: name.clone(),
                protocol: protocol.clone(),
            },
            Ty::Nominal(name, args) => {
                Ty::Nominal(name.clone(), args.iter().map(Ty::canonical).collect())
            }
            Ty::Tuple(elems) => Ty::Tuple(elems.iter().map(Ty::canonical).collect()),
            Ty::Fun(f) => Ty::Fun(FunctionTy {
                params: f
                    .params
                    .iter()
                    .map(|p| FnParam { ty: p.ty.canonical(), no_derivative: p.no_derivative })
                    .collect(),
                result: Box::new(f.result.canonical()),
                differentiability: f.differentiability,
            }),
            Ty::Composition(c) => Ty::Composition(CompositionTy {
                members: c.members.iter().map(Ty::canonical).collect(),
                any_object: c.any_object,
            }),
            Ty::Parameterized(name, args) => {
                Ty::Parameterized(name.clone(), args.iter().map(Ty::canonical).collect())
            }
        }
    }

    /// Equality modulo typealias sugar.
    pub fn is_equal(&self, other: &Ty) -> bool {
        self.canonical() == other.canonical()
    }

    /// Whether this type IS a type parameter (not merely contains one).
    pub fn is_type_parameter(&self) -> bool {
        match self.desugared() {
            Ty::Param(_) => true,
            Ty::Member { base, .. } => base.is_type_parameter(),
            _ => false,
        }
    }

    /// Whether a type parameter occurs anywhere in this type.
    pub fn has_type_parameter(&self) -> bool {
        self.any(&|ty| matches!(ty, Ty::Param(_)))
    }

    pub fn has_error(&self) -> bool {
        self.any(&|ty| matches!(ty, Ty::Error))
    }

    /// Whether this type can appear on the right of a conformance
    /// requirement.
    pub fn is_constraint_type(&self) -> bool {
        matches!(
            self.desugared(),
            Ty::Protocol(_) | Ty::Composition(_) | Ty::Parameterized(..)
        )
    }

    /// Existential types, as opposed to classes, inside a composition.
    pub fn is_existential_type(&self) -> bool {
        self.is_constraint_type()
    }

    /// A nominal type applied to generic arguments.
    pub fn is_specialized(&self) -> bool {
        matches!(self.desugared(), Ty::Nominal(_, args) if !args.is_empty())
    }

    /// Root generic parameter of a type parameter.
    pub fn root_param(&self) -> Option<&GenericParam> {
        match self.desugared() {
            Ty::Param(p) => Some(p),
            Ty::Member { base, .. } => base.root_param(),
            _ => None,
        }
    }

    fn any(&self, pred: &dyn Fn(&Ty) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        match self {
            Ty::Param(_) | Ty::Unbound(_) | Ty::Protocol(_) | Ty::Error => false,
            Ty::Member { base, .. } => base.any(pred),
            Ty::Nominal(_, args) | Ty::Parameterized(_, args) | Ty::Tuple(args) => {
                args.iter().any(|a| a.any(pred))
            }
            Ty::Fun(f) => f.params.iter().any(|p| p.ty.any(pred)) || f.result.any(pred),
            Ty::Composition(c) => c.members.iter().any(|m| m.any(pred)),
            Ty::Alias(alias) => alias.underlying.any(pred),
        }
    }

    /// Printed form with a leading `Self.` removed, as written inside a
    /// protocol's own `where` clause.
    pub fn display_without_self(&self) -> String {
        let printed = self.to_string();
        match printed.strip_prefix("Self.") {
            Some(rest) => rest.to_string(),
            None => printed,
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Ty], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", sep)?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Differentiability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Differentiability::Normal => write!(f, "@differentiable"),
            Differentiability::Forward => write!(f, "@differentiable(_forward)"),
            Differentiability::Reverse => write!(f, "@differentiable(reverse)"),
            Differentiability::Linear => write!(f, "@differentiable(_linear)"),
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Param(p) => write!(f, "{}", p.name),
            Ty::Member { base, name, .. } => write!(f, "{}.{}", base, name),
            Ty::Nominal(name, args) | Ty::Parameterized(name, args) => {
                write!(f, "{}", name)?;
                if !args.is_empty() {
                    write!(f, "<")?;
                    write_list(f, args, ", ")?;
                    write!(f, ">")?;
                }
                Ok(())
            }
            Ty::Unbound(name) | Ty::Protocol(name) => write!(f, "{}", name),
            Ty::Tuple(elems) => {
                write!(f, "(")?;
                write_list(f, elems, ", ")?;
                write!(f, ")")
            }
            Ty::Fun(fun) => {
                if let Some(kind) = fun.differentiability {
                    write!(f, "{} ", kind)?;
                }
                write!(f, "(")?;
                for (i, p) in fun.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    if p.no_derivative {
                        write!(f, "@noDerivative ")?;
                    }
                    write!(f, "{}", p.ty)?;
                }
                write!(f, ") -> {}", fun.result)
            }
            Ty::Composition(c) => {
                if c.members.is_empty() {
                    return write!(f, "{}", if c.any_object { "AnyObject" } else { "Any" });
                }
                write_list(f, &c.members, " & ")?;
                if c.any_object {
                    write!(f, " & AnyObject")?;
                }
                Ok(())
            }
            Ty::Alias(alias) => {
                write!(f, "{}", alias.name)?;
                if !alias.args.is_empty() {
                    write!(f, "<")?;
                    write_list(f, &alias.args, ", ")?;
                    write!(f, ">")?;
                }
                Ok(())
            }
            Ty::Error => write!(f, "<<error type>>"),
        }
    }
}
