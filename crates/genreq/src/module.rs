//! Declaration model: the read-only surface requirement lowering consults.
//!
//! A [`Module`] stores protocol, nominal, typealias and conformance
//! declarations keyed by name. It is populated up front by the caller and
//! only read during resolution. It supports:
//! - Protocol inheritance queries (direct and transitive)
//! - Direct member lookup across a protocol and its extensions
//! - Conformance lookup with conditional requirements
//! - Type witness projection (`Array<Int>.Element == Int`)
//! - Superclass chains and class-reference classification

use genreq_common::SourceLoc;
use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHashMap;

use crate::requirement::{Requirement, WrittenRequirement};
use crate::subst::SubstitutionMap;
use crate::ty::{GenericParam, Ty};

/// Upper bound on superclass chains, to survive malformed cyclic classes.
const MAX_SUPERCLASS_DEPTH: usize = 64;

/// A written type and where it was written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeLoc {
    pub ty: Ty,
    pub loc: SourceLoc,
}

impl TypeLoc {
    pub fn new(ty: Ty, loc: SourceLoc) -> Self {
        TypeLoc { ty, loc }
    }

    pub fn synthesized(ty: Ty) -> Self {
        TypeLoc { ty, loc: SourceLoc::INVALID }
    }
}

/// The generic parameters of a declaration and the requirements on them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenericSignature {
    pub params: Vec<GenericParam>,
    pub requirements: Vec<Requirement>,
}

impl GenericSignature {
    pub fn new(params: Vec<GenericParam>, requirements: Vec<Requirement>) -> Self {
        GenericSignature { params, requirements }
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// `<T: Inherited>` in a generic declaration.
#[derive(Clone, Debug)]
pub struct GenericParamDecl {
    pub param: GenericParam,
    pub inherited: Vec<TypeLoc>,
}

/// A generic function or type whose signature is being built.
#[derive(Clone, Debug, Default)]
pub struct GenericDecl {
    pub name: String,
    pub params: Vec<GenericParamDecl>,
    pub where_clause: Vec<WrittenRequirement>,
    /// Parameter, result and stored types requirements are inferred from.
    pub signature_types: Vec<TypeLoc>,
}

impl GenericDecl {
    pub fn new(name: &str) -> Self {
        GenericDecl { name: name.to_string(), ..Default::default() }
    }

    pub fn with_param(mut self, param: GenericParam, inherited: Vec<TypeLoc>) -> Self {
        self.params.push(GenericParamDecl { param, inherited });
        self
    }

    pub fn with_where(mut self, req: WrittenRequirement) -> Self {
        self.where_clause.push(req);
        self
    }

    pub fn with_signature_type(mut self, ty: Ty, loc: SourceLoc) -> Self {
        self.signature_types.push(TypeLoc::new(ty, loc));
        self
    }
}

// ── Protocol members ───────────────────────────────────────────────────

/// `associatedtype Name: Inherited where ...`
#[derive(Clone, Debug, Default)]
pub struct AssociatedTypeDecl {
    pub name: String,
    /// Location of the name.
    pub loc: SourceLoc,
    /// The whole declaration, for removal fix-its.
    pub range: SourceLoc,
    pub inherited: Vec<TypeLoc>,
    pub where_clause: Vec<WrittenRequirement>,
    pub default: Option<Ty>,
    /// Marked `override`.
    pub is_override: bool,
    /// Marked `@_nonoverride`.
    pub is_non_override: bool,
}

impl AssociatedTypeDecl {
    pub fn new(name: &str) -> Self {
        AssociatedTypeDecl { name: name.to_string(), ..Default::default() }
    }

    pub fn located(mut self, loc: SourceLoc, range: SourceLoc) -> Self {
        self.loc = loc;
        self.range = range;
        self
    }

    pub fn inherits(mut self, ty: Ty, loc: SourceLoc) -> Self {
        self.inherited.push(TypeLoc::new(ty, loc));
        self
    }

    pub fn with_where(mut self, req: WrittenRequirement) -> Self {
        self.where_clause.push(req);
        self
    }

    pub fn with_default(mut self, ty: Ty) -> Self {
        self.default = Some(ty);
        self
    }

    pub fn overriding(mut self) -> Self {
        self.is_override = true;
        self
    }
}

/// `typealias Name<Params> = Underlying`
#[derive(Clone, Debug)]
pub struct TypeAliasDecl {
    pub name: String,
    pub loc: SourceLoc,
    pub range: SourceLoc,
    pub generic_params: Vec<GenericParam>,
    pub underlying: Ty,
}

impl TypeAliasDecl {
    pub fn new(name: &str, underlying: Ty) -> Self {
        TypeAliasDecl {
            name: name.to_string(),
            loc: SourceLoc::INVALID,
            range: SourceLoc::INVALID,
            generic_params: Vec::new(),
            underlying,
        }
    }

    pub fn located(mut self, loc: SourceLoc, range: SourceLoc) -> Self {
        self.loc = loc;
        self.range = range;
        self
    }

    pub fn generic(mut self, params: Vec<GenericParam>) -> Self {
        self.generic_params = params;
        self
    }

    pub fn is_generic(&self) -> bool {
        !self.generic_params.is_empty()
    }
}

/// A nominal type nested in a protocol body. Always invalid in the source
/// language, but it still shadows inherited names.
#[derive(Clone, Debug)]
pub struct NestedTypeDecl {
    pub name: String,
    pub loc: SourceLoc,
    pub range: SourceLoc,
    pub generic_params: Vec<GenericParam>,
}

#[derive(Clone, Debug)]
pub enum ProtocolMember {
    AssociatedType(AssociatedTypeDecl),
    TypeAlias(TypeAliasDecl),
    NestedType(NestedTypeDecl),
}

/// A protocol declaration.
#[derive(Clone, Debug, Default)]
pub struct ProtocolDecl {
    pub name: String,
    /// Name of the module declaring the protocol.
    pub module: String,
    pub loc: SourceLoc,
    pub inherited: Vec<TypeLoc>,
    pub where_clause: Vec<WrittenRequirement>,
    pub members: Vec<ProtocolMember>,
    /// Associated types constrained by `P<Arg, ...>`, in order.
    pub primary_associated_types: Vec<String>,
    /// `@objc`: class-bound and without associated types.
    pub is_objc: bool,
    /// The existential `any P` conforms to `P` itself.
    pub self_conforming: bool,
}

impl ProtocolDecl {
    pub fn new(name: &str, module: &str) -> Self {
        ProtocolDecl { name: name.to_string(), module: module.to_string(), ..Default::default() }
    }

    pub fn located(mut self, loc: SourceLoc) -> Self {
        self.loc = loc;
        self
    }

    pub fn inherits(mut self, ty: Ty, loc: SourceLoc) -> Self {
        self.inherited.push(TypeLoc::new(ty, loc));
        self
    }

    pub fn with_where(mut self, req: WrittenRequirement) -> Self {
        self.where_clause.push(req);
        self
    }

    pub fn with_associated_type(mut self, decl: AssociatedTypeDecl) -> Self {
        self.members.push(ProtocolMember::AssociatedType(decl));
        self
    }

    pub fn with_type_alias(mut self, decl: TypeAliasDecl) -> Self {
        self.members.push(ProtocolMember::TypeAlias(decl));
        self
    }

    pub fn with_nested_type(mut self, decl: NestedTypeDecl) -> Self {
        self.members.push(ProtocolMember::NestedType(decl));
        self
    }

    pub fn with_primary_associated_types(mut self, names: &[&str]) -> Self {
        self.primary_associated_types = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn objc(mut self) -> Self {
        self.is_objc = true;
        self
    }

    pub fn self_conforming(mut self) -> Self {
        self.self_conforming = true;
        self
    }

    pub fn self_type(&self) -> Ty {
        Ty::self_ty()
    }

    pub fn associated_types(&self) -> impl Iterator<Item = &AssociatedTypeDecl> {
        self.members.iter().filter_map(|m| match m {
            ProtocolMember::AssociatedType(a) => Some(a),
            _ => None,
        })
    }

    pub fn type_aliases(&self) -> impl Iterator<Item = &TypeAliasDecl> {
        self.members.iter().filter_map(|m| match m {
            ProtocolMember::TypeAlias(t) => Some(t),
            _ => None,
        })
    }

    pub fn associated_type(&self, name: &str) -> Option<&AssociatedTypeDecl> {
        self.associated_types().find(|a| a.name == name)
    }

    pub fn type_alias(&self, name: &str) -> Option<&TypeAliasDecl> {
        self.type_aliases().find(|t| t.name == name)
    }

    /// `Self.[P]Name` for an associated type of this protocol.
    pub fn associated_type_interface(&self, name: &str) -> Ty {
        Ty::assoc(Ty::self_ty(), &self.name, name)
    }

    /// Member type declarations, in declaration order.
    pub fn type_decls(&self) -> impl Iterator<Item = TypeDeclRef<'_>> {
        self.members.iter().map(|m| match m {
            ProtocolMember::AssociatedType(a) => TypeDeclRef::AssociatedType(a),
            ProtocolMember::TypeAlias(t) => TypeDeclRef::TypeAlias(t),
            ProtocolMember::NestedType(n) => TypeDeclRef::Nested(n),
        })
    }
}

/// `extension P { typealias ... }`, possibly `where`-constrained.
#[derive(Clone, Debug)]
pub struct ProtocolExtension {
    pub protocol: String,
    pub module: String,
    pub constrained: bool,
    pub type_aliases: Vec<TypeAliasDecl>,
}

/// A borrowed type declaration of a protocol.
#[derive(Copy, Clone, Debug)]
pub enum TypeDeclRef<'a> {
    AssociatedType(&'a AssociatedTypeDecl),
    TypeAlias(&'a TypeAliasDecl),
    Nested(&'a NestedTypeDecl),
}

impl<'a> TypeDeclRef<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            TypeDeclRef::AssociatedType(a) => &a.name,
            TypeDeclRef::TypeAlias(t) => &t.name,
            TypeDeclRef::Nested(n) => &n.name,
        }
    }

    pub fn loc(&self) -> SourceLoc {
        match self {
            TypeDeclRef::AssociatedType(a) => a.loc,
            TypeDeclRef::TypeAlias(t) => t.loc,
            TypeDeclRef::Nested(n) => n.loc,
        }
    }

    pub fn range(&self) -> SourceLoc {
        match self {
            TypeDeclRef::AssociatedType(a) => a.range,
            TypeDeclRef::TypeAlias(t) => t.range,
            TypeDeclRef::Nested(n) => n.range,
        }
    }

    pub fn is_generic(&self) -> bool {
        match self {
            TypeDeclRef::AssociatedType(_) => false,
            TypeDeclRef::TypeAlias(t) => t.is_generic(),
            TypeDeclRef::Nested(n) => !n.generic_params.is_empty(),
        }
    }

    pub fn as_associated_type(&self) -> Option<&'a AssociatedTypeDecl> {
        match self {
            TypeDeclRef::AssociatedType(a) => Some(a),
            _ => None,
        }
    }

    /// The type this declaration stands for inside `protocol`.
    pub fn structural_type(&self, protocol: &str) -> Ty {
        match self {
            TypeDeclRef::AssociatedType(a) => Ty::assoc(Ty::self_ty(), protocol, &a.name),
            TypeDeclRef::TypeAlias(t) => t.underlying.clone(),
            TypeDeclRef::Nested(n) => Ty::con(&n.name),
        }
    }
}

/// A type declaration found by direct lookup into a protocol.
#[derive(Copy, Clone, Debug)]
pub struct LocalTypeDecl<'a> {
    pub decl: TypeDeclRef<'a>,
    pub module: &'a str,
    /// Declared in a `where`-constrained extension.
    pub constrained_extension: bool,
}

// ── Nominal types, aliases, conformances ───────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NominalKind {
    Struct,
    Enum,
    Class,
}

#[derive(Clone, Debug)]
pub struct NominalDecl {
    pub name: String,
    pub kind: NominalKind,
    pub signature: GenericSignature,
    /// The superclass, in terms of this declaration's generic parameters.
    pub superclass: Option<Ty>,
}

impl NominalDecl {
    pub fn new(name: &str, kind: NominalKind) -> Self {
        NominalDecl {
            name: name.to_string(),
            kind,
            signature: GenericSignature::default(),
            superclass: None,
        }
    }

    pub fn generic(mut self, signature: GenericSignature) -> Self {
        self.signature = signature;
        self
    }

    pub fn inherits_from(mut self, superclass: Ty) -> Self {
        self.superclass = Some(superclass);
        self
    }
}

/// A module-level (possibly generic) typealias.
#[derive(Clone, Debug)]
pub struct AliasDecl {
    pub name: String,
    pub signature: GenericSignature,
    pub underlying: Ty,
}

/// `extension Ty: Protocol where <conditional requirements>`
#[derive(Clone, Debug)]
pub struct ConformanceDecl {
    /// The conforming type, over `generic_params`.
    pub ty: Ty,
    pub protocol: String,
    pub generic_params: Vec<GenericParam>,
    pub conditional_requirements: Vec<Requirement>,
    pub type_witnesses: FxHashMap<String, Ty>,
}

impl ConformanceDecl {
    pub fn new(ty: Ty, protocol: &str) -> Self {
        ConformanceDecl {
            ty,
            protocol: protocol.to_string(),
            generic_params: Vec::new(),
            conditional_requirements: Vec::new(),
            type_witnesses: FxHashMap::default(),
        }
    }

    pub fn generic(mut self, params: Vec<GenericParam>) -> Self {
        self.generic_params = params;
        self
    }

    pub fn requires(mut self, req: Requirement) -> Self {
        self.conditional_requirements.push(req);
        self
    }

    pub fn witness(mut self, name: &str, ty: Ty) -> Self {
        self.type_witnesses.insert(name.to_string(), ty);
        self
    }
}

/// A conformance of a specific type, with the conformance's own generic
/// parameters substituted away.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConcreteConformance {
    pub ty: Ty,
    pub protocol: String,
    /// Requirements the conformance itself depends on.
    pub conditional_requirements: Vec<Requirement>,
}

/// Result of asking whether a type conforms to a protocol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConformanceRef {
    Invalid,
    /// Conforms, but there is no concrete conformance to inspect.
    Abstract { protocol: String },
    Concrete(ConcreteConformance),
}

impl ConformanceRef {
    pub fn is_invalid(&self) -> bool {
        matches!(self, ConformanceRef::Invalid)
    }

    pub fn is_concrete(&self) -> bool {
        matches!(self, ConformanceRef::Concrete(_))
    }

    pub fn conditional_requirements(&self) -> &[Requirement] {
        match self {
            ConformanceRef::Concrete(c) => &c.conditional_requirements,
            _ => &[],
        }
    }
}

// ── The module ─────────────────────────────────────────────────────────

/// All declarations visible to requirement lowering.
#[derive(Default, Debug)]
pub struct Module {
    name: String,
    /// Protocols in registration order.
    protocols: IndexMap<String, ProtocolDecl>,
    extensions: Vec<ProtocolExtension>,
    nominals: FxHashMap<String, NominalDecl>,
    aliases: FxHashMap<String, AliasDecl>,
    /// Conformances keyed by protocol name.
    conformances: FxHashMap<String, Vec<ConformanceDecl>>,
}

impl Module {
    pub fn new(name: &str) -> Self {
        Module { name: name.to_string(), ..Default::default() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn register_protocol(&mut self, decl: ProtocolDecl) {
        self.protocols.insert(decl.name.clone(), decl);
    }

    pub fn register_extension(&mut self, ext: ProtocolExtension) {
        self.extensions.push(ext);
    }

    pub fn register_nominal(&mut self, decl: NominalDecl) {
        self.nominals.insert(decl.name.clone(), decl);
    }

    pub fn register_alias(&mut self, decl: AliasDecl) {
        self.aliases.insert(decl.name.clone(), decl);
    }

    pub fn register_conformance(&mut self, decl: ConformanceDecl) {
        self.conformances.entry(decl.protocol.clone()).or_default().push(decl);
    }

    pub fn protocol(&self, name: &str) -> Option<&ProtocolDecl> {
        self.protocols.get(name)
    }

    pub fn protocols(&self) -> impl Iterator<Item = &ProtocolDecl> {
        self.protocols.values()
    }

    pub fn nominal(&self, name: &str) -> Option<&NominalDecl> {
        self.nominals.get(name)
    }

    pub fn alias(&self, name: &str) -> Option<&AliasDecl> {
        self.aliases.get(name)
    }

    // ── Protocol inheritance ───────────────────────────────────────

    /// Protocols named in `proto`'s inheritance clause or as `Self: P` in
    /// its `where` clause, compositions flattened, in order.
    pub fn direct_inherited_protocols(&self, proto: &ProtocolDecl) -> IndexSet<String> {
        let mut result = IndexSet::new();
        for entry in &proto.inherited {
            collect_protocols(&entry.ty, &mut result);
        }
        for written in &proto.where_clause {
            if let Requirement::Conformance { subject, constraint } = &written.req {
                let on_self = matches!(
                    subject.desugared(),
                    Ty::Param(p) if *p == GenericParam::protocol_self()
                );
                if on_self {
                    collect_protocols(constraint, &mut result);
                }
            }
        }
        result.shift_remove(&proto.name);
        result
    }

    /// Every protocol `proto` refines, transitively, breadth-first and
    /// without `proto` itself.
    pub fn inherited_protocols(&self, proto: &ProtocolDecl) -> IndexSet<String> {
        let mut result: IndexSet<String> = IndexSet::new();
        let mut next = 0;
        for name in self.direct_inherited_protocols(proto) {
            result.insert(name);
        }
        while next < result.len() {
            let current = result[next].clone();
            next += 1;
            if let Some(decl) = self.protocol(&current) {
                for name in self.direct_inherited_protocols(decl) {
                    if name != proto.name {
                        result.insert(name);
                    }
                }
            }
        }
        result
    }

    /// Whether `proto` is or refines `ancestor`.
    pub fn refines(&self, proto: &str, ancestor: &str) -> bool {
        if proto == ancestor {
            return true;
        }
        match self.protocol(proto) {
            Some(decl) => self.inherited_protocols(decl).contains(ancestor),
            None => false,
        }
    }

    /// Type declarations named `name` directly inside `proto` or its
    /// extensions.
    pub fn lookup_direct<'a>(
        &'a self,
        proto: &'a ProtocolDecl,
        name: &str,
    ) -> Vec<LocalTypeDecl<'a>> {
        let mut found: Vec<LocalTypeDecl<'a>> = proto
            .type_decls()
            .filter(|d| d.name() == name)
            .map(|decl| LocalTypeDecl { decl, module: &proto.module, constrained_extension: false })
            .collect();
        for ext in self.extensions.iter().filter(|e| e.protocol == proto.name) {
            for alias in ext.type_aliases.iter().filter(|t| t.name == name) {
                found.push(LocalTypeDecl {
                    decl: TypeDeclRef::TypeAlias(alias),
                    module: &ext.module,
                    constrained_extension: ext.constrained,
                });
            }
        }
        found
    }

    // ── Conformances ───────────────────────────────────────────────

    /// Does `ty` conform to `protocol`?
    ///
    /// A conformance to a protocol refining `protocol`, or a conformance
    /// of a superclass, also counts.
    pub fn lookup_conformance(&self, ty: &Ty, protocol: &str) -> ConformanceRef {
        let ty = ty.canonical();
        match &ty {
            Ty::Error => return ConformanceRef::Abstract { protocol: protocol.to_string() },
            Ty::Protocol(existential) => {
                let self_conforming = self.protocol(existential).is_some_and(|p| p.self_conforming);
                if self_conforming && self.refines(existential, protocol) {
                    return ConformanceRef::Abstract { protocol: protocol.to_string() };
                }
                return ConformanceRef::Invalid;
            }
            _ => {}
        }

        let mut current = Some(ty);
        let mut depth = 0;
        while let Some(candidate) = current {
            if let Some((decl, map)) = self.find_conformance(&candidate, protocol, |_| true) {
                let conditional_requirements = decl
                    .conditional_requirements
                    .iter()
                    .filter_map(|req| req.subst(&map, self))
                    .collect();
                return ConformanceRef::Concrete(ConcreteConformance {
                    ty: candidate,
                    protocol: protocol.to_string(),
                    conditional_requirements,
                });
            }
            depth += 1;
            if depth > MAX_SUPERCLASS_DEPTH {
                break;
            }
            current = self.superclass_of(&candidate);
        }
        ConformanceRef::Invalid
    }

    /// The witness for associated type `name` in `ty`'s conformance to
    /// `protocol` (or to any protocol, if `None`).
    pub fn type_witness(&self, ty: &Ty, protocol: Option<&str>, name: &str) -> Option<Ty> {
        let ty = ty.canonical();
        let has_witness = |decl: &ConformanceDecl| decl.type_witnesses.contains_key(name);
        let (decl, map) = match protocol {
            Some(protocol) => self.find_conformance(&ty, protocol, has_witness)?,
            None => self.protocols.keys().find_map(|p| {
                self.conformances
                    .get(p)?
                    .iter()
                    .filter(|d| has_witness(d))
                    .find_map(|d| match_conformance(d, &ty).map(|m| (d, m)))
            })?,
        };
        map.apply(&decl.type_witnesses[name], self)
    }

    /// `base.name`: a member type if `base` is a type parameter, otherwise
    /// the type witness, falling back to an unresolved member.
    pub fn member_type(&self, base: &Ty, protocol: &str, name: &str) -> Ty {
        if base.is_type_parameter() {
            return Ty::assoc(base.clone(), protocol, name);
        }
        self.type_witness(base, Some(protocol), name)
            .unwrap_or_else(|| Ty::assoc(base.clone(), protocol, name))
    }

    /// First conformance of `ty` to `protocol` or a refinement of it,
    /// direct conformances first.
    fn find_conformance(
        &self,
        ty: &Ty,
        protocol: &str,
        filter: impl Fn(&ConformanceDecl) -> bool,
    ) -> Option<(&ConformanceDecl, SubstitutionMap)> {
        let direct = std::iter::once(protocol);
        let refining = self
            .protocols
            .keys()
            .map(String::as_str)
            .filter(|p| *p != protocol && self.refines(p, protocol));
        for candidate in direct.chain(refining) {
            let Some(decls) = self.conformances.get(candidate) else {
                continue;
            };
            for decl in decls.iter().filter(|d| filter(d)) {
                if let Some(map) = match_conformance(decl, ty) {
                    return Some((decl, map));
                }
            }
        }
        None
    }

    // ── Classes ────────────────────────────────────────────────────

    /// The superclass of a class type, with generic arguments applied.
    pub fn superclass_of(&self, ty: &Ty) -> Option<Ty> {
        let Ty::Nominal(name, args) = ty.desugared() else {
            return None;
        };
        let decl = self.nominal(name)?;
        if decl.kind != NominalKind::Class {
            return None;
        }
        let superclass = decl.superclass.as_ref()?;
        SubstitutionMap::from_params(&decl.signature.params, args).apply(superclass, self)
    }

    /// Whether `sup` is `sub` or one of its superclasses.
    pub fn is_exact_superclass_of(&self, sup: &Ty, sub: &Ty) -> bool {
        let mut current = Some(sub.canonical());
        let mut depth = 0;
        while let Some(ty) = current {
            if ty.is_equal(sup) {
                return true;
            }
            depth += 1;
            if depth > MAX_SUPERCLASS_DEPTH {
                return false;
            }
            current = self.superclass_of(&ty);
        }
        false
    }

    pub fn is_class_type(&self, ty: &Ty) -> bool {
        match ty.desugared() {
            Ty::Nominal(name, _) => {
                self.nominal(name).is_some_and(|d| d.kind == NominalKind::Class)
            }
            _ => false,
        }
    }

    /// Class instances and class-bound existentials.
    pub fn is_any_class_reference_type(&self, ty: &Ty) -> bool {
        match ty.desugared() {
            Ty::Nominal(..) => self.is_class_type(ty),
            Ty::Protocol(name) => self.protocol(name).is_some_and(|p| p.is_objc),
            Ty::Composition(c) => {
                c.any_object || c.members.iter().any(|m| self.is_any_class_reference_type(m))
            }
            _ => false,
        }
    }
}

/// Flatten a constraint type into the protocols it names.
fn collect_protocols(ty: &Ty, out: &mut IndexSet<String>) {
    match ty.desugared() {
        Ty::Protocol(name) | Ty::Parameterized(name, _) => {
            out.insert(name.clone());
        }
        Ty::Composition(c) => {
            for member in &c.members {
                collect_protocols(member, out);
            }
        }
        _ => {}
    }
}

/// Match a conformance's pattern type against `ty`, binding the
/// conformance's generic parameters.
fn match_conformance(decl: &ConformanceDecl, ty: &Ty) -> Option<SubstitutionMap> {
    let mut map = SubstitutionMap::new();
    if bind_pattern(&decl.ty.canonical(), ty, &decl.generic_params, &mut map) {
        Some(map)
    } else {
        None
    }
}

fn bind_pattern(pattern: &Ty, ty: &Ty, params: &[GenericParam], map: &mut SubstitutionMap) -> bool {
    match (pattern, ty) {
        (Ty::Param(p), _) if params.contains(p) => match map.get(p) {
            Some(bound) => bound.is_equal(ty),
            None => {
                map.insert(p, ty.clone());
                true
            }
        },
        (Ty::Nominal(a, xs), Ty::Nominal(b, ys))
        | (Ty::Parameterized(a, xs), Ty::Parameterized(b, ys)) => {
            a == b && bind_all(xs, ys, params, map)
        }
        (Ty::Tuple(xs), Ty::Tuple(ys)) => bind_all(xs, ys, params, map),
        _ => pattern.is_equal(ty),
    }
}

fn bind_all(xs: &[Ty], ys: &[Ty], params: &[GenericParam], map: &mut SubstitutionMap) -> bool {
    if xs.len() != ys.len() {
        return false;
    }
    for (x, y) in xs.iter().zip(ys) {
        if !bind_pattern(x, y, params, map) {
            return false;
        }
    }
    true
}
