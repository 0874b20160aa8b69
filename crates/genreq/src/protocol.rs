//! Structural requirements of protocols.
//!
//! [`structural_requirements`] lowers everything a protocol declaration
//! writes about `Self` and its associated types. [`collect_protocol_component`]
//! gathers that, plus the typealias reconciliation, for a protocol and every
//! protocol it depends on.

use std::collections::VecDeque;

use indexmap::IndexSet;
use rustc_hash::FxHashSet;
use tracing::{debug, instrument};

use crate::config::ResolutionConfig;
use crate::diagnostics::{diagnose_requirement_errors, DiagnosticSink};
use crate::module::{Module, ProtocolDecl};
use crate::realize::Realizer;
use crate::requirement::{LayoutConstraint, Requirement, StructuralRequirement};
use crate::typealias::typealias_requirements;
use crate::ty::Ty;

/// Lower a protocol's declaration surface:
/// 1. the inheritance clause, as requirements on `Self`
/// 2. the protocol's `where` clause
/// 3. `Self: AnyObject` for `@objc` protocols, which stop here
/// 4. each associated type's inheritance and `where` clauses
/// 5. `Self.X == Underlying` for each non-generic typealias `X` not shadowed
///    by an associated type
///
/// Nothing here is inferred from types. Errors are diagnosed into `sink`
/// in the authoritative mode only.
#[instrument(level = "debug", skip_all, fields(protocol = %proto.name))]
pub fn structural_requirements(
    module: &Module,
    proto: &ProtocolDecl,
    config: &ResolutionConfig,
    sink: &mut DiagnosticSink,
) -> Vec<StructuralRequirement> {
    let realizer = Realizer::with_config(module, config);
    let mut result = Vec::new();
    let mut errors = Vec::new();
    let self_ty = proto.self_type();

    realizer.realize_inherited_requirements(
        &proto.inherited,
        &self_ty,
        None,
        None,
        &mut result,
        &mut errors,
    );
    for written in &proto.where_clause {
        let repr = written.repr.as_ref();
        realizer.realize_requirement(&written.req, repr, None, &mut result, &mut errors);
    }

    if proto.is_objc {
        result.push(StructuralRequirement::inferred(
            Requirement::layout(self_ty, LayoutConstraint::Class),
            proto.loc,
        ));
    } else {
        let mut associated_types = FxHashSet::default();
        for assoc in proto.associated_types() {
            associated_types.insert(assoc.name.as_str());
            let subject = proto.associated_type_interface(&assoc.name);
            realizer.realize_inherited_requirements(
                &assoc.inherited,
                &subject,
                Some(proto),
                None,
                &mut result,
                &mut errors,
            );
            for written in &assoc.where_clause {
                let repr = written.repr.as_ref();
                realizer.realize_requirement(&written.req, repr, None, &mut result, &mut errors);
            }
        }

        for alias in proto.type_aliases() {
            if alias.is_generic() || associated_types.contains(alias.name.as_str()) {
                continue;
            }
            let subject = Ty::member(self_ty.clone(), &alias.name);
            result.push(StructuralRequirement::explicit(
                Requirement::same_type(subject, alias.underlying.clone()),
                alias.loc,
            ));
        }
    }

    if config.emits_diagnostics() {
        diagnose_requirement_errors(&errors, false, sink);
    }
    debug!(count = result.len(), errors = errors.len(), "collected structural requirements");
    result
}

/// Protocols named by conformance requirements among `requirements`, in
/// order of first appearance.
fn conformance_protocols(requirements: &[StructuralRequirement]) -> IndexSet<String> {
    requirements
        .iter()
        .filter_map(|r| r.req.protocol_name())
        .map(str::to_string)
        .collect()
}

/// The protocols `proto`'s structural requirements conform something to.
///
/// Diagnostics from computing the requirements are discarded.
pub fn protocol_dependencies(
    module: &Module,
    proto: &ProtocolDecl,
    config: &ResolutionConfig,
) -> IndexSet<String> {
    let mut scratch = DiagnosticSink::new();
    conformance_protocols(&structural_requirements(module, proto, config, &mut scratch))
}

/// Requirements of one protocol.
#[derive(Clone, Debug)]
pub struct ProtocolRequirements {
    pub protocol: String,
    pub structural: Vec<StructuralRequirement>,
    pub typealias: Vec<Requirement>,
}

/// A protocol together with every protocol it transitively depends on.
#[derive(Clone, Debug, Default)]
pub struct ProtocolComponent {
    /// In breadth-first order from the root.
    pub members: Vec<ProtocolRequirements>,
}

impl ProtocolComponent {
    pub fn protocols(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|m| m.protocol.as_str())
    }

    pub fn member(&self, protocol: &str) -> Option<&ProtocolRequirements> {
        self.members.iter().find(|m| m.protocol == protocol)
    }

    pub fn structural_requirements(&self) -> impl Iterator<Item = &StructuralRequirement> {
        self.members.iter().flat_map(|m| m.structural.iter())
    }

    pub fn typealias_requirements(&self) -> impl Iterator<Item = &Requirement> {
        self.members.iter().flat_map(|m| m.typealias.iter())
    }
}

/// Collect structural and typealias requirements for `root` and each
/// protocol reachable through conformance requirements, visiting every
/// protocol once.
#[instrument(level = "debug", skip_all, fields(protocol = %root.name))]
pub fn collect_protocol_component(
    module: &Module,
    root: &ProtocolDecl,
    config: &ResolutionConfig,
    sink: &mut DiagnosticSink,
) -> ProtocolComponent {
    let mut component = ProtocolComponent::default();
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut queue: VecDeque<&ProtocolDecl> = VecDeque::new();
    seen.insert(root.name.clone());
    queue.push_back(root);

    while let Some(proto) = queue.pop_front() {
        let structural = structural_requirements(module, proto, config, sink);
        let typealias = typealias_requirements(module, proto, config, sink);
        for dependency in conformance_protocols(&structural) {
            if let Some(decl) = module.protocol(&dependency) {
                if seen.insert(dependency) {
                    queue.push_back(decl);
                }
            }
        }
        component.members.push(ProtocolRequirements {
            protocol: proto.name.clone(),
            structural,
            typealias,
        });
    }

    debug!(protocols = component.members.len(), "collected protocol component");
    component
}
