//! Built-in declaration registration.
//!
//! Registers the standard nominal types (Int, String, Bool, Float, Double,
//! Array, Set, Dictionary, Optional), the standard protocols, and their
//! conformances into a [`Module`].

use genreq_common::SourceLoc;

use crate::module::{
    AssociatedTypeDecl, ConformanceDecl, GenericSignature, Module, NominalDecl, NominalKind,
    ProtocolDecl,
};
use crate::requirement::Requirement;
use crate::ty::{GenericParam, Ty};

/// Name of the module declaring the built-ins.
pub const STDLIB: &str = "Swift";

/// A fresh module named [`STDLIB`] with all built-ins registered.
pub fn standard_module() -> Module {
    let mut module = Module::new(STDLIB);
    register_builtins(&mut module);
    module
}

/// Register all built-in declarations into `module`.
///
/// After this call, the module contains:
/// - Protocols: Equatable, Hashable, Comparable, Sequence, Collection,
///   Error, Differentiable
/// - Scalars: Int, String, Bool, Float, Double
/// - Generic types: Array, Set (Element: Hashable), Dictionary
///   (Key: Hashable), Optional
/// - Conformances, including conditional ones such as
///   `Array<Element>: Equatable where Element: Equatable`
pub fn register_builtins(module: &mut Module) {
    // ── Protocols ──────────────────────────────────────────────────

    module.register_protocol(ProtocolDecl::new("Equatable", STDLIB));
    for name in ["Hashable", "Comparable"] {
        module.register_protocol(
            ProtocolDecl::new(name, STDLIB).inherits(Ty::protocol("Equatable"), SourceLoc::INVALID),
        );
    }
    module.register_protocol(
        ProtocolDecl::new("Sequence", STDLIB)
            .with_associated_type(AssociatedTypeDecl::new("Element"))
            .with_primary_associated_types(&["Element"]),
    );
    module.register_protocol(
        ProtocolDecl::new("Collection", STDLIB)
            .inherits(Ty::protocol("Sequence"), SourceLoc::INVALID)
            .with_primary_associated_types(&["Element"]),
    );
    module.register_protocol(ProtocolDecl::new("Error", STDLIB).self_conforming());
    module.register_protocol(
        ProtocolDecl::new("Differentiable", STDLIB)
            .with_associated_type(AssociatedTypeDecl::new("TangentVector")),
    );

    // ── Scalars ────────────────────────────────────────────────────

    for name in ["Int", "String", "Bool", "Float", "Double"] {
        module.register_nominal(NominalDecl::new(name, NominalKind::Struct));
        module.register_conformance(ConformanceDecl::new(Ty::con(name), "Hashable"));
    }
    for name in ["Int", "String", "Float", "Double"] {
        module.register_conformance(ConformanceDecl::new(Ty::con(name), "Comparable"));
    }
    for name in ["Float", "Double"] {
        module.register_conformance(
            ConformanceDecl::new(Ty::con(name), "Differentiable")
                .witness("TangentVector", Ty::con(name)),
        );
    }

    // ── Generic types ──────────────────────────────────────────────

    let first = GenericParam::new(0, 0, "Element");
    let element = Ty::Param(first.clone());

    module.register_nominal(
        NominalDecl::new("Array", NominalKind::Struct)
            .generic(GenericSignature::new(vec![first.clone()], vec![])),
    );
    register_container_conformances(module, "Array", &first);

    module.register_nominal(NominalDecl::new("Set", NominalKind::Struct).generic(
        GenericSignature::new(
            vec![first.clone()],
            vec![Requirement::conformance(element.clone(), Ty::protocol("Hashable"))],
        ),
    ));
    module.register_conformance(
        ConformanceDecl::new(Ty::set(element.clone()), "Collection")
            .generic(vec![first.clone()])
            .witness("Element", element),
    );
    module.register_conformance(
        ConformanceDecl::new(Ty::set(Ty::Param(first.clone())), "Hashable").generic(vec![first]),
    );

    let key = GenericParam::new(0, 0, "Key");
    let value = GenericParam::new(0, 1, "Value");
    let dictionary =
        Ty::nominal("Dictionary", vec![Ty::Param(key.clone()), Ty::Param(value.clone())]);
    module.register_nominal(NominalDecl::new("Dictionary", NominalKind::Struct).generic(
        GenericSignature::new(
            vec![key.clone(), value.clone()],
            vec![Requirement::conformance(Ty::Param(key.clone()), Ty::protocol("Hashable"))],
        ),
    ));
    module.register_conformance(
        ConformanceDecl::new(dictionary.clone(), "Collection")
            .generic(vec![key.clone(), value.clone()])
            .witness("Element", Ty::Tuple(vec![Ty::Param(key.clone()), Ty::Param(value.clone())])),
    );
    module.register_conformance(
        ConformanceDecl::new(dictionary, "Equatable")
            .generic(vec![key, value.clone()])
            .requires(Requirement::conformance(Ty::Param(value), Ty::protocol("Equatable"))),
    );

    let wrapped = GenericParam::new(0, 0, "Wrapped");
    module.register_nominal(
        NominalDecl::new("Optional", NominalKind::Enum)
            .generic(GenericSignature::new(vec![wrapped.clone()], vec![])),
    );
    for protocol in ["Equatable", "Hashable"] {
        module.register_conformance(
            ConformanceDecl::new(Ty::optional(Ty::Param(wrapped.clone())), protocol)
                .generic(vec![wrapped.clone()])
                .requires(Requirement::conformance(
                    Ty::Param(wrapped.clone()),
                    Ty::protocol(protocol),
                )),
        );
    }
}

/// `Name<Element>: Collection`, plus `Equatable` and `Hashable` when the
/// element is.
fn register_container_conformances(module: &mut Module, name: &str, param: &GenericParam) {
    let element = Ty::Param(param.clone());
    let container = Ty::nominal(name, vec![element.clone()]);
    module.register_conformance(
        ConformanceDecl::new(container.clone(), "Collection")
            .generic(vec![param.clone()])
            .witness("Element", element.clone()),
    );
    for protocol in ["Equatable", "Hashable"] {
        module.register_conformance(
            ConformanceDecl::new(container.clone(), protocol)
                .generic(vec![param.clone()])
                .requires(Requirement::conformance(element.clone(), Ty::protocol(protocol))),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_are_hashable() {
        let module = standard_module();
        for name in ["Int", "String", "Bool", "Float", "Double"] {
            assert!(module.lookup_conformance(&Ty::con(name), "Hashable").is_concrete(), "{name}");
            assert!(module.lookup_conformance(&Ty::con(name), "Equatable").is_concrete(), "{name}");
        }
    }

    #[test]
    fn set_requires_hashable_elements() {
        let module = standard_module();
        let set = module.nominal("Set").unwrap();
        assert_eq!(set.signature.requirements.len(), 1);
        assert_eq!(set.signature.requirements[0].to_string(), "Element: Hashable");
    }

    #[test]
    fn container_witnesses() {
        let module = standard_module();
        assert_eq!(
            module.type_witness(&Ty::set(Ty::int()), Some("Sequence"), "Element"),
            Some(Ty::int())
        );
        let dict = Ty::nominal("Dictionary", vec![Ty::string(), Ty::bool()]);
        assert_eq!(
            module.type_witness(&dict, Some("Collection"), "Element"),
            Some(Ty::Tuple(vec![Ty::string(), Ty::bool()]))
        );
        assert_eq!(
            module.type_witness(&Ty::float(), Some("Differentiable"), "TangentVector"),
            Some(Ty::float())
        );
    }

    #[test]
    fn optional_is_conditionally_hashable() {
        let module = standard_module();
        let conf = module.lookup_conformance(&Ty::optional(Ty::string()), "Hashable");
        assert_eq!(
            conf.conditional_requirements(),
            &[Requirement::conformance(Ty::string(), Ty::protocol("Hashable"))]
        );
    }
}
