//! Integration tests for requirement inference and realization of generic
//! declarations: requirements implied by generic applications, typealiases,
//! and differentiable function types.

use genreq::builtins;
use genreq::config::ResolutionConfig;
use genreq::infer::{infer_requirements, infer_with};
use genreq::module::{
    AliasDecl, GenericDecl, GenericSignature, Module, NominalDecl, NominalKind, TypeLoc,
};
use genreq::realize::Realizer;
use genreq::requirement::{Requirement, RequirementRepr, StructuralRequirement, WrittenRequirement};
use genreq::ty::{Differentiability, FnParam, GenericParam, Ty};
use genreq_common::SourceLoc;

// ── Helpers ────────────────────────────────────────────────────────────

fn t() -> Ty {
    Ty::param(0, 0, "T")
}

fn u() -> Ty {
    Ty::param(0, 1, "U")
}

fn infer(ty: &Ty, module: &Module) -> Vec<StructuralRequirement> {
    let mut result = Vec::new();
    infer_requirements(ty, SourceLoc::new(20, 26), module, &mut result);
    result
}

/// One requirement per line, inferred ones marked.
fn listing(reqs: &[StructuralRequirement]) -> String {
    reqs.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
}

fn repr(first: u32, separator: u32, second: u32) -> RequirementRepr {
    RequirementRepr {
        separator: SourceLoc::at(separator),
        first: SourceLoc::at(first),
        second: SourceLoc::at(second),
        range: SourceLoc::new(first, second + 1),
    }
}

// ── Generic applications ──────────────────────────────────────────────

#[test]
fn set_of_type_parameter_requires_hashable() {
    let module = builtins::standard_module();
    let result = infer(&Ty::set(t()), &module);
    assert_eq!(
        result,
        vec![StructuralRequirement::inferred(
            Requirement::conformance(t(), Ty::protocol("Hashable")),
            SourceLoc::new(20, 26),
        )]
    );
}

#[test]
fn dictionary_key_requires_hashable_value_does_not() {
    let module = builtins::standard_module();
    let result = infer(&Ty::nominal("Dictionary", vec![t(), u()]), &module);
    insta::assert_snapshot!(listing(&result), @"T: Hashable [inferred]");
}

#[test]
fn requirements_on_concrete_arguments_are_dropped() {
    let module = builtins::standard_module();
    assert!(infer(&Ty::set(Ty::int()), &module).is_empty());
    assert!(infer(&Ty::set(Ty::bool()), &module).is_empty());
    assert!(infer(&Ty::array(t()), &module).is_empty());
}

#[test]
fn every_nested_application_contributes() {
    let module = builtins::standard_module();
    let ty = Ty::Tuple(vec![
        Ty::optional(Ty::set(t())),
        Ty::fun(vec![Ty::set(Ty::member(u(), "Element"))], Ty::int()),
    ]);
    insta::assert_snapshot!(listing(&infer(&ty, &module)), @r"
    T: Hashable [inferred]
    U.Element: Hashable [inferred]
    ");
}

#[test]
fn generic_alias_contributes_its_own_requirements() {
    let mut module = builtins::standard_module();
    let element = GenericParam::new(0, 0, "Element");
    module.register_alias(AliasDecl {
        name: "SortedSet".to_string(),
        signature: GenericSignature::new(
            vec![element.clone()],
            vec![Requirement::conformance(Ty::Param(element.clone()), Ty::protocol("Comparable"))],
        ),
        underlying: Ty::set(Ty::Param(element)),
    });
    // Only the alias's arguments are walked, not its underlying type.
    let ty = Ty::alias("SortedSet", vec![t()], Ty::set(t()));
    insta::assert_snapshot!(listing(&infer(&ty, &module)), @"T: Comparable [inferred]");
}

// ── Differentiable functions ──────────────────────────────────────────

#[test]
fn differentiable_function_requires_differentiable_parameters_and_result() {
    let module = builtins::standard_module();
    let ty = Ty::differentiable_fun(
        vec![FnParam { ty: t(), no_derivative: false }, FnParam { ty: u(), no_derivative: true }],
        Ty::float(),
        Differentiability::Reverse,
    );
    // Float is already differentiable; U is excluded by @noDerivative.
    insta::assert_snapshot!(listing(&infer(&ty, &module)), @"T: Differentiable [inferred]");
}

#[test]
fn differentiable_function_without_the_protocol_infers_nothing() {
    let module = Module::new("Bare");
    let params = vec![FnParam { ty: t(), no_derivative: false }];
    let ty = Ty::differentiable_fun(params, t(), Differentiability::Normal);
    assert!(infer(&ty, &module).is_empty());
}

#[test]
fn inference_honors_configured_depth() {
    let module = builtins::standard_module();
    let config = ResolutionConfig { max_conditional_depth: 1, ..ResolutionConfig::default() };
    let mut desugarer = config.desugarer(&module);
    let mut result = Vec::new();
    infer_with(&mut desugarer, &Ty::set(t()), SourceLoc::INVALID, &mut result);
    assert_eq!(result.len(), 1);
    assert!(!result[0].loc.is_valid());
}

// ── Generic declarations ──────────────────────────────────────────────

#[test]
fn generic_function_requirements_in_source_order() {
    let module = builtins::standard_module();
    // func merge<T: Comparable, U>(_ a: Set<T>, _ b: [U]) where U == T
    let decl = GenericDecl::new("merge")
        .with_param(
            GenericParam::new(0, 0, "T"),
            vec![TypeLoc::new(Ty::protocol("Comparable"), SourceLoc::new(13, 23))],
        )
        .with_param(GenericParam::new(0, 1, "U"), vec![])
        .with_where(WrittenRequirement::new(Requirement::same_type(u(), t()), repr(60, 62, 65)))
        .with_signature_type(Ty::set(t()), SourceLoc::new(35, 41))
        .with_signature_type(Ty::array(u()), SourceLoc::new(48, 51));

    let realizer = Realizer::new(&module);
    let mut result = Vec::new();
    let mut errors = Vec::new();
    realizer.generic_decl_requirements(&decl, &mut result, &mut errors);

    assert!(errors.is_empty());
    insta::assert_snapshot!(listing(&result), @r"
    T: Comparable
    U == T
    T: Hashable [inferred]
    ");
    assert_eq!(result[0].loc, SourceLoc::new(13, 23));
    assert_eq!(result[1].loc, SourceLoc::at(62));
    assert_eq!(result[2].loc, SourceLoc::new(35, 41));
}

#[test]
fn where_clause_sides_are_inferred_before_the_requirement() {
    let module = builtins::standard_module();
    let decl = GenericDecl::new("f")
        .with_param(GenericParam::new(0, 0, "T"), vec![])
        .with_param(GenericParam::new(0, 1, "U"), vec![])
        .with_where(WrittenRequirement::new(
            Requirement::conformance(Ty::set(u()), Ty::parameterized("Collection", vec![t()])),
            repr(30, 37, 39),
        ));

    let realizer = Realizer::new(&module);
    let mut result = Vec::new();
    let mut errors = Vec::new();
    realizer.generic_decl_requirements(&decl, &mut result, &mut errors);

    // The conformance itself holds for any Set; its element binding does not.
    insta::assert_snapshot!(listing(&result), @r"
    U: Hashable [inferred]
    U == T
    ");
    assert_eq!(result[0].loc, SourceLoc::at(30));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].loc(), SourceLoc::at(37));
}

#[test]
fn inherited_entry_spelling_a_class_becomes_superclass() {
    let mut module = builtins::standard_module();
    module.register_nominal(NominalDecl::new("Shape", NominalKind::Class));
    let decl = GenericDecl::new("draw").with_param(
        GenericParam::new(0, 0, "T"),
        vec![TypeLoc::new(Ty::con("Shape"), SourceLoc::new(8, 13))],
    );
    let mut result = Vec::new();
    let mut errors = Vec::new();
    Realizer::new(&module).generic_decl_requirements(&decl, &mut result, &mut errors);
    assert!(errors.is_empty());
    assert_eq!(result[0].req, Requirement::superclass(t(), Ty::con("Shape")));
}
