//! Integration tests for reconciling a protocol's type declarations with
//! the same-named declarations of protocols it refines.

use genreq::builtins;
use genreq::config::{RequirementMachineMode, ResolutionConfig};
use genreq::diagnostics::{codes, Diagnostic, DiagnosticSink, FixIt, Severity};
use genreq::module::{AssociatedTypeDecl, Module, ProtocolDecl, ProtocolExtension, TypeAliasDecl};
use genreq::requirement::Requirement;
use genreq::ty::Ty;
use genreq::typealias::typealias_requirements;
use genreq_common::SourceLoc;

// ── Helpers ────────────────────────────────────────────────────────────

const MODULE: &str = "App";

fn module_with(protocols: Vec<ProtocolDecl>) -> Module {
    let mut module = builtins::standard_module();
    for proto in protocols {
        module.register_protocol(proto);
    }
    module
}

fn reconcile(
    module: &Module,
    name: &str,
    config: &ResolutionConfig,
) -> (Vec<Requirement>, Vec<Diagnostic>) {
    let mut sink = DiagnosticSink::new();
    let proto = module.protocol(name).expect("protocol registered");
    let reqs = typealias_requirements(module, proto, config, &mut sink);
    (reqs, sink.into_diagnostics())
}

fn self_assoc(protocol: &str, name: &str) -> Ty {
    Ty::assoc(Ty::self_ty(), protocol, name)
}

/// protocol Base { associatedtype Element }
fn base() -> ProtocolDecl {
    ProtocolDecl::new("Base", MODULE)
        .located(SourceLoc::new(9, 13))
        .with_associated_type(
            AssociatedTypeDecl::new("Element")
                .located(SourceLoc::new(31, 38), SourceLoc::new(16, 38)),
        )
}

/// protocol Refined: Base { <member> }
fn refined(member: impl FnOnce(ProtocolDecl) -> ProtocolDecl) -> ProtocolDecl {
    member(
        ProtocolDecl::new("Refined", MODULE)
            .located(SourceLoc::new(50, 57))
            .inherits(Ty::protocol("Base"), SourceLoc::new(59, 63)),
    )
}

/// associatedtype Element
fn bare_element() -> AssociatedTypeDecl {
    AssociatedTypeDecl::new("Element").located(SourceLoc::new(81, 88), SourceLoc::new(66, 88))
}

/// typealias Element = Int
fn element_alias() -> TypeAliasDecl {
    TypeAliasDecl::new("Element", Ty::int()).located(SourceLoc::new(76, 83), SourceLoc::new(66, 89))
}

fn insert_after(offset: u32, text: &str) -> FixIt {
    FixIt::InsertAfter { loc: SourceLoc::at(offset), text: text.to_string() }
}

// ── Redeclared associated types ───────────────────────────────────────

#[test]
fn constrained_redeclaration_warns_with_where_clause_fix_it() {
    // associatedtype Element: Hashable
    let module = module_with(vec![
        base(),
        refined(|p| {
            p.with_associated_type(
                AssociatedTypeDecl::new("Element")
                    .located(SourceLoc::new(81, 88), SourceLoc::new(66, 98))
                    .inherits(Ty::protocol("Hashable"), SourceLoc::new(90, 98)),
            )
        }),
    ]);
    let (reqs, diagnostics) = reconcile(&module, "Refined", &ResolutionConfig::default());

    assert!(reqs.is_empty());
    assert_eq!(diagnostics.len(), 1);
    let warning = &diagnostics[0];
    assert_eq!(warning.severity, Severity::Warning);
    assert_eq!(warning.code, codes::INHERITED_ASSOCIATED_TYPE_REDECLARED);
    assert_eq!(
        warning.message,
        "redeclaration of associated type 'Element' from protocol 'Base' is better expressed \
         as a 'where' clause on the protocol"
    );
    assert_eq!(warning.loc, SourceLoc::new(81, 88));
    assert_eq!(
        warning.fix_its,
        vec![
            insert_after(63, " where Element: Hashable"),
            FixIt::Remove { loc: SourceLoc::new(66, 98) },
        ]
    );
    assert_eq!(warning.notes.len(), 1);
    assert_eq!(warning.notes[0].code, codes::DECLARED_HERE);
    assert_eq!(warning.notes[0].loc, SourceLoc::new(31, 38));
}

#[test]
fn bare_redeclaration_warns_only_when_asked() {
    let module = module_with(vec![
        base(),
        refined(|p| p.with_associated_type(bare_element())),
    ]);

    let (_, quiet) = reconcile(&module, "Refined", &ResolutionConfig::default());
    assert!(quiet.is_empty());

    let config = ResolutionConfig { warn_implicit_overrides: true, ..ResolutionConfig::default() };
    let (_, loud) = reconcile(&module, "Refined", &config);
    assert_eq!(loud.len(), 1);
    assert_eq!(loud[0].code, codes::INHERITED_ASSOCIATED_TYPE_REDECLARED);
}

#[test]
fn override_and_default_suppress_the_warning() {
    let config = ResolutionConfig { warn_implicit_overrides: true, ..ResolutionConfig::default() };
    let decls = [
        AssociatedTypeDecl::new("Element").overriding(),
        AssociatedTypeDecl::new("Element").with_default(Ty::int()),
    ];
    for decl in decls {
        let decl = decl.inherits(Ty::protocol("Hashable"), SourceLoc::new(90, 98));
        let module = module_with(vec![base(), refined(|p| p.with_associated_type(decl))]);
        let (reqs, diagnostics) = reconcile(&module, "Refined", &config);
        assert!(reqs.is_empty());
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    }
}

#[test]
fn redeclaration_of_several_inherited_types_warns_once() {
    let other = ProtocolDecl::new("Other", MODULE)
        .with_associated_type(
            AssociatedTypeDecl::new("Element")
                .located(SourceLoc::new(120, 127), SourceLoc::INVALID),
        );
    let module = module_with(vec![
        base(),
        other,
        refined(|p| {
            p.inherits(Ty::protocol("Other"), SourceLoc::new(65, 70)).with_associated_type(
                AssociatedTypeDecl::new("Element")
                    .located(SourceLoc::new(81, 88), SourceLoc::new(66, 98))
                    .inherits(Ty::protocol("Hashable"), SourceLoc::new(90, 98)),
            )
        }),
    ]);
    let (reqs, diagnostics) = reconcile(&module, "Refined", &ResolutionConfig::default());
    assert!(reqs.is_empty());
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].message.contains("from protocol 'Base'"));
    assert_eq!(diagnostics[0].fix_its[0], insert_after(70, " where Element: Hashable"));
}

#[test]
fn associated_type_shadowing_inherited_typealias_is_an_error() {
    let base = ProtocolDecl::new("Base", MODULE)
        .with_type_alias(
            TypeAliasDecl::new("Element", Ty::int())
                .located(SourceLoc::new(26, 33), SourceLoc::new(16, 39)),
        );
    let module = module_with(vec![
        base,
        refined(|p| p.with_associated_type(bare_element())),
    ]);
    let (reqs, diagnostics) = reconcile(&module, "Refined", &ResolutionConfig::default());

    assert_eq!(reqs, vec![Requirement::same_type(self_assoc("Refined", "Element"), Ty::int())]);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity, Severity::Error);
    assert_eq!(diagnostics[0].code, codes::ASSOCIATED_TYPE_OVERRIDES_TYPEALIAS);
    assert_eq!(
        diagnostics[0].message,
        "associated type 'Element' is redundant with type 'Element' declared in inherited \
         protocol 'Base'"
    );
}

// ── Typealiases overriding associated types ───────────────────────────

#[test]
fn typealias_override_becomes_same_type() {
    let module = module_with(vec![
        base(),
        refined(|p| p.with_type_alias(element_alias())),
    ]);
    let (reqs, diagnostics) = reconcile(&module, "Refined", &ResolutionConfig::default());

    assert_eq!(reqs, vec![Requirement::same_type(self_assoc("Base", "Element"), Ty::int())]);
    assert_eq!(diagnostics.len(), 1);
    let warning = &diagnostics[0];
    assert_eq!(warning.code, codes::TYPEALIAS_OVERRIDES_ASSOCIATED_TYPE);
    assert_eq!(
        warning.message,
        "typealias overriding associated type 'Element' from protocol 'Base' is better \
         expressed as same-type constraint on the protocol"
    );
    assert_eq!(
        warning.fix_its,
        vec![
            insert_after(63, " where Element == Int"),
            FixIt::Remove { loc: SourceLoc::new(66, 89) },
        ]
    );
}

#[test]
fn extension_typealias_counts_only_from_the_same_module_unconstrained() {
    let alias = || vec![TypeAliasDecl::new("Element", Ty::string())];
    let cases = [
        (MODULE, false, 1),
        ("Elsewhere", false, 0),
        (MODULE, true, 0),
    ];
    for (module_name, constrained, expected) in cases {
        let mut module = module_with(vec![base(), refined(|p| p)]);
        module.register_extension(ProtocolExtension {
            protocol: "Refined".to_string(),
            module: module_name.to_string(),
            constrained,
            type_aliases: alias(),
        });
        let (reqs, diagnostics) = reconcile(&module, "Refined", &ResolutionConfig::default());
        assert_eq!(reqs.len(), expected, "{} constrained={}", module_name, constrained);
        assert_eq!(diagnostics.len(), expected, "{} constrained={}", module_name, constrained);
    }
}

// ── Diamonds ──────────────────────────────────────────────────────────

#[test]
fn typealias_and_associated_type_along_two_paths() {
    let p1 = ProtocolDecl::new("P1", MODULE)
        .with_associated_type(
            AssociatedTypeDecl::new("X").located(SourceLoc::new(30, 31), SourceLoc::INVALID),
        );
    let p2 = ProtocolDecl::new("P2", MODULE).with_type_alias(
        TypeAliasDecl::new("X", Ty::int()).located(SourceLoc::new(70, 71), SourceLoc::INVALID),
    );
    let q = ProtocolDecl::new("Q", MODULE)
        .located(SourceLoc::new(98, 99))
        .inherits(Ty::protocol("P1"), SourceLoc::new(101, 103))
        .inherits(Ty::protocol("P2"), SourceLoc::new(105, 107));
    let module = module_with(vec![p1, p2, q]);
    let (reqs, diagnostics) = reconcile(&module, "Q", &ResolutionConfig::default());

    assert_eq!(reqs, vec![Requirement::same_type(self_assoc("P1", "X"), Ty::int())]);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity, Severity::Note);
    assert_eq!(
        diagnostics[0].message,
        "type 'X' is inherited from protocols 'P1', 'P2' and is required to be the same type \
         in each"
    );
}

#[test]
fn conflicting_inherited_typealiases_yield_no_requirement() {
    let p1 = ProtocolDecl::new("P1", MODULE).with_type_alias(TypeAliasDecl::new("X", Ty::int()));
    let p2 = ProtocolDecl::new("P2", MODULE).with_type_alias(TypeAliasDecl::new("X", Ty::string()));
    let q = ProtocolDecl::new("Q", MODULE)
        .located(SourceLoc::new(98, 99))
        .inherits(Ty::protocol("P1"), SourceLoc::INVALID)
        .inherits(Ty::protocol("P2"), SourceLoc::INVALID);
    let module = module_with(vec![p1, p2, q]);
    let (reqs, diagnostics) = reconcile(&module, "Q", &ResolutionConfig::default());

    assert!(reqs.is_empty());
    // The mismatch itself has no location; only the ambiguity note remains.
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, codes::AMBIGUOUS_INHERITED_TYPE);
}

#[test]
fn name_inherited_through_a_chain_is_not_a_diamond() {
    let middle =
        ProtocolDecl::new("Middle", MODULE).inherits(Ty::protocol("Base"), SourceLoc::INVALID);
    let leaf =
        ProtocolDecl::new("Leaf", MODULE).inherits(Ty::protocol("Middle"), SourceLoc::INVALID);
    let module = module_with(vec![base(), middle, leaf]);
    let (reqs, diagnostics) = reconcile(&module, "Leaf", &ResolutionConfig::default());
    assert!(reqs.is_empty());
    assert!(diagnostics.is_empty());
}

#[test]
fn overriding_chain_requires_same_type_without_a_note() {
    let refined = refined(|p| {
        p.with_associated_type(
            AssociatedTypeDecl::new("Element")
                .overriding()
                .located(SourceLoc::new(84, 91), SourceLoc::new(66, 91)),
        )
    });
    let leaf = ProtocolDecl::new("Leaf", MODULE)
        .located(SourceLoc::new(104, 108))
        .inherits(Ty::protocol("Refined"), SourceLoc::new(110, 117));
    let module = module_with(vec![base(), refined, leaf]);

    let (reqs, diagnostics) = reconcile(&module, "Leaf", &ResolutionConfig::default());
    assert_eq!(
        reqs,
        vec![Requirement::same_type(
            self_assoc("Refined", "Element"),
            self_assoc("Base", "Element"),
        )]
    );
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
}

// ── Modes ─────────────────────────────────────────────────────────────

#[test]
fn non_authoritative_modes_record_requirements_silently() {
    let module = module_with(vec![
        base(),
        refined(|p| p.with_type_alias(element_alias())),
    ]);
    let (expected, _) = reconcile(&module, "Refined", &ResolutionConfig::default());
    for mode in [RequirementMachineMode::Disabled, RequirementMachineMode::Verify] {
        let config = ResolutionConfig::default().with_mode(mode);
        let (reqs, diagnostics) = reconcile(&module, "Refined", &config);
        assert_eq!(reqs, expected);
        assert!(diagnostics.is_empty());
    }
}
