//! Reconciling a protocol's type declarations with same-named ones it
//! inherits.
//!
//! A protocol can see several declarations named `X`: its own associated
//! type or typealias, and associated types or typealiases of protocols it
//! refines. All of them denote one type, so each collision becomes a
//! same-type requirement. Redeclarations that would read better as `where`
//! clauses are diagnosed with fix-its.

use genreq_common::SourceLoc;
use indexmap::IndexMap;
use tracing::{debug, instrument};

use crate::config::ResolutionConfig;
use crate::desugar::Desugarer;
use crate::diagnostics::{codes, diagnose_requirement_errors, Diagnostic, DiagnosticSink, FixIt};
use crate::error::RequirementError;
use crate::module::{AssociatedTypeDecl, Module, ProtocolDecl, TypeAliasDecl, TypeDeclRef};
use crate::requirement::Requirement;
use crate::ty::Ty;

/// A type declaration of an inherited protocol.
#[derive(Copy, Clone)]
struct InheritedDecl<'a> {
    protocol: &'a ProtocolDecl,
    decl: TypeDeclRef<'a>,
}

impl InheritedDecl<'_> {
    fn structural_type(&self) -> Ty {
        self.decl.structural_type(&self.protocol.name)
    }
}

struct Recorder<'m> {
    desugarer: Desugarer<'m>,
    result: Vec<Requirement>,
    errors: Vec<RequirementError>,
}

impl Recorder<'_> {
    /// Two declarations that must denote the same type.
    fn same_type(&mut self, first: &Ty, second: &Ty) {
        self.desugarer.desugar_same_type(
            first,
            second,
            SourceLoc::INVALID,
            &mut self.result,
            &mut self.errors,
        );
    }
}

/// Same-type requirements between `proto`'s type declarations and the
/// same-named declarations of the protocols it refines.
///
/// Diagnostics go to `sink`, and only in the authoritative mode.
#[instrument(level = "debug", skip_all, fields(protocol = %proto.name))]
pub fn typealias_requirements(
    module: &Module,
    proto: &ProtocolDecl,
    config: &ResolutionConfig,
    sink: &mut DiagnosticSink,
) -> Vec<Requirement> {
    // @objc protocols have no associated types.
    if proto.is_objc {
        return Vec::new();
    }

    let emit = config.emits_diagnostics();
    let mut recorder = Recorder {
        desugarer: config.desugarer(module),
        result: Vec::new(),
        errors: Vec::new(),
    };

    let mut inherited: IndexMap<&str, Vec<InheritedDecl<'_>>> = IndexMap::new();
    for name in module.inherited_protocols(proto) {
        let Some(parent) = module.protocol(&name) else {
            continue;
        };
        for decl in parent.type_decls().filter(|d| !d.is_generic()) {
            inherited
                .entry(decl.name())
                .or_default()
                .push(InheritedDecl { protocol: parent, decl });
        }
    }

    // Own associated types that collide with inherited declarations.
    for assoc in proto.associated_types() {
        let Some(entries) = inherited.shift_remove(assoc.name.as_str()) else {
            continue;
        };
        let local = proto.associated_type_interface(&assoc.name);

        let mut should_warn = emit
            && !assoc.is_non_override
            && !assoc.is_override
            && assoc.default.is_none()
            && (!assoc.inherited.is_empty()
                || !assoc.where_clause.is_empty()
                || config.warn_implicit_overrides);

        for entry in &entries {
            if let Some(inherited_assoc) = entry.decl.as_associated_type() {
                // Only the first redeclaration is worth a warning.
                if should_warn {
                    sink.emit(redeclaration_warning(proto, assoc, entry.protocol, inherited_assoc));
                    should_warn = false;
                }
                continue;
            }

            if emit {
                sink.emit(Diagnostic::error(
                    codes::ASSOCIATED_TYPE_OVERRIDES_TYPEALIAS,
                    format!(
                        "associated type '{0}' is redundant with type '{0}' declared in inherited protocol '{1}'",
                        assoc.name, entry.protocol.name
                    ),
                    assoc.loc,
                ));
            }
            recorder.same_type(&local, &entry.structural_type());
        }
    }

    // Inherited names shadowed by a typealias of this protocol.
    let mut claimed = Vec::new();
    for (name, entries) in &inherited {
        let local = module
            .lookup_direct(proto, name)
            .into_iter()
            .find_map(|found| match found.decl {
                TypeDeclRef::TypeAlias(alias)
                    if found.module == proto.module && !found.constrained_extension =>
                {
                    Some(alias)
                }
                _ => None,
            });
        let Some(alias) = local else {
            continue;
        };

        let mut should_warn = emit;
        for entry in entries {
            if let Some(inherited_assoc) = entry.decl.as_associated_type() {
                recorder.same_type(&entry.structural_type(), &alias.underlying);
                if should_warn {
                    sink.emit(typealias_override_warning(
                        proto,
                        alias,
                        entry.protocol,
                        inherited_assoc,
                    ));
                    should_warn = false;
                }
                continue;
            }
            recorder.same_type(&entry.structural_type(), &alias.underlying);
        }
        claimed.push(*name);
    }
    inherited.retain(|name, _| !claimed.contains(name));

    // The rest: one name inherited along several paths.
    for (name, entries) in &inherited {
        if entries.len() < 2 {
            continue;
        }
        let first = entries[0].structural_type();
        for other in &entries[1..] {
            recorder.same_type(&first, &other.structural_type());
        }
        if emit && has_unrelated_sources(module, entries) {
            sink.emit(ambiguous_inheritance_note(proto, name, entries));
        }
    }

    if emit {
        diagnose_requirement_errors(&recorder.errors, false, sink);
    }
    debug!(count = recorder.result.len(), "collected typealias requirements");
    recorder.result
}

/// Where an equivalent `where`-clause entry would go, and the text that
/// introduces it.
fn where_insertion(proto: &ProtocolDecl) -> Option<(SourceLoc, &'static str)> {
    if let Some(last) = proto.where_clause.last() {
        return last
            .repr
            .filter(|r| r.range.is_valid())
            .map(|r| (r.range.end_loc(), ", "));
    }
    proto
        .inherited
        .last()
        .filter(|entry| entry.loc.is_valid())
        .map(|entry| (entry.loc.end_loc(), " where "))
}

/// `X: Inherited, ...` plus the associated type's own `where` clause.
fn associated_type_requirements_text(assoc: &AssociatedTypeDecl, start: &str) -> String {
    let mut out = start.to_string();
    let inherited: Vec<String> =
        assoc.inherited.iter().map(|e| format!("{}: {}", assoc.name, e.ty)).collect();
    out.push_str(&inherited.join(", "));
    if !assoc.where_clause.is_empty() {
        if !assoc.inherited.is_empty() {
            out.push_str(", ");
        }
        let clause: Vec<String> =
            assoc.where_clause.iter().map(|w| w.req.display_without_self()).collect();
        out.push_str(&clause.join(", "));
    }
    out
}

fn rewrite_fix_its(
    mut diagnostic: Diagnostic,
    proto: &ProtocolDecl,
    text: impl FnOnce(&str) -> String,
    range: SourceLoc,
) -> Diagnostic {
    if let Some((loc, start)) = where_insertion(proto) {
        diagnostic = diagnostic.with_fix_it(FixIt::InsertAfter { loc, text: text(start) });
    }
    if range.is_valid() {
        diagnostic = diagnostic.with_fix_it(FixIt::Remove { loc: range });
    }
    diagnostic
}

fn declared_here(name: &str, loc: SourceLoc) -> Diagnostic {
    Diagnostic::note(codes::DECLARED_HERE, format!("'{}' declared here", name), loc)
}

fn redeclaration_warning(
    proto: &ProtocolDecl,
    assoc: &AssociatedTypeDecl,
    from: &ProtocolDecl,
    inherited_assoc: &AssociatedTypeDecl,
) -> Diagnostic {
    let diagnostic = Diagnostic::warning(
        codes::INHERITED_ASSOCIATED_TYPE_REDECLARED,
        format!(
            "redeclaration of associated type '{}' from protocol '{}' is better expressed as a 'where' clause on the protocol",
            assoc.name, from.name
        ),
        assoc.loc,
    );
    let text = |start: &str| associated_type_requirements_text(assoc, start);
    rewrite_fix_its(diagnostic, proto, text, assoc.range)
        .with_note(declared_here(&inherited_assoc.name, inherited_assoc.loc))
}

fn typealias_override_warning(
    proto: &ProtocolDecl,
    alias: &TypeAliasDecl,
    from: &ProtocolDecl,
    inherited_assoc: &AssociatedTypeDecl,
) -> Diagnostic {
    let diagnostic = Diagnostic::warning(
        codes::TYPEALIAS_OVERRIDES_ASSOCIATED_TYPE,
        format!(
            "typealias overriding associated type '{}' from protocol '{}' is better expressed as same-type constraint on the protocol",
            alias.name, from.name
        ),
        alias.loc,
    );
    rewrite_fix_its(
        diagnostic,
        proto,
        |start| format!("{}{} == {}", start, alias.name, alias.underlying),
        alias.range,
    )
    .with_note(declared_here(&inherited_assoc.name, inherited_assoc.loc))
}

/// Whether two of the declaring protocols sit on separate inheritance
/// paths. A refinement chain redeclaring the name is not a diamond.
fn has_unrelated_sources(module: &Module, entries: &[InheritedDecl<'_>]) -> bool {
    entries.iter().enumerate().any(|(i, a)| {
        entries[i + 1..].iter().any(|b| {
            !module.refines(&a.protocol.name, &b.protocol.name)
                && !module.refines(&b.protocol.name, &a.protocol.name)
        })
    })
}

fn ambiguous_inheritance_note(
    proto: &ProtocolDecl,
    name: &str,
    entries: &[InheritedDecl<'_>],
) -> Diagnostic {
    let protocols: Vec<String> = entries.iter().map(|e| format!("'{}'", e.protocol.name)).collect();
    let mut diagnostic = Diagnostic::note(
        codes::AMBIGUOUS_INHERITED_TYPE,
        format!(
            "type '{}' is inherited from protocols {} and is required to be the same type in each",
            name,
            protocols.join(", ")
        ),
        proto.loc,
    );
    for entry in entries {
        diagnostic = diagnostic.with_note(declared_here(name, entry.decl.loc()));
    }
    diagnostic
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requirement::{RequirementRepr, WrittenRequirement};

    #[test]
    fn fix_it_text_joins_inheritance_and_where_clause() {
        let assoc = AssociatedTypeDecl::new("Element")
            .inherits(Ty::protocol("Hashable"), SourceLoc::INVALID)
            .with_where(WrittenRequirement::synthesized(Requirement::same_type(
                Ty::member(Ty::member(Ty::self_ty(), "Element"), "Magnitude"),
                Ty::int(),
            )));
        assert_eq!(
            associated_type_requirements_text(&assoc, " where "),
            " where Element: Hashable, Element.Magnitude == Int"
        );
    }

    #[test]
    fn insertion_point_prefers_trailing_where_clause() {
        let proto = ProtocolDecl::new("P", "Test")
            .inherits(Ty::protocol("Q"), SourceLoc::new(12, 13))
            .with_where(WrittenRequirement::new(
                Requirement::conformance(Ty::member(Ty::self_ty(), "A"), Ty::protocol("Equatable")),
                RequirementRepr { range: SourceLoc::new(20, 32), ..Default::default() },
            ));
        assert_eq!(where_insertion(&proto), Some((SourceLoc::at(32), ", ")));

        let bare =
            ProtocolDecl::new("P", "Test").inherits(Ty::protocol("Q"), SourceLoc::new(12, 13));
        assert_eq!(where_insertion(&bare), Some((SourceLoc::at(13), " where ")));
    }
}
