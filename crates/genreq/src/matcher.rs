//! Lock-step structural matching of two types.
//!
//! The matcher walks generic arguments, tuple elements, function
//! parameters and results, and composition members of both types together.
//! Wherever the two structures diverge it hands the pair to
//! [`TypeMatcher::mismatch`] and does not look further inside.

use crate::ty::Ty;

/// Callbacks for [`match_types`].
pub trait TypeMatcher {
    /// Treat every type-parameter position as a mismatch, even when both
    /// sides are the same parameter.
    fn always_mismatch_type_parameters(&self) -> bool {
        false
    }

    /// Called at a divergent position with the canonical first type, the
    /// second type, and the first type as originally spelled. Returning
    /// `false` stops the walk.
    fn mismatch(&mut self, first: &Ty, second: &Ty, sugared_first: &Ty) -> bool;
}

/// Match `first` against `second`. Returns `false` if the walk was stopped
/// by a mismatch callback.
pub fn match_types<M: TypeMatcher + ?Sized>(matcher: &mut M, first: &Ty, second: &Ty) -> bool {
    visit(matcher, first, second)
}

fn visit<M: TypeMatcher + ?Sized>(matcher: &mut M, sugared_first: &Ty, second: &Ty) -> bool {
    let first = sugared_first.desugared();
    if matcher.always_mismatch_type_parameters()
        && (first.is_type_parameter() || second.is_type_parameter())
    {
        return matcher.mismatch(&first.canonical(), second, sugared_first);
    }

    match (first, second.desugared()) {
        (Ty::Nominal(a, xs), Ty::Nominal(b, ys))
        | (Ty::Parameterized(a, xs), Ty::Parameterized(b, ys))
            if a == b && xs.len() == ys.len() =>
        {
            visit_all(matcher, xs, ys)
        }
        (Ty::Tuple(xs), Ty::Tuple(ys)) if xs.len() == ys.len() => visit_all(matcher, xs, ys),
        (Ty::Fun(f), Ty::Fun(g))
            if f.differentiability == g.differentiability
                && f.params.len() == g.params.len()
                && f.params
                    .iter()
                    .zip(&g.params)
                    .all(|(p, q)| p.no_derivative == q.no_derivative) =>
        {
            for (p, q) in f.params.iter().zip(&g.params) {
                if !visit(matcher, &p.ty, &q.ty) {
                    return false;
                }
            }
            visit(matcher, &f.result, &g.result)
        }
        (Ty::Composition(c), Ty::Composition(d))
            if c.any_object == d.any_object && c.members.len() == d.members.len() =>
        {
            visit_all(matcher, &c.members, &d.members)
        }
        (
            Ty::Member { base: a, name: n, protocol: p },
            Ty::Member { base: b, name: m, protocol: q },
        ) if n == m && p == q => visit(matcher, a, b),
        _ if first.is_equal(second) => true,
        _ => matcher.mismatch(&first.canonical(), second, sugared_first),
    }
}

fn visit_all<M: TypeMatcher + ?Sized>(matcher: &mut M, xs: &[Ty], ys: &[Ty]) -> bool {
    for (x, y) in xs.iter().zip(ys) {
        if !visit(matcher, x, y) {
            return false;
        }
    }
    true
}
