//! Layered value resolution
//!
//! Settings that may be given on a resource, inherited from the global Module,
//! or fall back to a built-in default are all resolved through [`resolve`], so
//! the precedence lives in exactly one place.

/// Pick the first present value: `local`, then `fallback`, then `default`
pub fn resolve<T>(local: Option<T>, fallback: Option<T>, default: Option<T>) -> Option<T> {
    local.or(fallback).or(default)
}

/// [`resolve`] over borrowed options, cloning the winner
pub fn resolve_cloned<T: Clone>(
    local: Option<&T>,
    fallback: Option<&T>,
    default: Option<&T>,
) -> Option<T> {
    resolve(local, fallback, default).cloned()
}
