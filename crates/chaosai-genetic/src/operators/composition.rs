//! Composition: wrap two parents into a composite

use chaosai_common::{BaseScenario, CompositeDependency, CompositeScenario};
use rand::Rng;

/// Wrap `a` and `b` with a uniformly drawn dependency
pub fn compose<R: Rng + ?Sized>(a: BaseScenario, b: BaseScenario, rng: &mut R) -> BaseScenario {
    let dependency = CompositeDependency::random(rng);
    BaseScenario::Composite(CompositeScenario::new(a, b, dependency))
}

/// Two offspring, `(a, b)` and `(b, a)`, built from fresh copies
pub fn composition<R: Rng + ?Sized>(
    a: &BaseScenario,
    b: &BaseScenario,
    rng: &mut R,
) -> (BaseScenario, BaseScenario) {
    let first = compose(a.clone(), b.clone(), rng);
    let second = compose(b.clone(), a.clone(), rng);
    (first, second)
}
