//! Crossover: exchange genetic material between two parents
//!
//! Composite operands keep two children at every node, so structure is
//! exchanged at the B slot. Two plain scenarios exchange the values of the
//! parameters they share; each parameter keeps its own mutation law, so a
//! later mutation draws from the receiving family's domain again.

use std::collections::HashSet;
use std::mem;

use chaosai_common::{BaseScenario, Scenario};
use rand::Rng;
use tracing::debug;

/// Cross two parents, returning two offspring in parent order
pub fn crossover<R: Rng + ?Sized>(
    a: BaseScenario,
    b: BaseScenario,
    rate: f64,
    rng: &mut R,
) -> (BaseScenario, BaseScenario) {
    match (a, b) {
        (BaseScenario::Composite(mut a), BaseScenario::Composite(mut b)) => {
            mem::swap(&mut a.scenario_b, &mut b.scenario_b);
            (a.into(), b.into())
        }
        (BaseScenario::Composite(mut a), single @ BaseScenario::Single(_)) => {
            let displaced = mem::replace(a.scenario_b.as_mut(), single);
            (a.into(), displaced)
        }
        (single @ BaseScenario::Single(_), BaseScenario::Composite(mut b)) => {
            let displaced = mem::replace(b.scenario_b.as_mut(), single);
            (displaced, b.into())
        }
        (BaseScenario::Single(mut a), BaseScenario::Single(mut b)) => {
            swap_shared_parameters(&mut a, &mut b, rate, rng);
            (a.into(), b.into())
        }
    }
}

/// Swap each parameter both scenarios carry with probability `rate`
fn swap_shared_parameters<R: Rng + ?Sized>(
    a: &mut Scenario,
    b: &mut Scenario,
    rate: f64,
    rng: &mut R,
) {
    let names_b: HashSet<&str> = b.parameter_names().collect();
    let shared: Vec<String> = a
        .parameter_names()
        .filter(|name| names_b.contains(name))
        .map(str::to_string)
        .collect();

    // Known limitation: disjoint parents pass through and only mutation
    // diversifies them.
    if shared.is_empty() {
        debug!(a = %a.name, b = %b.name, "No common parameters, skipping crossover");
        return;
    }

    let rate = rate.clamp(0.0, 1.0);
    for name in &shared {
        if !rng.gen_bool(rate) {
            continue;
        }
        if let (Some(pa), Some(pb)) = (a.parameter_mut(name), b.parameter_mut(name)) {
            mem::swap(&mut pa.value, &mut pb.value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chaosai_common::{
        CompositeDependency, CompositeScenario, MutationPolicy, Parameter, ParameterValue,
    };
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn pod(namespace: &str, count: i64) -> Scenario {
        Scenario::new(
            "pod-scenarios",
            vec![
                Parameter::choice("NAMESPACE", namespace, &["a", "b"]),
                Parameter::uniform_int("DISRUPTION_COUNT", count, 1, 25),
            ],
        )
    }

    fn hog(cores: i64) -> Scenario {
        Scenario::new(
            "node-cpu-hog",
            vec![Parameter::uniform_int("NODE_CPU_CORE", cores, 1, 4)],
        )
    }

    fn composite(a: Scenario, b: Scenario) -> BaseScenario {
        CompositeScenario::new(a.into(), b.into(), CompositeDependency::None).into()
    }

    #[test]
    fn test_full_rate_swaps_every_shared_parameter() {
        let mut rng = StdRng::seed_from_u64(1);
        let (a, b) = crossover(pod("a", 1).into(), pod("b", 9).into(), 1.0, &mut rng);

        assert_eq!(a.identity(), "pod-scenarios(b, 9)");
        assert_eq!(b.identity(), "pod-scenarios(a, 1)");
    }

    #[test]
    fn test_zero_rate_keeps_parents() {
        let mut rng = StdRng::seed_from_u64(1);
        let (a, b) = crossover(pod("a", 1).into(), pod("b", 9).into(), 0.0, &mut rng);

        assert_eq!(a.identity(), "pod-scenarios(a, 1)");
        assert_eq!(b.identity(), "pod-scenarios(b, 9)");
    }

    #[test]
    fn test_disjoint_parameters_pass_through() {
        let mut rng = StdRng::seed_from_u64(1);
        let (a, b) = crossover(pod("a", 1).into(), hog(3).into(), 1.0, &mut rng);

        assert_eq!(a.identity(), "pod-scenarios(a, 1)");
        assert_eq!(b.identity(), "node-cpu-hog(3)");
    }

    #[test]
    fn test_swap_keeps_parameter_laws() {
        let mut rng = StdRng::seed_from_u64(4);
        let outage = Scenario::new(
            "application-outages",
            vec![Parameter::perturbed("DISRUPTION_COUNT", 300, 15, 10, 600)],
        );
        let (a, b) = crossover(pod("a", 1).into(), outage.into(), 1.0, &mut rng);

        let (BaseScenario::Single(a), BaseScenario::Single(b)) = (a, b) else {
            panic!("plain parents give plain offspring");
        };
        let received = a.parameter("DISRUPTION_COUNT").unwrap();
        assert_eq!(received.value, ParameterValue::Int(300));
        assert_eq!(
            received.policy(),
            &MutationPolicy::UniformInt { min: 1, max: 25 }
        );
        assert_eq!(
            b.parameter("DISRUPTION_COUNT").unwrap().value,
            ParameterValue::Int(1)
        );
    }

    #[test]
    fn test_shared_namespace_returns_to_family_domain() {
        let mut rng = StdRng::seed_from_u64(8);
        let candidates = vec!["shop".to_string(), "cart".to_string()];
        let pod = Scenario::new(
            "pod-scenarios",
            vec![Parameter::sampled("NAMESPACE", &candidates, &mut rng).unwrap()],
        );
        let hog = Scenario::new(
            "node-cpu-hog",
            vec![
                Parameter::uniform_int("NODE_CPU_CORE", 2, 1, 4),
                Parameter::fixed("NAMESPACE", "default"),
            ],
        );

        let (mut pod, mut hog) = crossover(pod.into(), hog.into(), 1.0, &mut rng);
        let namespace = |s: &BaseScenario| {
            s.leaves()[0].parameter("NAMESPACE").unwrap().value.to_string()
        };
        assert_eq!(namespace(&pod), "default");
        assert!(candidates.contains(&namespace(&hog)));

        for _ in 0..1_000 {
            crate::operators::mutate(&mut pod, 1.0, &mut rng);
            crate::operators::mutate(&mut hog, 1.0, &mut rng);
        }
        assert!(candidates.contains(&namespace(&pod)));
        assert!(pod.leaves()[0].parameters.iter().all(|p| p.in_domain()));
        assert_eq!(
            hog.leaves()[0].parameter("NAMESPACE").unwrap().policy(),
            &MutationPolicy::Fixed
        );
    }

    #[test]
    fn test_both_composite_swap_b_children() {
        let mut rng = StdRng::seed_from_u64(1);
        let (a, b) = crossover(
            composite(pod("a", 1), hog(1)),
            composite(pod("b", 2), hog(4)),
            0.5,
            &mut rng,
        );

        let names = |s: &BaseScenario| -> Vec<String> {
            s.leaves().iter().map(|l| l.identity()).collect()
        };
        assert_eq!(names(&a), vec!["pod-scenarios(a, 1)", "node-cpu-hog(4)"]);
        assert_eq!(names(&b), vec!["pod-scenarios(b, 2)", "node-cpu-hog(1)"]);
    }

    #[test]
    fn test_one_composite_exchanges_subtree() {
        let mut rng = StdRng::seed_from_u64(1);
        let (a, b) = crossover(
            composite(pod("a", 1), hog(1)),
            pod("b", 7).into(),
            0.5,
            &mut rng,
        );
        assert!(a.is_composite());
        assert_eq!(a.leaves()[1].identity(), "pod-scenarios(b, 7)");
        assert_eq!(b.identity(), "node-cpu-hog(1)");

        let (c, d) = crossover(
            pod("b", 7).into(),
            composite(pod("a", 1), hog(2)),
            0.5,
            &mut rng,
        );
        assert_eq!(c.identity(), "node-cpu-hog(2)");
        assert!(d.is_composite());
        assert_eq!(d.leaves()[1].identity(), "pod-scenarios(b, 7)");
    }
}
