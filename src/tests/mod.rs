use crate::{
    memory::fits,
    partition::{singletons, total_latency},
    prelude::*,
};
use itertools::Itertools;
use proptest::{prelude::*, sample::Index};

#[derive(Debug, Clone)]
struct OpSpec {
    matmul: bool,
    inputs: Vec<Index>,
    base_cost: f64,
    width: u64,
    height: u64,
}

fn op_spec() -> impl Strategy<Value = OpSpec> {
    (
        any::<bool>(),
        proptest::collection::vec(any::<Index>(), 1..3),
        0.0f64..5.0,
        1u64..33,
        1u64..33,
    )
        .prop_map(|(matmul, inputs, base_cost, width, height)| OpSpec {
            matmul,
            inputs,
            base_cost,
            width,
            height,
        })
}

prop_compose! {
    /// Random DAG in execution order: every op reads earlier tensors and writes a new one
    fn problem()(
        sources in proptest::collection::vec((1u64..33, 1u64..33), 1..4),
        ops in proptest::collection::vec(op_spec(), 1..9),
        capacity in 8.0f64..4096.0,
        bandwidth in 0.5f64..64.0,
        native in (1u64..17, 1u64..17),
    ) -> Problem {
        let mut b = Problem::builder(capacity, bandwidth, native);
        let mut tensors = sources.iter().map(|&(w, h)| b.tensor(w, h)).collect_vec();
        for op in ops {
            let inputs = op.inputs.iter().map(|i| tensors[i.index(tensors.len())]).collect_vec();
            let out = b.tensor(op.width, op.height);
            let kind = if op.matmul { OpKind::MatMul } else { OpKind::Generic };
            b.op(kind, inputs, [out], op.base_cost);
            tensors.push(out);
        }
        b.build().unwrap()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn partition_covers_every_op_once(p in problem()) {
        let plan = Planner::new(&p).plan();
        let ops = plan.subgraphs.iter().flat_map(|s| s.ops.iter().copied()).collect_vec();
        prop_assert_eq!(ops, (0..p.num_ops()).collect_vec());
        prop_assert!(plan.subgraphs.iter().all(|s| !s.ops.is_empty() && s.ops.len() <= 4));
    }

    #[test]
    fn granularities_are_valid(p in problem()) {
        let (native_w, native_h) = p.native_granularity;
        for s in Planner::new(&p).plan().subgraphs {
            let g = s.granularity;
            prop_assert!(g.width >= 1 && g.height >= 1 && g.split >= 1);
            prop_assert!(g.width.is_power_of_two() && g.height.is_power_of_two());
            prop_assert!(g.width <= native_w && g.height <= native_h);
            prop_assert!(g.split <= 16);
            prop_assert!(fits(&p, &s.ops, g) || g == Granularity::UNIT);
            prop_assert!(s.latency >= 0.0);
        }
    }

    #[test]
    fn feasible_plans_validate(p in problem()) {
        let plan = Planner::new(&p).plan();
        let feasible = plan.subgraphs.iter().all(|s| fits(&p, &s.ops, s.granularity));
        prop_assert_eq!(plan.validate(&p).is_ok(), feasible);
    }

    #[test]
    fn planning_is_deterministic(p in problem()) {
        let a = serde_json::to_string(&Planner::new(&p).plan().to_solution()).unwrap();
        let b = serde_json::to_string(&Planner::new(&p).plan().to_solution()).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn never_worse_than_singletons(p in problem()) {
        let config = PlannerConfig::default();
        let plan = Planner::new(&p).with_config(config).plan();
        let baseline = total_latency(&p, &singletons(&p), &config);
        prop_assert!(plan.total_latency() <= baseline * (1.0 + 1e-12) + 1e-12);
    }

    #[test]
    fn retained_tensors_cross_one_boundary(p in problem()) {
        let plan = Planner::new(&p).plan();
        for (current, next) in plan.subgraphs.iter().tuple_windows() {
            for &t in &current.retained {
                prop_assert!(current.ops.iter().any(|&op| p.op(op).outputs.contains(&t)));
                prop_assert!(next.ops.iter().any(|&op| p.op(op).inputs.contains(&t)));
            }
        }
        prop_assert!(plan.subgraphs.last().unwrap().retained.is_empty());
    }
}
