use mabopt::MabAcqOptimizer;
use mabopt::acquisition::{Acquisition, LowerConfidenceBound};
use mabopt::candidates::SobolCandidates;
use mabopt::refine::ContinuousOptimizer;
use mabopt::space::SearchSpace;

use crate::common::{BowlModel, assert_valid};

fn unit_cube(dims: usize) -> SearchSpace {
    (0..dims)
        .fold(SearchSpace::builder(), |b, i| {
            b.continuous(format!("x{i}"), 0.0, 1.0)
        })
        .build()
        .unwrap()
}

#[test]
fn without_restarts_returns_best_raw_candidates() {
    let seed = 3;
    let mut opt = MabAcqOptimizer::builder(unit_cube(5))
        .batch_size(5)
        .n_restarts(0)
        .n_cand(10)
        .seed(seed)
        .build()
        .unwrap();
    let model = BowlModel::new(vec![0.0; 5]);
    let acq = LowerConfidenceBound { beta: 0.0 };

    let batch = opt.optimize(5, &model, &acq, None).unwrap();

    // The optimizer seeds its Sobol stream from the first draw of its RNG.
    let mut rng = fastrand::Rng::with_seed(seed);
    let pool = SobolCandidates::new(5, &mut rng).draw(10);
    let scores = acq.evaluate(&pool, &model);
    let mut order: Vec<usize> = (0..pool.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));
    let expected: Vec<Vec<f64>> = order[..5].iter().map(|&i| pool[i].clone()).collect();

    assert_eq!(batch.points(), expected.as_slice());
}

#[test]
fn restarts_descend_toward_the_minimum() {
    let mut opt = MabAcqOptimizer::builder(unit_cube(2))
        .n_restarts(3)
        .n_cand(64)
        .continuous_optimizer(ContinuousOptimizer::adam(0.02))
        .cont_n_iter(200)
        .seed(11)
        .build()
        .unwrap();
    let model = BowlModel::new(vec![0.3, 0.7]);

    let batch = opt
        .optimize(1, &model, &LowerConfidenceBound { beta: 0.0 }, None)
        .unwrap();
    let p = &batch.points()[0];
    assert!((p[0] - 0.3).abs() < 0.05, "{p:?}");
    assert!((p[1] - 0.7).abs() < 0.05, "{p:?}");
}

#[test]
fn points_stay_inside_the_cube() {
    // Minimum outside the cube pushes iterates against the bounds.
    let mut opt = MabAcqOptimizer::builder(unit_cube(3))
        .batch_size(3)
        .n_restarts(3)
        .n_cand(32)
        .cont_optimizer("sgd")
        .cont_lr(0.5)
        .cont_n_iter(30)
        .seed(8)
        .build()
        .unwrap();
    let model = BowlModel::new(vec![2.0, -1.0, 0.5]);

    let batch = opt
        .optimize(3, &model, &LowerConfidenceBound { beta: 0.0 }, None)
        .unwrap();
    assert_valid(opt.space(), batch.points());
    for p in batch.points() {
        assert_eq!(p[0], 1.0);
        assert_eq!(p[1], 0.0);
    }
}

#[test]
fn discrete_only_space_snaps_to_grid() {
    let space = SearchSpace::builder()
        .integer("a", 1, 6)
        .discrete("b", vec![0.1, 0.5, 2.0])
        .build()
        .unwrap();
    let mut opt = MabAcqOptimizer::builder(space)
        .batch_size(2)
        .n_restarts(2)
        .n_cand(20)
        .cont_n_iter(10)
        .seed(9)
        .build()
        .unwrap();
    let model = BowlModel::new(vec![0.4, 0.2]);

    let batch = opt
        .optimize(2, &model, &LowerConfidenceBound::default(), None)
        .unwrap();
    assert_eq!(batch.len(), 2);
    assert_valid(opt.space(), batch.points());
    assert!(opt.bandit().is_none());
}

#[test]
fn default_pool_size_survives_many_rounds() {
    // 15 rounds of 5000 candidates run past one Sobol seed table.
    let mut opt = MabAcqOptimizer::builder(unit_cube(1))
        .n_restarts(1)
        .cont_n_iter(1)
        .seed(1)
        .build()
        .unwrap();
    let model = BowlModel::new(vec![0.2]);
    let acq = LowerConfidenceBound { beta: 0.0 };

    for _ in 0..15 {
        let batch = opt.optimize(1, &model, &acq, None).unwrap();
        assert_valid(opt.space(), batch.points());
    }
}
