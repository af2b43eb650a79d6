use mabopt::MabAcqOptimizer;
use mabopt::acquisition::{Acquisition, LowerConfidenceBound};
use mabopt::candidates::SobolCandidates;
use mabopt::space::SearchSpace;

use crate::common::{BowlModel, RecordingModel, assert_valid, mixed_space};

fn optimizer(seed: u64) -> MabAcqOptimizer {
    MabAcqOptimizer::builder(mixed_space())
        .batch_size(4)
        .n_restarts(2)
        .n_cand(50)
        .cont_n_iter(20)
        .seed(seed)
        .build()
        .unwrap()
}

#[test]
fn batch_has_requested_size_and_valid_points() {
    let mut opt = optimizer(1);
    let model = BowlModel::new(vec![0.25, 0.5, 1.0]);
    let batch = opt
        .optimize(4, &model, &LowerConfidenceBound::default(), None)
        .unwrap();

    assert_eq!(batch.len(), 4);
    assert!(batch.advisory().is_none());
    assert_valid(opt.space(), batch.points());
    for p in batch.points() {
        // Nominal code stays an integer in range.
        assert!([0.0, 1.0, 2.0].contains(&p[2]), "{p:?}");
    }
}

#[test]
fn raw_points_use_declared_values() {
    let mut opt = optimizer(2);
    let model = BowlModel::new(vec![0.25, 0.5, 1.0]);
    let batch = opt
        .optimize(4, &model, &LowerConfidenceBound::default(), None)
        .unwrap();

    for p in batch.points() {
        let raw = opt.space().to_raw(p).unwrap();
        assert!((-1.0..=1.0).contains(&raw[0]));
        assert!([0.0, 1.0, 2.0, 3.0, 4.0].contains(&raw[1]), "{raw:?}");
    }
}

#[test]
fn caller_model_is_not_mutated() {
    let mut opt = optimizer(3);
    let model = BowlModel::new(vec![0.25, 0.5, 1.0]);
    opt.optimize(4, &model, &LowerConfidenceBound::default(), None)
        .unwrap();

    assert!(model.x_train.is_empty());
    assert!(model.n_predictions() > 0);
}

#[test]
fn points_are_pairwise_distinct() {
    let mut opt = optimizer(4);
    let model = BowlModel::new(vec![0.25, 0.5, 1.0]);
    let batch = opt
        .optimize(4, &model, &LowerConfidenceBound::default(), None)
        .unwrap();

    let points = batch.points();
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            assert_ne!(points[i], points[j]);
        }
    }
}

#[test]
fn same_seed_gives_same_batch() {
    let model = BowlModel::new(vec![0.25, 0.5, 1.0]);
    let acq = LowerConfidenceBound::default();

    let a = optimizer(42).optimize(4, &model, &acq, None).unwrap();
    let b = optimizer(42).optimize(4, &model, &acq, None).unwrap();
    assert_eq!(a, b);
}

#[test]
fn different_seeds_give_different_batches() {
    let model = BowlModel::new(vec![0.25, 0.5, 1.0]);
    let acq = LowerConfidenceBound::default();

    let a = optimizer(1).optimize(4, &model, &acq, None).unwrap();
    let b = optimizer(2).optimize(4, &model, &acq, None).unwrap();
    assert_ne!(a, b);
}

#[test]
fn consecutive_calls_continue_the_sequence() {
    let mut opt = optimizer(5);
    let model = BowlModel::new(vec![0.25, 0.5, 1.0]);
    let acq = LowerConfidenceBound::default();

    let first = opt.optimize(4, &model, &acq, None).unwrap();
    let second = opt.optimize(4, &model, &acq, None).unwrap();
    assert_ne!(first, second);
}

#[test]
fn mismatched_batch_size_still_succeeds_with_advisory() {
    let mut opt = optimizer(6);
    let model = BowlModel::new(vec![0.25, 0.5, 1.0]);
    let batch = opt
        .optimize(2, &model, &LowerConfidenceBound::default(), None)
        .unwrap();

    assert_eq!(batch.len(), 2);
    assert_eq!(
        batch.advisory(),
        Some(&mabopt::Advisory::BatchSizeMismatch {
            configured: 4,
            requested: 2,
        })
    );
}

#[test]
fn one_continuous_two_nominal_scenario() {
    let space = SearchSpace::builder()
        .continuous("x", 0.0, 1.0)
        .nominal("a", 4)
        .nominal("b", 4)
        .build()
        .unwrap();
    let mut opt = MabAcqOptimizer::builder(space)
        .batch_size(4)
        .n_restarts(2)
        .n_cand(50)
        .seed(17)
        .build()
        .unwrap();
    let model = BowlModel::new(vec![0.6, 1.0, 2.0]);

    let batch = opt
        .optimize(4, &model, &LowerConfidenceBound::default(), None)
        .unwrap();
    assert_eq!(batch.len(), 4);
    for p in batch.points() {
        assert!((0.0..=1.0).contains(&p[0]), "{p:?}");
        for code in &p[1..] {
            assert!([0.0, 1.0, 2.0, 3.0].contains(code), "{p:?}");
        }
    }
}

/// Two continuous variables and one nominal variable with many categories.
fn wide_nominal_space() -> SearchSpace {
    SearchSpace::builder()
        .continuous("x", 0.0, 1.0)
        .continuous("y", 0.0, 1.0)
        .nominal("c", 6)
        .build()
        .unwrap()
}

#[test]
fn each_group_sees_the_previous_groups_last_point() {
    // A noiseless black box draws distinct assignments, so every point is
    // its own group and every refit happens at a group boundary.
    let mut opt = MabAcqOptimizer::builder(wide_nominal_space())
        .batch_size(4)
        .noisy_black_box(false)
        .n_restarts(4)
        .n_cand(16)
        .cont_n_iter(5)
        .seed(12)
        .build()
        .unwrap();
    let model = RecordingModel::new(vec![0.4, 0.6, 2.0]);

    let batch = opt
        .optimize(4, &model, &LowerConfidenceBound::default(), None)
        .unwrap();
    let points = batch.points();
    let categories: Vec<f64> = points.iter().map(|p| p[2]).collect();
    for i in 0..categories.len() {
        for j in (i + 1)..categories.len() {
            assert_ne!(categories[i], categories[j], "{categories:?}");
        }
    }

    assert_eq!(model.refits(), points[..3].to_vec());
    assert!(model.inner.x_train.is_empty());
}

#[test]
fn groups_are_contiguous_and_hallucinated_in_order() {
    let space = SearchSpace::builder()
        .continuous("x", 0.0, 1.0)
        .nominal("c", 2)
        .build()
        .unwrap();
    let mut opt = MabAcqOptimizer::builder(space)
        .batch_size(6)
        .n_restarts(6)
        .n_cand(16)
        .cont_n_iter(5)
        .seed(4)
        .build()
        .unwrap();
    let model = RecordingModel::new(vec![0.5, 0.0]);

    let batch = opt
        .optimize(6, &model, &LowerConfidenceBound::default(), None)
        .unwrap();
    let points = batch.points();

    // First-seen grouping: once a category's run ends it never comes back.
    let mut finished: Vec<f64> = Vec::new();
    for pair in points.windows(2) {
        if pair[0][1] != pair[1][1] {
            assert!(!finished.contains(&pair[1][1]), "{points:?}");
            finished.push(pair[0][1]);
        }
    }

    // Within a group and across boundaries alike, every point is absorbed
    // before the next one is refined.
    assert_eq!(model.refits(), points[..5].to_vec());
}

#[test]
fn pool_mode_draws_a_fresh_pool_per_group() {
    let seed = 30;
    let n_cand = 8;
    let mut opt = MabAcqOptimizer::builder(wide_nominal_space())
        .batch_size(3)
        .noisy_black_box(false)
        .n_restarts(0)
        .n_cand(n_cand)
        .seed(seed)
        .build()
        .unwrap();
    let model = BowlModel::new(vec![0.4, 0.6, 2.0]);
    let acq = LowerConfidenceBound { beta: 0.0 };

    let batch = opt.optimize(3, &model, &acq, None).unwrap();

    // The optimizer seeds its Sobol stream from the first draw of its RNG.
    let mut rng = fastrand::Rng::with_seed(seed);
    let pools = SobolCandidates::new(2, &mut rng).draw(3 * n_cand);
    for (k, (point, pool)) in batch.points().iter().zip(pools.chunks(n_cand)).enumerate() {
        let rows: Vec<Vec<f64>> = pool
            .iter()
            .map(|numeric| vec![numeric[0], numeric[1], point[2]])
            .collect();
        let scores = acq.evaluate(&rows, &model);
        let best = (0..rows.len())
            .min_by(|&a, &b| scores[a].total_cmp(&scores[b]))
            .unwrap();
        assert_eq!(point, &rows[best], "group {k}");
    }
}
