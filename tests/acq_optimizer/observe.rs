use mabopt::MabAcqOptimizer;
use mabopt::acquisition::LowerConfidenceBound;
use mabopt::buffer::DataBuffer;
use mabopt::space::SearchSpace;
use mabopt::Error;

use crate::common::{BowlModel, mixed_space};

fn evaluate(points: &[Vec<f64>]) -> Vec<f64> {
    points.iter().map(|p| p[0] + p[2]).collect()
}

fn total_pulls(opt: &MabAcqOptimizer) -> u64 {
    opt.bandit().unwrap().arm_statistics()[0]
        .iter()
        .map(|s| s.pulls)
        .sum()
}

#[test]
fn bandit_waits_for_n_init_observations() {
    let mut opt = MabAcqOptimizer::builder(mixed_space())
        .batch_size(4)
        .n_init(10)
        .n_restarts(4)
        .n_cand(16)
        .cont_n_iter(5)
        .seed(2)
        .build()
        .unwrap();
    let model = BowlModel::new(vec![0.25, 0.5, 1.0]);
    let acq = LowerConfidenceBound::default();
    let mut buffer = DataBuffer::new();

    for _ in 0..2 {
        let batch = opt.optimize(4, &model, &acq, None).unwrap();
        let y = evaluate(batch.points());
        buffer.append(batch.points(), &y);
        opt.post_observe(batch.points(), &y, &buffer).unwrap();
        assert!(!opt.bandit().unwrap().is_initialized());
        assert_eq!(total_pulls(&opt), 0);
    }

    // 12 observations: the whole buffer seeds the bandit even though
    // the batch size does not divide n_init.
    let batch = opt.optimize(4, &model, &acq, None).unwrap();
    let y = evaluate(batch.points());
    buffer.append(batch.points(), &y);
    opt.post_observe(batch.points(), &y, &buffer).unwrap();
    assert!(opt.bandit().unwrap().is_initialized());
    assert_eq!(total_pulls(&opt), 12);

    // Afterwards only the new round counts.
    let batch = opt.optimize(4, &model, &acq, None).unwrap();
    let y = evaluate(batch.points());
    buffer.append(batch.points(), &y);
    opt.post_observe(batch.points(), &y, &buffer).unwrap();
    assert_eq!(total_pulls(&opt), 16);
}

#[test]
fn invalid_category_is_reported() {
    let mut opt = MabAcqOptimizer::builder(mixed_space())
        .n_init(1)
        .seed(2)
        .build()
        .unwrap();
    let x = vec![vec![0.5, 0.25, 7.0]];
    let y = vec![1.0];
    let mut buffer = DataBuffer::new();
    buffer.append(&x, &y);

    let err = opt.post_observe(&x, &y, &buffer).unwrap_err();
    assert!(matches!(err, Error::InvalidCategory { position: 0, .. }));
    assert!(!opt.bandit().unwrap().is_initialized());
}

#[test]
fn wrong_point_length_is_reported() {
    let mut opt = MabAcqOptimizer::builder(mixed_space())
        .n_init(1)
        .seed(2)
        .build()
        .unwrap();
    let x = vec![vec![0.5, 1.0]];
    let y = vec![1.0];
    let mut buffer = DataBuffer::new();
    buffer.append(&x, &y);

    let err = opt.post_observe(&x, &y, &buffer).unwrap_err();
    assert!(matches!(
        err,
        Error::DimensionMismatch {
            expected: 3,
            got: 2
        }
    ));
}

#[test]
fn numeric_only_optimizer_ignores_observations() {
    let space = SearchSpace::builder()
        .continuous("x", 0.0, 1.0)
        .build()
        .unwrap();
    let mut opt = MabAcqOptimizer::builder(space)
        .n_init(1)
        .seed(2)
        .build()
        .unwrap();
    let mut buffer = DataBuffer::new();
    buffer.append(&[vec![0.5]], &[1.0]);
    opt.post_observe(&[vec![0.5]], &[1.0], &buffer).unwrap();
    assert!(opt.bandit().is_none());
}

#[test]
fn bandit_learns_the_best_category() {
    let space = SearchSpace::builder().nominal("c", 3).build().unwrap();
    let mut opt = MabAcqOptimizer::builder(space)
        .batch_size(3)
        .max_n_iter(40)
        .n_init(6)
        .seed(21)
        .build()
        .unwrap();
    let model = BowlModel::new(vec![0.0]);
    let acq = LowerConfidenceBound::default();
    let mut buffer = DataBuffer::new();

    for _ in 0..40 {
        let batch = opt.optimize(3, &model, &acq, None).unwrap();
        let y: Vec<f64> = batch
            .points()
            .iter()
            .map(|p| if p[0] == 0.0 { 0.0 } else { 10.0 })
            .collect();
        buffer.append(batch.points(), &y);
        opt.post_observe(batch.points(), &y, &buffer).unwrap();
    }

    let probs = opt.bandit().unwrap().probabilities(0);
    assert!(probs[0] > 0.5, "{probs:?}");
}
