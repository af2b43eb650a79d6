use mabopt::MabAcqOptimizer;
use mabopt::acquisition::LowerConfidenceBound;
use mabopt::space::SearchSpace;

use crate::common::{BowlModel, assert_valid};

fn categorical_space() -> SearchSpace {
    SearchSpace::builder()
        .nominal("color", 3)
        .ordinal("size", 4)
        .build()
        .unwrap()
}

#[test]
fn returns_bandit_assignments() {
    let mut opt = MabAcqOptimizer::builder(categorical_space())
        .batch_size(3)
        .seed(4)
        .build()
        .unwrap();
    let model = BowlModel::new(vec![0.0, 0.0]);

    let batch = opt
        .optimize(3, &model, &LowerConfidenceBound::default(), None)
        .unwrap();
    assert_eq!(batch.len(), 3);
    assert_valid(opt.space(), batch.points());
    // Categorical-only batches never consult the model.
    assert_eq!(model.n_predictions(), 0);
}

#[test]
fn noiseless_black_box_avoids_repeats() {
    let mut opt = MabAcqOptimizer::builder(categorical_space())
        .batch_size(5)
        .n_restarts(0)
        .n_cand(5)
        .noisy_black_box(false)
        .seed(10)
        .build()
        .unwrap();
    let model = BowlModel::new(vec![0.0, 0.0]);

    let batch = opt
        .optimize(5, &model, &LowerConfidenceBound::default(), None)
        .unwrap();
    let points = batch.points();
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            assert_ne!(points[i], points[j]);
        }
    }
}

#[test]
fn batch_size_tunes_bandit_exploration() {
    let build = |batch_size| {
        MabAcqOptimizer::builder(SearchSpace::builder().nominal("c", 6).build().unwrap())
            .batch_size(batch_size)
            .seed(3)
            .build()
            .unwrap()
    };
    let single = build(1);
    let wide = build(16);
    assert_eq!(wide.bandit().unwrap().config().batch_size, 16);
    assert!(single.bandit().unwrap().gammas()[0] > wide.bandit().unwrap().gammas()[0]);
}
