use std::sync::atomic::{AtomicUsize, Ordering};

use mabopt::acquisition::{Acquisition, LowerConfidenceBound};
use mabopt::model::Model;
use mabopt::space::SearchSpace;
use mabopt::{Error, MabAcqOptimizer, TrustRegionManager};

use crate::common::{BowlModel, mixed_space};

struct FixedRegion {
    center: Vec<f64>,
}

impl TrustRegionManager for FixedRegion {
    fn center(&self) -> &[f64] {
        &self.center
    }

    fn radius(&self) -> f64 {
        0.1
    }
}

/// Counts how many points it is asked to score.
#[derive(Default)]
struct CountingAcquisition {
    evaluated: AtomicUsize,
}

impl Acquisition for CountingAcquisition {
    fn evaluate(&self, points: &[Vec<f64>], model: &dyn Model) -> Vec<f64> {
        self.evaluated.fetch_add(points.len(), Ordering::Relaxed);
        LowerConfidenceBound::default().evaluate(points, model)
    }
}

#[test]
fn trust_region_is_rejected() {
    let mut opt = MabAcqOptimizer::builder(mixed_space())
        .n_cand(16)
        .seed(1)
        .build()
        .unwrap();
    let model = BowlModel::new(vec![0.5; 3]);
    let region = FixedRegion {
        center: vec![0.5, 0.5, 0.0],
    };

    let err = opt
        .optimize(1, &model, &LowerConfidenceBound::default(), Some(&region))
        .unwrap_err();
    assert!(matches!(err, Error::TrustRegionUnsupported));
    assert_eq!(model.n_predictions(), 0);
}

#[test]
fn too_few_restarts_fail_before_any_evaluation() {
    let mut opt = MabAcqOptimizer::builder(mixed_space())
        .n_restarts(2)
        .n_cand(2)
        .seed(1)
        .build()
        .unwrap();
    let model = BowlModel::new(vec![0.5; 3]);
    let acq = CountingAcquisition::default();

    let err = opt.optimize(3, &model, &acq, None).unwrap_err();
    assert!(matches!(
        err,
        Error::InsufficientCandidates {
            n_suggestions: 3,
            n_restarts: 2,
            n_cand: 2,
        }
    ));
    assert_eq!(acq.evaluated.load(Ordering::Relaxed), 0);
    assert_eq!(model.n_predictions(), 0);
}

#[test]
fn too_few_candidates_without_restarts() {
    let mut opt = MabAcqOptimizer::builder(mixed_space())
        .n_restarts(0)
        .n_cand(4)
        .seed(1)
        .build()
        .unwrap();
    let model = BowlModel::new(vec![0.5; 3]);

    let err = opt
        .optimize(5, &model, &LowerConfidenceBound::default(), None)
        .unwrap_err();
    assert!(matches!(err, Error::InsufficientCandidates { .. }));
    assert_eq!(model.n_predictions(), 0);
}

#[test]
fn permutation_variables_are_unsupported() {
    let space = SearchSpace::builder()
        .continuous("x", 0.0, 1.0)
        .permutation("order", 4)
        .build()
        .unwrap();
    let err = MabAcqOptimizer::builder(space).build().err().unwrap();
    assert!(matches!(
        err,
        Error::UnsupportedVariable {
            dim: 1,
            kind: "permutation"
        }
    ));
}

#[test]
fn candidates_must_cover_restarts() {
    let err = MabAcqOptimizer::builder(mixed_space())
        .n_cand(3)
        .n_restarts(4)
        .build()
        .err()
        .unwrap();
    assert!(matches!(
        err,
        Error::CandidatesBelowRestarts {
            n_cand: 3,
            n_restarts: 4
        }
    ));
}

#[test]
fn unknown_optimizer_is_rejected() {
    let err = MabAcqOptimizer::builder(mixed_space())
        .cont_optimizer("lbfgs")
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, Error::UnknownOptimizer(name) if name == "lbfgs"));
}

#[test]
fn non_positive_learning_rate_is_rejected() {
    let err = MabAcqOptimizer::builder(mixed_space())
        .cont_lr(0.0)
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, Error::InvalidLearningRate(_)));
}
