use mabopt::MabAcqOptimizer;
use mabopt::acquisition::ExpectedImprovement;
use mabopt::buffer::DataBuffer;
use mabopt::gp::GaussianProcess;
use mabopt::model::Model;

use crate::common::{assert_valid, mixed_space};

fn objective(raw: &[f64]) -> f64 {
    (raw[0] - 0.3).powi(2) + 0.1 * (raw[1] - 2.0).abs() + raw[2]
}

#[test]
fn optimizes_against_a_fitted_gp() {
    let space = mixed_space();
    let mut rng = fastrand::Rng::with_seed(5);
    let mut buffer = DataBuffer::new();
    for _ in 0..12 {
        let raw = vec![
            rng.f64() * 2.0 - 1.0,
            f64::from(rng.u8(0..5)),
            f64::from(rng.u8(0..3)),
        ];
        let x = space.from_raw(&raw).unwrap();
        buffer.append(&[x], &[objective(&raw)]);
    }
    let mut gp = GaussianProcess::with_noise_variance(1e-4);
    gp.append_and_refit(buffer.x(), buffer.y()).unwrap();

    let mut opt = MabAcqOptimizer::builder(space)
        .batch_size(3)
        .n_init(12)
        .n_restarts(3)
        .n_cand(64)
        .cont_n_iter(20)
        .seed(5)
        .build()
        .unwrap();
    let acq = ExpectedImprovement {
        best_y: buffer.best_y().unwrap(),
    };

    let batch = opt.optimize(3, &gp, &acq, None).unwrap();
    assert_eq!(batch.len(), 3);
    assert_valid(opt.space(), batch.points());
    assert_eq!(gp.len(), 12);

    let y: Vec<f64> = batch
        .points()
        .iter()
        .map(|p| objective(&opt.space().to_raw(p).unwrap()))
        .collect();
    buffer.append(batch.points(), &y);
    opt.post_observe(batch.points(), &y, &buffer).unwrap();
    assert!(opt.bandit().unwrap().is_initialized());
}
