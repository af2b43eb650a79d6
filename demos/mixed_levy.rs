//! Batch Bayesian optimization of a mixed-variable Levy function.
//!
//! Three continuous coordinates, one integer coordinate and a nominal
//! "offset" category that shifts the optimum and adds a penalty, so only
//! the zero-offset category can reach 0. A Gaussian Process surrogate
//! is refitted every round and [`MabAcqOptimizer`] proposes four points at a
//! time, learning which category works best as outcomes arrive.
//!
//! Run with: `cargo run --example mixed_levy --features gp`

use std::f64::consts::PI;

use mabopt::prelude::*;

const OFFSETS: [f64; 3] = [2.0, 0.0, -3.0];
const BATCH: usize = 4;
const N_INIT: usize = 20;
const ROUNDS: usize = 10;

/// Levy function over `x`; minimum 0 at all ones.
fn levy(x: &[f64]) -> f64 {
    let w: Vec<f64> = x.iter().map(|v| 1.0 + (v - 1.0) / 4.0).collect();
    let n = w.len();
    let head = (PI * w[0]).sin().powi(2);
    let body: f64 = w[..n - 1]
        .iter()
        .map(|wi| (wi - 1.0).powi(2) * (1.0 + 10.0 * (PI * wi + 1.0).sin().powi(2)))
        .sum();
    let tail = (w[n - 1] - 1.0).powi(2) * (1.0 + (2.0 * PI * w[n - 1]).sin().powi(2));
    head + body + tail
}

/// Raw point layout: `[x0, x1, x2, k, offset]`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn objective(raw: &[f64]) -> f64 {
    let offset = OFFSETS[raw[4] as usize];
    let x = [raw[0] - offset, raw[1] - offset, raw[2] - offset, raw[3]];
    levy(&x) + offset.abs()
}

fn main() -> mabopt::Result<()> {
    let space = SearchSpace::builder()
        .continuous("x0", -10.0, 10.0)
        .continuous("x1", -10.0, 10.0)
        .continuous("x2", -10.0, 10.0)
        .integer("k", -5, 5)
        .nominal("offset", OFFSETS.len())
        .build()?;

    let mut rng = fastrand::Rng::with_seed(0);
    let mut buffer = DataBuffer::new();

    // Random initial design.
    for _ in 0..N_INIT {
        let raw = vec![
            rng.f64() * 20.0 - 10.0,
            rng.f64() * 20.0 - 10.0,
            rng.f64() * 20.0 - 10.0,
            f64::from(rng.i8(-5..=5)),
            f64::from(rng.u8(0..3)),
        ];
        let x = space.from_raw(&raw)?;
        buffer.append(&[x], &[objective(&raw)]);
    }

    let mut optimizer = MabAcqOptimizer::builder(space)
        .batch_size(BATCH)
        .max_n_iter(ROUNDS)
        .n_init(N_INIT)
        .n_cand(512)
        .n_restarts(BATCH)
        .cont_lr(0.01)
        .cont_n_iter(50)
        .seed(0)
        .build()?;

    // Seed the bandit with the initial design.
    optimizer.post_observe(&[], &[], &buffer)?;

    for round in 0..ROUNDS {
        let mut gp = GaussianProcess::with_noise_variance(1e-4);
        gp.append_and_refit(buffer.x(), buffer.y())?;
        let acq = ExpectedImprovement {
            best_y: buffer.best_y().unwrap_or(f64::INFINITY),
        };

        let batch = optimizer.optimize(BATCH, &gp, &acq, None)?;
        let mut y = Vec::with_capacity(batch.len());
        for p in batch.points() {
            y.push(objective(&optimizer.space().to_raw(p)?));
        }
        buffer.append(batch.points(), &y);
        optimizer.post_observe(batch.points(), &y, &buffer)?;

        println!(
            "Round {}: batch best {:.4}, overall best {:.4}",
            round + 1,
            y.iter().copied().fold(f64::INFINITY, f64::min),
            buffer.best_y().unwrap_or(f64::NAN),
        );
    }

    if let Some(bandit) = optimizer.bandit() {
        println!("Offset probabilities: {:?}", bandit.probabilities(0));
    }

    Ok(())
}
