use std::{env, fs, thread};

use anyhow::{Context, Result};
use ftrl::{CsrMatrix, ModelBuilder, ModelSpec};
use log::info;
use rand::{Rng, SeedableRng, rngs::StdRng};

const N_FEATURES: usize = 1000;
const ACTIVE_PER_ROW: usize = 12;
const BATCH_SIZE: usize = 512;
const BATCHES: usize = 40;
const SIGNAL_FEATURES: usize = 20;
const DATA_SEED: u64 = 7;

/// Samples a batch of one-hot click rows whose labels follow a hidden sparse weight vector.
fn synth_batch(rng: &mut StdRng, hidden: &[f32]) -> Result<(CsrMatrix, Vec<f32>)> {
    let mut rows = Vec::with_capacity(BATCH_SIZE);
    let mut targets = Vec::with_capacity(BATCH_SIZE);

    for _ in 0..BATCH_SIZE {
        let mut cols: Vec<_> = (0..ACTIVE_PER_ROW)
            .map(|_| rng.random_range(0..N_FEATURES))
            .collect();
        cols.sort_unstable();
        cols.dedup();

        let score: f32 = cols.iter().map(|&j| hidden[j]).sum();
        let p = 1. / (1. + (-score).exp());
        targets.push(if rng.random_bool(p as f64) { 1. } else { 0. });
        rows.push(cols.into_iter().map(|j| (j, 1.)).collect::<Vec<_>>());
    }

    Ok((CsrMatrix::from_rows(N_FEATURES, rows)?, targets))
}

fn log_loss(predictions: &[f32], targets: &[f32]) -> f32 {
    let total: f32 = predictions
        .iter()
        .zip(targets)
        .map(|(&p, &y)| {
            let p = p.clamp(1e-7, 1. - 1e-7);
            -(y * p.ln() + (1. - y) * (1. - p).ln())
        })
        .sum();

    total / targets.len().max(1) as f32
}

fn main() -> Result<()> {
    env_logger::init();

    let spec: ModelSpec = match env::args().nth(1) {
        Some(path) => {
            let raw = fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing {path}"))?
        }
        None => ModelSpec::default(),
    };

    let workers = thread::available_parallelism().map_or(1, |n| n.get());
    info!(store:? = spec.store, workers = workers; "starting training");

    let mut model = ModelBuilder::new().build(spec)?;

    let mut rng = StdRng::seed_from_u64(DATA_SEED);
    let hidden: Vec<f32> = (0..N_FEATURES)
        .map(|j| match j {
            j if j >= SIGNAL_FEATURES => 0.,
            j if j % 2 == 0 => 1.5,
            _ => -1.5,
        })
        .collect();

    for batch in 0..BATCHES {
        let (x, targets) = synth_batch(&mut rng, &hidden)?;
        let predictions = model.fit_batch(&x, &targets, None, workers)?;
        info!(batch = batch, loss = log_loss(&predictions, &targets); "fitted batch");
    }

    let (x, targets) = synth_batch(&mut rng, &hidden)?;
    let predictions = model.predict_batch(&x, None, workers)?;
    let weights = model.derive_weights()?;
    let nonzero = weights.iter().filter(|w| **w != 0.).count();

    let summary = serde_json::json!({
        "params": model.params(),
        "n_features": model.n_features(),
        "nonzero_weights": nonzero,
        "holdout_log_loss": log_loss(&predictions, &targets),
    });

    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
