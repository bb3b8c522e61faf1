//! Stateless exploration policy: PUCT scoring, root noise and the final
//! choice of move from root visit counts.

use rand::Rng;
use rand_distr::{Distribution, Gamma};

use crate::config::Exploration;
use crate::search::SearchError;

/// PUCT score of a child as seen from its parent.
///
/// `q` must already be expressed from the parent's point of view.
/// `score = q + C * prior * sqrt(parent_visits) / (1 + child_visits)`
#[inline]
pub fn puct_score(q: f32, prior: f32, parent_visits: u32, child_visits: u32, c: f32) -> f32 {
    let u = c * prior * (parent_visits as f32).sqrt() / (1.0 + child_visits as f32);
    q + u
}

/// Exploration constant for a parent with `parent_visits` visits.
#[inline]
pub fn exploration_constant(exploration: &Exploration, parent_visits: u32) -> f32 {
    match *exploration {
        Exploration::Fixed { c_puct } => c_puct,
        Exploration::Schedule { base, init } => {
            ((1.0 + parent_visits as f32 + base) / base).ln() + init
        }
    }
}

/// Draw `n` independent Gamma(concentration, 1) samples.
///
/// The samples are not normalised; each root child is perturbed by its own
/// draw.
pub fn gamma_noise<R: Rng + ?Sized>(
    n: usize,
    concentration: f32,
    rng: &mut R,
) -> Result<Vec<f32>, SearchError> {
    let gamma = Gamma::new(concentration as f64, 1.0).map_err(|e| {
        SearchError::InvalidConfig(format!("noise concentration {}: {}", concentration, e))
    })?;
    Ok((0..n).map(|_| gamma.sample(rng) as f32).collect())
}

/// Blend a prior with a noise sample.
#[inline]
pub fn mix_noise(prior: f32, sample: f32, fraction: f32) -> f32 {
    prior * (1.0 - fraction) + sample * fraction
}

/// Normalised visit fractions. Uniform when nothing has been visited.
pub fn visit_fractions(visits: &[u32]) -> Vec<f32> {
    let total: u64 = visits.iter().map(|&v| v as u64).sum();
    if total == 0 {
        if visits.is_empty() {
            return Vec::new();
        }
        return vec![1.0 / visits.len() as f32; visits.len()];
    }
    visits
        .iter()
        .map(|&v| (v as f64 / total as f64) as f32)
        .collect()
}

/// Sampling weights `exp(fraction_i * temperature)`, normalised to sum to 1.
pub fn softmax_visit_weights(visits: &[u32], temperature: f32) -> Vec<f32> {
    let logits: Vec<f32> = visit_fractions(visits)
        .into_iter()
        .map(|f| f * temperature)
        .collect();
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);

    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

/// Sample an index from a probability vector.
pub fn sample_index<R: Rng + ?Sized>(weights: &[f32], rng: &mut R) -> Option<usize> {
    let r: f32 = rng.gen();
    let mut cumsum = 0.0;

    for (i, &p) in weights.iter().enumerate() {
        cumsum += p;
        if r < cumsum {
            return Some(i);
        }
    }

    // Fallback to last non-zero entry (handles floating point issues)
    weights.iter().rposition(|&p| p > 0.0)
}

/// Index of the largest count; the first one wins ties.
pub fn argmax_first(visits: &[u32]) -> Option<usize> {
    let mut best: Option<(usize, u32)> = None;
    for (i, &v) in visits.iter().enumerate() {
        if best.map_or(true, |(_, b)| v > b) {
            best = Some((i, v));
        }
    }
    best.map(|(i, _)| i)
}

/// Pick which root child to play.
///
/// Before `sampling_threshold` plies the child is drawn from the visit
/// softmax; afterwards the most visited child is taken.
pub fn choose_index<R: Rng + ?Sized>(
    visits: &[u32],
    ply: u32,
    sampling_threshold: u32,
    temperature: f32,
    rng: &mut R,
) -> Option<usize> {
    if ply < sampling_threshold {
        sample_index(&softmax_visit_weights(visits, temperature), rng)
    } else {
        argmax_first(visits)
    }
}
