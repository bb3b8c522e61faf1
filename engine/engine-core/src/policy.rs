//! Mapping between dense evaluator tensors and per-action distributions.
//!
//! The evaluator works over a fixed-size action space; the search works over
//! the legal actions of one state. These helpers convert in both directions.

/// Normalise raw evaluator output over the legal actions only.
///
/// Entries that are negative, NaN or infinite carry no mass. If the legal
/// actions carry no mass at all the result is uniform over `actions`, so the
/// caller never divides by zero. An empty action list yields an empty map.
pub fn normalize_over_legal<A, F>(actions: &[A], raw: &[f32], index: F) -> Vec<(A, f32)>
where
    A: Copy,
    F: Fn(A) -> usize,
{
    if actions.is_empty() {
        return Vec::new();
    }

    let masses: Vec<f32> = actions
        .iter()
        .map(|&action| {
            raw.get(index(action))
                .copied()
                .filter(|p| p.is_finite() && *p > 0.0)
                .unwrap_or(0.0)
        })
        .collect();

    let total: f32 = masses.iter().sum();
    if total > 0.0 && total.is_finite() {
        actions
            .iter()
            .zip(masses)
            .map(|(&action, mass)| (action, mass / total))
            .collect()
    } else {
        let uniform = 1.0 / actions.len() as f32;
        actions.iter().map(|&action| (action, uniform)).collect()
    }
}

/// Scatter a per-action distribution into a dense tensor of `size` entries.
///
/// Actions whose index falls outside the tensor are ignored.
pub fn visits_to_dense<A, F>(distribution: &[(A, f32)], size: usize, index: F) -> Vec<f32>
where
    A: Copy,
    F: Fn(A) -> usize,
{
    let mut dense = vec![0.0; size];
    for &(action, p) in distribution {
        if let Some(slot) = dense.get_mut(index(action)) {
            *slot += p;
        }
    }
    dense
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(a: usize) -> usize {
        a
    }

    #[test]
    fn test_normalize_restricts_to_legal_actions() {
        let raw = [0.1, 0.2, 0.3, 0.4];
        let mapped = normalize_over_legal(&[1usize, 3], &raw, identity);

        assert_eq!(mapped.len(), 2);
        assert_eq!(mapped[0].0, 1);
        assert!((mapped[0].1 - 0.2 / 0.6).abs() < 1e-6);
        assert!((mapped[1].1 - 0.4 / 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_zero_mass_falls_back_to_uniform() {
        let raw = [0.0, 0.0, 1.0];
        let mapped = normalize_over_legal(&[0usize, 1], &raw, identity);

        for (_, p) in &mapped {
            assert!((p - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn test_normalize_ignores_degenerate_entries() {
        let raw = [f32::NAN, -3.0, f32::INFINITY];
        let mapped = normalize_over_legal(&[0usize, 1, 2], &raw, identity);

        let sum: f32 = mapped.iter().map(|(_, p)| p).sum();
        assert!((sum - 1.0).abs() < 1e-6);
        for (_, p) in &mapped {
            assert!((p - 1.0 / 3.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_normalize_short_raw_vector() {
        // Index 5 is past the end of the raw policy and gets no mass
        let raw = [1.0, 1.0];
        let mapped = normalize_over_legal(&[0usize, 5], &raw, identity);
        assert!((mapped[0].1 - 1.0).abs() < 1e-6);
        assert!(mapped[1].1.abs() < 1e-6);
    }

    #[test]
    fn test_normalize_empty_actions() {
        let mapped = normalize_over_legal::<usize, _>(&[], &[1.0], identity);
        assert!(mapped.is_empty());
    }

    #[test]
    fn test_visits_to_dense() {
        let dense = visits_to_dense(&[(2usize, 0.75), (0, 0.25), (9, 1.0)], 4, identity);
        assert_eq!(dense, vec![0.25, 0.0, 0.75, 0.0]);
    }

    #[test]
    fn test_uniform_round_trip_marks_exactly_the_legal_set() {
        let legal = [0usize, 2, 5];
        let mapped = normalize_over_legal(&legal, &[1.0; 7], identity);
        let dense = visits_to_dense(&mapped, 7, identity);

        let nonzero: Vec<usize> = dense
            .iter()
            .enumerate()
            .filter(|(_, p)| **p > 0.0)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(nonzero, legal.to_vec());
    }
}
