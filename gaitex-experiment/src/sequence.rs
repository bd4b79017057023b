use crate::error::ExperimentError;
use rand::Rng;
use rand::seq::SliceRandom;

/// Builds the stimulus-index sequence for a block.
///
/// The base permutation of all `option_count` options is shuffled and consumed
/// in full chunks; when exhausted it is reshuffled and consumption continues.
/// This bounds both the longest run of repeats and the longest gap between
/// repeats of the same option, unlike independent draws.
pub fn build_stimulus_sequence<R: Rng>(
    total_trials: usize,
    option_count: usize,
    rng: &mut R,
) -> Result<Vec<usize>, ExperimentError> {
    if total_trials == 0 {
        return Err(ExperimentError::Config(
            "stimulus sequence needs at least one trial".into(),
        ));
    }
    if option_count == 0 {
        return Err(ExperimentError::Config(
            "stimulus sequence needs at least one option".into(),
        ));
    }

    let mut base: Vec<usize> = (0..option_count).collect();
    base.shuffle(rng);

    let mut sequence = Vec::with_capacity(total_trials);
    let mut cursor = 0;
    while sequence.len() < total_trials {
        if cursor >= base.len() {
            cursor = 0;
            base.shuffle(rng);
        }
        sequence.push(base[cursor]);
        cursor += 1;
    }

    Ok(sequence)
}

/// Builds the ISI durations for a block: `count` values evenly spaced over
/// `[average - variation, average + variation]`, in shuffled order.
///
/// The grid is deterministic by design; only the order is random.
pub fn build_isi_sequence<R: Rng>(
    count: usize,
    average: f32,
    variation: f32,
    rng: &mut R,
) -> Result<Vec<f32>, ExperimentError> {
    if count == 0 {
        return Err(ExperimentError::Config(
            "ISI sequence needs at least one entry".into(),
        ));
    }

    // A single entry has no grid to space over; the step below would divide
    // by zero.
    if count == 1 {
        return Ok(vec![average]);
    }

    let step = variation * 2.0 / (count - 1) as f32;
    let mut durations: Vec<f32> = (0..count)
        .map(|i| i as f32 * step + average - variation)
        .collect();
    durations.shuffle(rng);

    Ok(durations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn stimulus_sequence_consumes_balanced_chunks() {
        let mut rng = StdRng::seed_from_u64(7);
        for total in [1, 3, 4, 7, 100] {
            let seq = build_stimulus_sequence(total, 4, &mut rng).unwrap();
            assert_eq!(seq.len(), total);
            assert!(seq.iter().all(|&i| i < 4));

            // Every full 4-chunk is a permutation of 0..4.
            for chunk in seq.chunks_exact(4) {
                let mut sorted = chunk.to_vec();
                sorted.sort_unstable();
                assert_eq!(sorted, vec![0, 1, 2, 3], "chunk {chunk:?} unbalanced");
            }
        }
    }

    #[test]
    fn stimulus_sequence_rejects_zero_trials() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(matches!(
            build_stimulus_sequence(0, 4, &mut rng),
            Err(ExperimentError::Config(_))
        ));
    }

    #[test]
    fn isi_sequence_spans_the_range_evenly() {
        let mut rng = StdRng::seed_from_u64(21);
        let mut durations = build_isi_sequence(5, 1.0, 0.5, &mut rng).unwrap();
        durations.sort_by(|a, b| a.partial_cmp(b).unwrap());

        let expected = [0.5, 0.75, 1.0, 1.25, 1.5];
        for (got, want) in durations.iter().zip(expected) {
            assert!((got - want).abs() < 1e-6, "got {got}, want {want}");
        }
    }

    #[test]
    fn isi_sequence_single_entry_is_the_average() {
        let mut rng = StdRng::seed_from_u64(21);
        assert_eq!(build_isi_sequence(1, 1.2, 0.5, &mut rng).unwrap(), vec![1.2]);
    }

    #[test]
    fn isi_sequence_rejects_zero_count() {
        let mut rng = StdRng::seed_from_u64(21);
        assert!(build_isi_sequence(0, 1.0, 0.5, &mut rng).is_err());
    }
}
