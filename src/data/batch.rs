use rand::{seq::SliceRandom, Rng};
use tracing::warn;

use crate::{
    data::triple::TensorTriple,
    error::{GanError, Result, ViolationCode},
};

/// Shuffled batches covering every record once. The last batch may be
/// smaller than `batch_size`.
pub fn create_batches<R: Rng + ?Sized>(triple: &TensorTriple, batch_size: usize, rng: &mut R) -> Result<Vec<TensorTriple>> {
    if batch_size == 0 {
        return Err(GanError::invalid("batch_size", ViolationCode::OutOfRange, "batch size must be at least 1"));
    }
    if triple.is_empty() {
        return Ok(Vec::new());
    }

    let effective = batch_size.min(triple.len());
    if effective < batch_size {
        warn!(
            "Dataset size ({}) smaller than batch size ({batch_size}). Using {effective}",
            triple.len()
        );
    }

    let mut indices: Vec<usize> = (0..triple.len()).collect();
    indices.shuffle(rng);

    Ok(indices.chunks(effective).map(|chunk| triple.select(chunk)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn keeps_every_record_once() {
        let triple = TensorTriple::zeros(20);
        let mut rng = StdRng::seed_from_u64(7);

        let batches = create_batches(&triple, 8, &mut rng).unwrap();
        let sizes: Vec<usize> = batches.iter().map(TensorTriple::len).collect();
        assert_eq!(sizes, [8, 8, 4]);

        let mut seen: Vec<String> = batches.into_iter().flat_map(|b| b.record_ids).collect();
        seen.sort_by_key(|id| id.parse::<usize>().unwrap());
        assert_eq!(seen, triple.record_ids);
    }

    #[test]
    fn clamps_oversized_batches() {
        let triple = TensorTriple::zeros(5);
        let batches = create_batches(&triple, 64, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 5);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let triple = TensorTriple::zeros(5);
        let err = create_batches(&triple, 0, &mut StdRng::seed_from_u64(1)).unwrap_err();
        assert!(matches!(err, GanError::InvalidArgument(_)));
    }
}
