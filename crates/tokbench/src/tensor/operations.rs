use candle_core::{DType, Device, Tensor};

use super::constant::{BATCH_DIM, MASK_SENTINEL, SEQ_DIM};
use crate::error::{BenchError, Result};

/// Builds a `(batch, seq)` `u32` tensor from row-major token rows.
///
/// # Errors
///
/// Returns [`BenchError::Tokenization`] when the rows are empty or ragged;
/// the tokenizer is expected to have padded every row to the same length.
pub fn matrix_from_rows(rows: &[Vec<u32>], device: &Device) -> Result<Tensor> {
    let batch = rows.len();
    let seq = rows.first().map(Vec::len).unwrap_or(0);
    if batch == 0 || seq == 0 {
        return Err(BenchError::Tokenization("tokenizer produced an empty batch".into()));
    }
    if let Some(bad) = rows.iter().position(|row| row.len() != seq) {
        return Err(BenchError::Tokenization(format!(
            "row {bad} has length {} but the batch is padded to {seq}",
            rows[bad].len()
        )));
    }
    let flat: Vec<u32> = rows.iter().flatten().copied().collect();
    Ok(Tensor::from_vec(flat, (batch, seq), device)?)
}

/// Returns the `(batch, seq)` dimensions of a rank 2 tensor.
pub fn batch_dims(tensor: &Tensor) -> Result<(usize, usize)> {
    let dims = tensor.dims();
    if dims.len() != 2 {
        return Err(BenchError::Shape(format!("expected a rank 2 tensor, got {:?}", dims)));
    }
    Ok((dims[BATCH_DIM], dims[SEQ_DIM]))
}

/// Converts a `{0, 1}` attention mask into an additive bias.
///
/// Valid positions (mask `1`) map to `0.0`, padded positions (mask `0`) map to
/// [`MASK_SENTINEL`]. Computed as `(1 - mask) * MASK_SENTINEL`.
pub fn additive_bias(mask: &Tensor) -> Result<Tensor> {
    let inverted = mask.to_dtype(DType::F32)?.affine(-1.0, 1.0)?;
    Ok(inverted.affine(MASK_SENTINEL as f64, 0.0)?)
}

/// Tiles the first sequence position of every row `times` times.
///
/// A `(batch, seq)` tensor becomes `(batch, times)` where every column equals
/// the original column `0`.
pub fn tile_first_position(tensor: &Tensor, times: usize) -> Result<Tensor> {
    if times == 0 {
        return Err(BenchError::Configuration("cannot tile a sequence to length 0".into()));
    }
    let (batch, _) = batch_dims(tensor)?;
    let first = tensor.narrow(SEQ_DIM, 0, 1)?;
    let tiled = first.repeat((1, times))?;
    debug_assert_eq!(tiled.dims(), &[batch, times]);
    Ok(tiled)
}

/// Pulls a `(batch, seq)` `u32` tensor back to host rows.
pub fn rows_of(tensor: &Tensor) -> Result<Vec<Vec<u32>>> {
    Ok(tensor.to_dtype(DType::U32)?.to_vec2::<u32>()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_from_rows_shape() {
        let rows = vec![vec![1, 2, 3], vec![4, 5, 6]];
        let t = matrix_from_rows(&rows, &Device::Cpu).unwrap();
        assert_eq!(batch_dims(&t).unwrap(), (2, 3));
        assert_eq!(rows_of(&t).unwrap(), rows);
    }

    #[test]
    fn test_matrix_from_rows_rejects_ragged() {
        let rows = vec![vec![1, 2, 3], vec![4, 5]];
        let err = matrix_from_rows(&rows, &Device::Cpu).unwrap_err();
        assert!(matches!(err, BenchError::Tokenization(_)));
    }

    #[test]
    fn test_matrix_from_rows_rejects_empty() {
        assert!(matrix_from_rows(&[], &Device::Cpu).is_err());
    }

    #[test]
    fn test_additive_bias_values() {
        let mask = matrix_from_rows(&[vec![0, 1, 1], vec![1, 1, 1]], &Device::Cpu).unwrap();
        let bias = additive_bias(&mask).unwrap();
        assert_eq!(bias.dims(), mask.dims());
        assert_eq!(bias.dtype(), DType::F32);
        let values = bias.to_vec2::<f32>().unwrap();
        assert_eq!(values[0][0], MASK_SENTINEL);
        assert_eq!(values[0][1], 0.0);
        assert_eq!(values[0][2], 0.0);
        assert!(values[1].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_tile_first_position() {
        let t = matrix_from_rows(&[vec![7, 8, 9], vec![3, 4, 5]], &Device::Cpu).unwrap();
        let tiled = tile_first_position(&t, 5).unwrap();
        assert_eq!(batch_dims(&tiled).unwrap(), (2, 5));
        let rows = rows_of(&tiled).unwrap();
        assert_eq!(rows[0], vec![7; 5]);
        assert_eq!(rows[1], vec![3; 5]);
    }

    #[test]
    fn test_tile_first_position_zero_is_rejected() {
        let t = matrix_from_rows(&[vec![7, 8]], &Device::Cpu).unwrap();
        assert!(matches!(tile_first_position(&t, 0), Err(BenchError::Configuration(_))));
    }

    #[test]
    fn test_batch_dims_requires_rank_two() {
        let t = Tensor::zeros(&[3], DType::U32, &Device::Cpu).unwrap();
        assert!(matches!(batch_dims(&t), Err(BenchError::Shape(_))));
    }
}
