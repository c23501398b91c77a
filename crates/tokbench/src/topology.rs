//! Model topology derived from a compiled model's declared input shapes.

use std::fmt::{self, Display};

use crate::error::{BenchError, Result};
use crate::runtime::{CompiledModel, PartialShape};

/// Name of the key/value cache input, shaped `[2 * n_layers, batch, n_head, seq_len, head_size]`
pub const KV_CACHE_INPUT: &str = "kv_cache";

/// Name of the rotary cosine table input, shaped `[positions, rotary_dims / 2]`
pub const COS_TABLE_INPUT: &str = "cos_tab";

/// Scalar topology parameters of a causal language model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelTopology {
    pub n_layers: usize,
    pub n_head: usize,
    pub head_size: usize,
    pub rotary_dims: usize,
}

impl ModelTopology {
    /// Derives the topology from the declared shapes of a compiled model.
    ///
    /// # Errors
    ///
    /// [`BenchError::Shape`] when either input is missing or one of the
    /// dimensions read here is symbolic.
    pub fn from_model(model: &dyn CompiledModel) -> Result<Self> {
        let kv_cache = model.input_shape(KV_CACHE_INPUT);
        let cos_tab = model.input_shape(COS_TABLE_INPUT);
        Self::from_shapes(kv_cache.as_ref(), cos_tab.as_ref())
    }

    /// Derives the topology from the key/value cache and cosine table shapes.
    pub fn from_shapes(kv_cache: Option<&PartialShape>, cos_tab: Option<&PartialShape>) -> Result<Self> {
        let kv_cache = kv_cache
            .ok_or_else(|| BenchError::Shape(format!("model has no `{KV_CACHE_INPUT}` input")))?;
        let cos_tab = cos_tab
            .ok_or_else(|| BenchError::Shape(format!("model has no `{COS_TABLE_INPUT}` input")))?;

        if kv_cache.rank() != 5 {
            return Err(BenchError::Shape(format!(
                "`{KV_CACHE_INPUT}` must have rank 5, declared {kv_cache}"
            )));
        }
        if cos_tab.rank() != 2 {
            return Err(BenchError::Shape(format!(
                "`{COS_TABLE_INPUT}` must have rank 2, declared {cos_tab}"
            )));
        }

        let kv_layers = static_dim(kv_cache, KV_CACHE_INPUT, 0)?;
        if kv_layers % 2 != 0 {
            return Err(BenchError::Shape(format!(
                "`{KV_CACHE_INPUT}` dimension 0 holds key and value per layer and must be even, got {kv_layers}"
            )));
        }

        Ok(Self {
            n_layers: kv_layers / 2,
            n_head: static_dim(kv_cache, KV_CACHE_INPUT, 2)?,
            head_size: static_dim(kv_cache, KV_CACHE_INPUT, 4)?,
            // the cos table only stores half of the rotary dimensions
            rotary_dims: static_dim(cos_tab, COS_TABLE_INPUT, 1)? * 2,
        })
    }
}

fn static_dim(shape: &PartialShape, name: &str, index: usize) -> Result<usize> {
    shape
        .dim(index)
        .and_then(|dim| dim.get_length())
        .ok_or_else(|| {
            BenchError::Shape(format!("`{name}` dimension {index} is not static in {shape}"))
        })
}

impl Display for ModelTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "n_layers={}, n_head={}, head_size={}, rotary_dims={}",
            self.n_layers, self.n_head, self.head_size, self.rotary_dims
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kv(dims: Vec<Option<usize>>) -> PartialShape {
        PartialShape::from(dims)
    }

    #[test]
    fn test_topology_from_static_shapes() {
        let kv_cache = kv(vec![Some(4), Some(1), Some(4), None, Some(16)]);
        let cos_tab = kv(vec![None, Some(4)]);
        let topology = ModelTopology::from_shapes(Some(&kv_cache), Some(&cos_tab)).unwrap();
        assert_eq!(
            topology,
            ModelTopology { n_layers: 2, n_head: 4, head_size: 16, rotary_dims: 8 }
        );
    }

    #[test]
    fn test_rotary_dims_is_twice_cos_table() {
        let kv_cache = kv(vec![Some(64), None, Some(32), None, Some(128)]);
        let cos_tab = kv(vec![Some(2048), Some(32)]);
        let topology = ModelTopology::from_shapes(Some(&kv_cache), Some(&cos_tab)).unwrap();
        assert_eq!(topology.n_layers, 32);
        assert_eq!(topology.rotary_dims, 64);
    }

    #[test]
    fn test_missing_input_is_shape_error() {
        let cos_tab = kv(vec![None, Some(4)]);
        let err = ModelTopology::from_shapes(None, Some(&cos_tab)).unwrap_err();
        assert!(matches!(err, BenchError::Shape(msg) if msg.contains(KV_CACHE_INPUT)));

        let kv_cache = kv(vec![Some(4), Some(1), Some(4), None, Some(16)]);
        let err = ModelTopology::from_shapes(Some(&kv_cache), None).unwrap_err();
        assert!(matches!(err, BenchError::Shape(msg) if msg.contains(COS_TABLE_INPUT)));
    }

    #[test]
    fn test_dynamic_dimension_is_shape_error() {
        let kv_cache = kv(vec![Some(4), Some(1), None, None, Some(16)]);
        let cos_tab = kv(vec![None, Some(4)]);
        assert!(matches!(
            ModelTopology::from_shapes(Some(&kv_cache), Some(&cos_tab)),
            Err(BenchError::Shape(_))
        ));

        let kv_cache = kv(vec![Some(4), Some(1), Some(4), None, Some(16)]);
        let cos_tab = kv(vec![None, None]);
        assert!(matches!(
            ModelTopology::from_shapes(Some(&kv_cache), Some(&cos_tab)),
            Err(BenchError::Shape(_))
        ));
    }

    #[test]
    fn test_wrong_rank_and_odd_layers() {
        let cos_tab = kv(vec![None, Some(4)]);
        let short = kv(vec![Some(4), Some(1), Some(4)]);
        assert!(ModelTopology::from_shapes(Some(&short), Some(&cos_tab)).is_err());

        let odd = kv(vec![Some(3), Some(1), Some(4), None, Some(16)]);
        assert!(ModelTopology::from_shapes(Some(&odd), Some(&cos_tab)).is_err());
    }

    #[test]
    fn test_cos_table_must_be_rank_two() {
        let kv_cache = kv(vec![Some(4), Some(1), Some(4), None, Some(16)]);
        for cos_tab in [kv(vec![Some(4)]), kv(vec![None, Some(4), Some(1)])] {
            let err = ModelTopology::from_shapes(Some(&kv_cache), Some(&cos_tab)).unwrap_err();
            assert!(matches!(err, BenchError::Shape(msg) if msg.contains("rank 2")));
        }
    }

    #[test]
    fn test_display() {
        let topology = ModelTopology { n_layers: 2, n_head: 4, head_size: 16, rotary_dims: 8 };
        assert_eq!(topology.to_string(), "n_layers=2, n_head=4, head_size=16, rotary_dims=8");
    }
}
