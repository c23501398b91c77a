/// # Constants with reserved meanings in tokbench

/// In a given tensor shape, tokbench reserves the `0th` dimension for batching
pub const BATCH_DIM: usize = 0;

/// In a given tensor shape, tokbench reserves the `1st` dimension for sequence
pub const SEQ_DIM: usize = 1;

/// Additive attention bias applied to padded positions.
///
/// The most negative finite `f32`, so adding it to an attention logit drives the
/// softmax weight of that position to zero.
pub const MASK_SENTINEL: f32 = f32::MIN;
