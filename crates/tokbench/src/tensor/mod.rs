//! Tensor helpers shared by the input builder and the decode engines.
//!
//! All tensors handled by the harness are rank 2 and follow the layout in
//! [`constant`]: batch first, sequence second.

pub mod constant;
pub mod operations;
