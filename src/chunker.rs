// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fragmenting a byte blob into transaction-sized pieces and back.

use crate::program::constants::MAX_FRAGMENT_SIZE;

/// Default fragment size, the largest a single append accepts.
pub const DEFAULT_FRAGMENT_SIZE: usize = MAX_FRAGMENT_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ChunkError {
    #[error("fragment size must be greater than zero")]
    ZeroSize,

    #[error("fragment size {size} exceeds the {max}-byte append limit")]
    TooLarge { size: usize, max: usize },
}

/// Split `bytes` into contiguous slices of at most `size` bytes.
///
/// Every slice but the last is exactly `size` long. Empty input yields no
/// slices. `size` must fit in a single append.
pub fn split(bytes: &[u8], size: usize) -> Result<Vec<&[u8]>, ChunkError> {
    if size == 0 {
        return Err(ChunkError::ZeroSize);
    }
    if size > MAX_FRAGMENT_SIZE {
        return Err(ChunkError::TooLarge {
            size,
            max: MAX_FRAGMENT_SIZE,
        });
    }
    Ok(bytes.chunks(size).collect())
}

/// Concatenate fragments given in index order.
pub fn join<T: AsRef<[u8]>>(fragments: &[T]) -> Vec<u8> {
    let total = fragments.iter().map(|f| f.as_ref().len()).sum();
    let mut out = Vec::with_capacity(total);
    for fragment in fragments {
        out.extend_from_slice(fragment.as_ref());
    }
    out
}
