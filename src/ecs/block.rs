//! Growable storage blocks
//!
//! Entity data is stored in per-kind blocks indexed by the entity id index.
//! Blocks grow geometrically while small and more conservatively once they
//! pass [`LARGE_BLOCK`] slots.

/// Block length above which growth switches from doubling to 25%.
pub const LARGE_BLOCK: usize = 64;

/// Length a block of `current` slots must grow to so that `required` slots fit.
#[must_use]
pub fn grown_len(current: usize, required: usize) -> usize {
    if current >= required {
        current
    } else if required < LARGE_BLOCK {
        (required * 2).max(4)
    } else {
        required * 5 / 4
    }
}

/// Grow `block` so that index `required - 1` is addressable, filling new
/// slots with `fill`.
pub fn grow<T: Clone>(block: &mut Vec<T>, required: usize, fill: T) {
    let len = grown_len(block.len(), required);
    if len > block.len() {
        block.resize(len, fill);
    }
}
