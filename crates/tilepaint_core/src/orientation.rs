//! Orientation mask algebra
//!
//! An orientation mask records which of the 8 neighbouring cells are
//! "connected" to a tile. The centre cell is implicit and never stored.
//!
//! Bits are assigned row-major over the 3×3 neighbourhood, most significant
//! bit first:
//!
//! ```text
//!   NW | N  | NE        0x80 | 0x40 | 0x20
//!   W  | x  | E         0x10 |  x   | 0x08
//!   SW | S  | SE        0x04 | 0x02 | 0x01
//! ```
//!
//! Rows grow downwards, so the north neighbour of `(row, column)` is
//! `(row - 1, column)`.

/// Neighbour direction flags
pub mod neighbors {
    pub const NW: u8 = 0b1000_0000; // Northwest (corner)
    pub const N: u8 = 0b0100_0000; // North
    pub const NE: u8 = 0b0010_0000; // Northeast (corner)
    pub const W: u8 = 0b0001_0000; // West
    pub const E: u8 = 0b0000_1000; // East
    pub const SW: u8 = 0b0000_0100; // Southwest (corner)
    pub const S: u8 = 0b0000_0010; // South
    pub const SE: u8 = 0b0000_0001; // Southeast (corner)
}

use neighbors::*;

/// Orthogonal ("strong") neighbour bits
pub const STRONG_BITS: u8 = N | E | S | W;
/// Diagonal ("weak") neighbour bits
pub const WEAK_BITS: u8 = NE | SE | SW | NW;

/// Mask of a tile with no connected neighbours
pub const ISOLATED: u8 = 0x00;
/// Mask of a tile connected on all 8 sides
pub const SURROUNDED: u8 = 0xFF;

/// Neighbours in clockwise order starting at north.
/// A quarter turn moves every entry two places along this ring.
const RING: [u8; 8] = [N, NE, E, SE, S, SW, W, NW];

/// `(bit, row offset, column offset)` for each neighbour
pub const OFFSETS: [(u8, i32, i32); 8] = [
    (NW, -1, -1),
    (N, -1, 0),
    (NE, -1, 1),
    (W, 0, -1),
    (E, 0, 1),
    (SW, 1, -1),
    (S, 1, 0),
    (SE, 1, 1),
];

/// Number of orthogonal positions on which `a` and `b` agree (0-4)
pub fn count_strong_connections(a: u8, b: u8) -> u32 {
    (!(a ^ b) & STRONG_BITS).count_ones()
}

/// Number of diagonal positions on which `a` and `b` agree (0-4)
pub fn count_weak_connections(a: u8, b: u8) -> u32 {
    (!(a ^ b) & WEAK_BITS).count_ones()
}

/// Rotate the 3×3 pattern clockwise by `quarter_turns` × 90°
pub fn rotate_clockwise(mask: u8, quarter_turns: u8) -> u8 {
    let shift = (quarter_turns % 4) as usize * 2;
    let mut result = 0u8;
    for (i, &bit) in RING.iter().enumerate() {
        if mask & bit != 0 {
            result |= RING[(i + shift) % 8];
        }
    }
    result
}

/// Rotate the 3×3 pattern anticlockwise by `quarter_turns` × 90°
pub fn rotate_anticlockwise(mask: u8, quarter_turns: u8) -> u8 {
    rotate_clockwise(mask, (4 - quarter_turns % 4) % 4)
}

/// Masks obtained by rotating `mask` by 0, 90, 180 and 270 degrees clockwise.
///
/// Returns a single element when the pattern maps onto itself under a
/// quarter turn. Otherwise all four rotations are returned in rotation order
/// (index = quarter turns), so a pattern with only two-fold symmetry repeats
/// its masks.
pub fn masks_with_rotational_symmetry(mask: u8) -> Vec<u8> {
    let quarter = rotate_clockwise(mask, 1);
    if quarter == mask {
        return vec![mask];
    }
    vec![
        mask,
        quarter,
        rotate_clockwise(mask, 2),
        rotate_clockwise(mask, 3),
    ]
}

/// Drop diagonal bits whose two adjacent orthogonal bits are not both set
pub fn optimize_corners(mask: u8) -> u8 {
    let mut result = mask;

    // NW corner requires N and W
    if (mask & (N | W)) != (N | W) {
        result &= !NW;
    }
    // NE corner requires N and E
    if (mask & (N | E)) != (N | E) {
        result &= !NE;
    }
    // SE corner requires S and E
    if (mask & (S | E)) != (S | E) {
        result &= !SE;
    }
    // SW corner requires S and W
    if (mask & (S | W)) != (S | W) {
        result &= !SW;
    }

    result
}

/// Build a mask by asking `is_connected(row, column)` about each neighbour
/// of `(row, column)`.
pub fn calculate_mask<F>(row: i32, column: i32, mut is_connected: F) -> u8
where
    F: FnMut(i32, i32) -> bool,
{
    let mut mask = 0u8;
    for &(bit, dr, dc) in OFFSETS.iter() {
        if is_connected(row + dr, column + dc) {
            mask |= bit;
        }
    }
    mask
}

/// Format a mask as three rows of `0`/`1`, centre shown as `x`: `"010/1x1/000"`
pub fn mask_to_pattern(mask: u8) -> String {
    let bit = |b: u8| if mask & b != 0 { '1' } else { '0' };
    format!(
        "{}{}{}/{}x{}/{}{}{}",
        bit(NW),
        bit(N),
        bit(NE),
        bit(W),
        bit(E),
        bit(SW),
        bit(S),
        bit(SE)
    )
}

/// Parse the notation produced by [`mask_to_pattern`]
pub fn mask_from_pattern(pattern: &str) -> Option<u8> {
    let cells: Vec<char> = pattern.chars().filter(|c| *c != '/').collect();
    if cells.len() != 9 || cells[4] != 'x' {
        return None;
    }

    let order = [NW, N, NE, W, 0, E, SW, S, SE];
    let mut mask = 0u8;
    for (cell, bit) in cells.iter().zip(order) {
        match *cell {
            '1' if bit != 0 => mask |= bit,
            '0' => {}
            'x' if bit == 0 => {}
            _ => return None,
        }
    }
    Some(mask)
}
