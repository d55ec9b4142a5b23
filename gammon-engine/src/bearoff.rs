//! Combinatorial indexing of one sided bearoff positions.
//!
//! A position of at most `c` chequers on `p` points maps to a unique index in
//! `0..C(c + p, p)`. The position is written as a bit pattern of `c + p` bits with
//! exactly `p` bits set, one separator per point, and the pattern is ranked in
//! the combinatorial number system. Indices are `u64`, since C(40, 20) does not
//! fit a `u32`.

use std::sync::OnceLock;

use arrayvec::ArrayVec;

use crate::coretypes::Chequers;

/// Largest `n` of the combination table.
pub const MAX_N: usize = 40;
/// Largest `r` of the combination table.
pub const MAX_R: usize = 25;
/// Most points a bearoff position may span.
pub const MAX_POINTS: usize = MAX_R;

/// One sided bearoff position, chequer counts from point 1 upward.
pub type BearoffPosition = ArrayVec<Chequers, MAX_POINTS>;

type CombinationTable = [[u64; MAX_R + 1]; MAX_N + 1];

static COMBINATIONS: OnceLock<CombinationTable> = OnceLock::new();

fn table() -> &'static CombinationTable {
    COMBINATIONS.get_or_init(|| {
        let mut table = [[0u64; MAX_R + 1]; MAX_N + 1];
        for n in 0..=MAX_N {
            table[n][0] = 1;
            for r in 1..=MAX_R.min(n) {
                table[n][r] = table[n - 1][r - 1] + if r < n { table[n - 1][r] } else { 0 };
            }
        }
        table
    })
}

/// Build the combination table ahead of first use. Later calls do nothing.
pub fn init() {
    table();
}

/// Returns n choose r, which is 0 when r > n.
///
/// # Panics
/// Panics if `n > 40` or `r > 25`.
pub fn combination(n: u32, r: u32) -> u64 {
    assert!(n as usize <= MAX_N && r as usize <= MAX_R, "C({n}, {r}) is outside the table");
    table()[n as usize][r as usize]
}

/// Number of positions of at most `n_chequers` chequers on `n_points` points.
pub fn bearoff_positions(n_points: usize, n_chequers: u32) -> u64 {
    combination(n_chequers + n_points as u32, n_points as u32)
}

fn check_dimensions(n_points: usize, n_chequers: u32) {
    assert!(
        (1..=MAX_POINTS).contains(&n_points) && n_chequers as usize + n_points <= MAX_N,
        "{n_chequers} chequers on {n_points} points cannot be indexed"
    );
}

/// Rank a bit pattern with `r` of its low `n` bits set.
fn rank(bits: u64, mut n: u32, mut r: u32) -> u64 {
    let mut index = 0;
    while n != r {
        if bits & (1 << (n - 1)) != 0 {
            index += combination(n - 1, r);
            r -= 1;
        }
        n -= 1;
    }
    index
}

/// Inverse of rank.
fn unrank(mut index: u64, mut n: u32, mut r: u32) -> u64 {
    let mut bits = 0;
    loop {
        if r == 0 {
            return bits;
        }
        if n == r {
            return bits | ((1 << n) - 1);
        }
        let below = combination(n - 1, r);
        if index >= below {
            bits |= 1 << (n - 1);
            index -= below;
            r -= 1;
        }
        n -= 1;
    }
}

/// Returns the index of the first `n_points` counts of `board`.
///
/// # Panics
/// Panics if `board` is shorter than `n_points`, the dimensions exceed the
/// combination table, or the counts sum to more than `n_chequers`.
pub fn position_to_bearoff_index(board: &[Chequers], n_points: usize, n_chequers: u32) -> u64 {
    check_dimensions(n_points, n_chequers);
    let points = &board[..n_points];
    let total: u32 = points.iter().map(|&count| u32::from(count)).sum();
    assert!(total <= n_chequers, "{total} chequers exceed {n_chequers}");

    let mut separator = n_points as u32 - 1 + total;
    let mut bits: u64 = 1 << separator;
    for &count in &points[..n_points - 1] {
        separator -= u32::from(count) + 1;
        bits |= 1 << separator;
    }

    rank(bits, n_chequers + n_points as u32, n_points as u32)
}

/// Returns the position with bearoff index `index`.
///
/// # Panics
/// Panics if the dimensions exceed the combination table or `index` is not
/// below `bearoff_positions(n_points, n_chequers)`.
pub fn bearoff_index_to_position(index: u64, n_points: usize, n_chequers: u32) -> BearoffPosition {
    check_dimensions(n_points, n_chequers);
    assert!(
        index < bearoff_positions(n_points, n_chequers),
        "index {index} out of range for {n_chequers} chequers on {n_points} points"
    );

    let total_bits = n_chequers + n_points as u32;
    let bits = unrank(index, total_bits, n_points as u32);

    let mut position: BearoffPosition = (0..n_points).map(|_| 0).collect();
    let mut point = n_points - 1;
    for bit in 0..total_bits {
        if bits & (1 << bit) != 0 {
            if point == 0 {
                break;
            }
            point -= 1;
        } else {
            position[point] += 1;
        }
    }

    position
}
