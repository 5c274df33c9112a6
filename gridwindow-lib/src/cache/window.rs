//! Row windows and fetch-window planning

use std::fmt;
use std::ops::RangeInclusive;

/// A contiguous, inclusive range of row indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Window {
    /// First index (inclusive).
    pub from: usize,
    /// Last index (inclusive).
    pub to: usize,
}

impl Window {
    /// Creates a window, returning `None` when `from > to`.
    pub fn new(from: usize, to: usize) -> Option<Self> {
        (from <= to).then_some(Self { from, to })
    }

    /// Creates a window covering a single row.
    pub fn single(index: usize) -> Self {
        Self {
            from: index,
            to: index,
        }
    }

    /// Number of rows in the window (always at least one).
    ///
    /// Saturates at `usize::MAX` for the window covering every index.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        (self.to - self.from).saturating_add(1)
    }

    /// Returns `true` if the index lies inside the window.
    pub fn contains(&self, index: usize) -> bool {
        (self.from..=self.to).contains(&index)
    }

    /// Returns the indices of the window.
    pub fn indices(&self) -> RangeInclusive<usize> {
        self.from..=self.to
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.from, self.to)
    }
}

/// Computes the window that must be fetched to make `[from, to]` available.
///
/// `occupied` reports whether an index is already resolved or already
/// requested. Returns `None` when nothing needs fetching.
///
/// Small requests grow to `optimal` rows, split evenly before and after the
/// request (halves round up). Growth that would reach below index 0 is moved
/// to the upper end. If the grown window then starts inside occupied rows it
/// slides up past them; if it ends inside occupied rows it slides down, but
/// never below 0. Occupied rows at either edge are trimmed before and after
/// growing. Growth and sliding stop at `usize::MAX`.
pub fn plan_window<F>(from: usize, to: usize, optimal: usize, occupied: F) -> Option<Window>
where
    F: Fn(usize) -> bool,
{
    if from > to {
        return None;
    }

    let (mut from, mut to) = shrink(from, to, &occupied);
    if occupied(from) {
        return None;
    }

    let size = (to - from).saturating_add(1);
    if size < optimal {
        let expansion = (optimal - size).div_ceil(2);
        if expansion > from {
            to = to.saturating_add(expansion).saturating_add(expansion - from);
            from = 0;
        } else {
            from -= expansion;
            to = to.saturating_add(expansion);
        }

        if occupied(from) {
            while occupied(from) && to < usize::MAX {
                from += 1;
                to += 1;
            }
        } else if occupied(to) {
            while occupied(to) && from > 0 {
                from -= 1;
                to -= 1;
            }
        }
    }

    let (from, to) = shrink(from, to, &occupied);
    if occupied(from) {
        return None;
    }

    Some(Window { from, to })
}

fn shrink<F>(mut from: usize, mut to: usize, occupied: &F) -> (usize, usize)
where
    F: Fn(usize) -> bool,
{
    while occupied(from) && from < to {
        from += 1;
    }
    while occupied(to) && from < to {
        to -= 1;
    }
    (from, to)
}
