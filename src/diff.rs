//! Line-granularity diffing.
//!
//! Implements the greedy forward search of Myers' O(ND) shortest edit script.
//! Every furthest-reaching frontier is kept in a flat arena indexed by edit
//! distance, and the backtrace replays the same step choice against the frontier
//! of the previous distance. Moves that would leave the edit graph are never
//! taken, so all recorded positions are real grid points.

use std::ops::AddAssign;

const UNREACHED: isize = -1;

/// One run of lines in a diff result.
///
/// `Equal` and `Deleted` runs borrow from the old sequence, `Added` runs from the
/// new one. Edit runs produced by [`diff_chunks`] are always a single line.
#[derive(Debug, PartialEq, Eq)]
pub enum Chunk<'a, T> {
    Equal(&'a [T]),
    Deleted(&'a [T]),
    Added(&'a [T]),
}

impl<'a, T> Chunk<'a, T> {
    pub fn lines(&self) -> &'a [T] {
        match *self {
            Chunk::Equal(lines) | Chunk::Deleted(lines) | Chunk::Added(lines) => lines,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineCounts {
    pub added: u64,
    pub deleted: u64,
}

impl LineCounts {
    pub fn new(added: u64, deleted: u64) -> Self {
        Self { added, deleted }
    }
}

impl AddAssign for LineCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.added += rhs.added;
        self.deleted += rhs.deleted;
    }
}

/// Splits raw text into lines the way the counters expect: on `'\n'`, keeping a
/// trailing empty segment.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n').collect()
}

/// Added and deleted line counts between two texts.
pub fn diff_text(old: &str, new: &str) -> LineCounts {
    diff_counts(&split_lines(old), &split_lines(new))
}

/// Added and deleted line counts between two line sequences.
pub fn diff_counts<T: PartialEq>(old: &[T], new: &[T]) -> LineCounts {
    render(&diff_chunks(old, new))
}

/// Reduces chunks to line counts. Only single-line edit chunks are counted,
/// which covers every edit chunk the backtrace emits.
pub fn render<T>(chunks: &[Chunk<'_, T>]) -> LineCounts {
    let mut counts = LineCounts::default();
    for chunk in chunks {
        match chunk {
            Chunk::Added(lines) if lines.len() == 1 => counts.added += 1,
            Chunk::Deleted(lines) if lines.len() == 1 => counts.deleted += 1,
            _ => {}
        }
    }
    counts
}

/// Computes a minimal edit script from `old` to `new` as ordered chunks.
///
/// Two empty inputs produce no chunks; identical non-empty inputs produce one
/// `Equal` chunk.
pub fn diff_chunks<'a, T: PartialEq>(old: &'a [T], new: &'a [T]) -> Vec<Chunk<'a, T>> {
    if old.is_empty() && new.is_empty() {
        return Vec::new();
    }
    let graph = EditGraph::new(old.len(), new.len());
    let (distance, frontiers) = graph.search(old, new);
    graph.backtrace(old, new, distance, &frontiers)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit {
    Start,
    Insert,
    Delete,
}

/// Frontier snapshots, one fixed-width row per edit distance.
struct Frontiers {
    width: usize,
    cells: Vec<isize>,
}

impl Frontiers {
    fn new(width: usize) -> Self {
        Self {
            width,
            cells: Vec::with_capacity(width * 8),
        }
    }

    fn push(&mut self, row: &[isize]) {
        self.cells.extend_from_slice(row);
    }

    fn row(&self, d: usize) -> &[isize] {
        &self.cells[d * self.width..(d + 1) * self.width]
    }
}

struct EditGraph {
    n: usize,
    m: usize,
    offset: isize,
}

impl EditGraph {
    fn new(n: usize, m: usize) -> Self {
        Self {
            n,
            m,
            offset: (n + m) as isize,
        }
    }

    fn width(&self) -> usize {
        2 * (self.n + self.m) + 1
    }

    /// Chooses how a `d`-path reaches diagonal `k` from the `d - 1` frontier and
    /// returns the x coordinate right after that move, before following the snake.
    /// Insertion wins only when diagonal `k + 1` reached strictly further.
    fn step(&self, prev: &[isize], d: isize, k: isize) -> Option<(Edit, usize)> {
        if d == 0 {
            return Some((Edit::Start, 0));
        }
        let reached = |diag: isize| -> Option<usize> {
            if diag < -(d - 1) || diag > d - 1 {
                return None;
            }
            let x = prev[(self.offset + diag) as usize];
            (x != UNREACHED).then_some(x as usize)
        };
        let insert = reached(k + 1).filter(|&x| x as isize - k <= self.m as isize);
        let delete = reached(k - 1).filter(|&x| x < self.n);

        match (insert, delete) {
            (Some(xi), Some(xd)) if xi > xd => Some((Edit::Insert, xi)),
            (_, Some(xd)) => Some((Edit::Delete, xd + 1)),
            (Some(xi), None) => Some((Edit::Insert, xi)),
            (None, None) => None,
        }
    }

    fn search<T: PartialEq>(&self, a: &[T], b: &[T]) -> (usize, Frontiers) {
        let max = self.n + self.m;
        let mut frontier = vec![UNREACHED; self.width()];
        let mut frontiers = Frontiers::new(self.width());

        for d in 0..=max {
            let di = d as isize;
            let mut done = false;
            for k in (-di..=di).step_by(2) {
                let slot = (self.offset + k) as usize;
                let Some((_, start)) = self.step(&frontier, di, k) else {
                    frontier[slot] = UNREACHED;
                    continue;
                };
                let mut x = start;
                let mut y = (x as isize - k) as usize;
                while x < self.n && y < self.m && a[x] == b[y] {
                    x += 1;
                    y += 1;
                }
                frontier[slot] = x as isize;
                if x == self.n && y == self.m {
                    done = true;
                    break;
                }
            }
            frontiers.push(&frontier);
            if done {
                return (d, frontiers);
            }
        }
        (max, frontiers)
    }

    fn backtrace<'a, T>(
        &self,
        a: &'a [T],
        b: &'a [T],
        distance: usize,
        frontiers: &Frontiers,
    ) -> Vec<Chunk<'a, T>> {
        let mut reversed = Vec::with_capacity(2 * distance + 1);
        let (mut x, mut y) = (self.n, self.m);

        for d in (1..=distance).rev() {
            let k = x as isize - y as isize;
            // every point on the path was produced by this same step during the search
            let Some((edit, mid)) = self.step(frontiers.row(d - 1), d as isize, k) else {
                break;
            };
            if mid < x {
                reversed.push(Chunk::Equal(&a[mid..x]));
            }
            let (x0, y0) = match edit {
                Edit::Insert => {
                    let y0 = (mid as isize - (k + 1)) as usize;
                    reversed.push(Chunk::Added(&b[y0..y0 + 1]));
                    (mid, y0)
                }
                Edit::Delete | Edit::Start => {
                    let x0 = mid - 1;
                    let y0 = (x0 as isize - (k - 1)) as usize;
                    reversed.push(Chunk::Deleted(&a[x0..x0 + 1]));
                    (x0, y0)
                }
            };
            x = x0;
            y = y0;
        }
        if x > 0 {
            reversed.push(Chunk::Equal(&a[..x]));
        }
        reversed.reverse();
        reversed
    }
}
