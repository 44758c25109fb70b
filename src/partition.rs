//! Fair contiguous-range partitioning of uniform work.

/// Divides `n` units of work equally among `team` workers. If `n` is not
/// divisible by `team` and leaves a remainder `r`, the first `r` workers get
/// one unit more than the rest. Returns the half-open range `[start, end)`
/// belonging to worker `tid`.
///
/// With `team <= 1` or `n == 0` the sole worker gets everything (or
/// nothing). `n < team` is legal; workers past the work simply receive an
/// empty range, which callers treat as a no-op.
pub fn balance211(n: usize, team: usize, tid: usize) -> (usize, usize) {
    if team <= 1 || n == 0 {
        return (0, n);
    }
    let min_per_team = n / team;
    let remainder = n - min_per_team * team;
    let start = tid * min_per_team + tid.min(remainder);
    let end = start + min_per_team + usize::from(tid < remainder);
    (start, end)
}
