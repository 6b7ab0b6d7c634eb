//! Minimum-cost bipartite assignment (Hungarian / Kuhn-Munkres).

/// Solve the linear assignment problem for a rectangular cost matrix.
///
/// Returns `(row, col)` pairs sorted by row. Exactly `min(rows, cols)`
/// pairs are returned: the matrix is padded to square with a constant
/// finite cost, so the solver always produces a complete assignment and
/// padded cells never influence which real cells are chosen.
///
/// # Algorithm
///
/// O(n³) potential-based shortest augmenting path. For each row, a
/// Dijkstra-style scan over reduced costs finds the cheapest augmenting
/// path; row and column potentials keep reduced costs non-negative. Ties
/// resolve to the lowest column index, so the output is deterministic for
/// a given matrix.
pub fn solve(cost_matrix: &[Vec<f64>]) -> Vec<(usize, usize)> {
    let n_rows = cost_matrix.len();
    let n_cols = cost_matrix.first().map_or(0, Vec::len);
    if n_rows == 0 || n_cols == 0 {
        return Vec::new();
    }

    let n = n_rows.max(n_cols);
    let pad = cost_matrix
        .iter()
        .flatten()
        .copied()
        .fold(0.0_f64, f64::max);

    let mut c = vec![vec![pad; n]; n];
    for (i, row) in cost_matrix.iter().enumerate() {
        for (j, cost) in row.iter().enumerate().take(n_cols) {
            c[i][j] = *cost;
        }
    }

    // u[i]: row potentials, v[j]: column potentials (1-indexed, 0 is the
    // virtual source column).
    let mut u = vec![0.0_f64; n + 1];
    let mut v = vec![0.0_f64; n + 1];
    // p[j]: row assigned to column j (0 = unassigned).
    let mut p = vec![0_usize; n + 1];
    // way[j]: previous column on the augmenting path.
    let mut way = vec![0_usize; n + 1];

    for i in 1..=n {
        p[0] = i;
        let mut j0 = 0_usize;
        let mut min_val = vec![f64::INFINITY; n + 1];
        let mut used = vec![false; n + 1];

        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0_usize;

            for j in 1..=n {
                if used[j] {
                    continue;
                }
                let reduced = c[i0 - 1][j - 1] - u[i0] - v[j];
                if reduced < min_val[j] {
                    min_val[j] = reduced;
                    way[j] = j0;
                }
                if min_val[j] < delta {
                    delta = min_val[j];
                    j1 = j;
                }
            }

            for j in 0..=n {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    min_val[j] -= delta;
                }
            }

            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }

        loop {
            p[j0] = p[way[j0]];
            j0 = way[j0];
            if j0 == 0 {
                break;
            }
        }
    }

    let mut assignments: Vec<(usize, usize)> = (1..=n)
        .filter(|&j| p[j] != 0)
        .map(|j| (p[j] - 1, j - 1))
        .filter(|&(row, col)| row < n_rows && col < n_cols)
        .collect();
    assignments.sort_unstable();
    assignments
}

/// Total cost of an assignment.
pub fn assignment_cost(cost_matrix: &[Vec<f64>], assignments: &[(usize, usize)]) -> f64 {
    assignments.iter().map(|&(r, c)| cost_matrix[r][c]).sum()
}
