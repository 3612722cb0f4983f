//! Candidate transform grids, split into chunks for parallel evaluation.

use itertools::iproduct;
use log::{debug, warn};
use num_traits::float::FloatCore;

use crate::Float;
use crate::error::{Result, SearchError};
use crate::geometry::Point;
use crate::transform::PointTransform;

/// Candidate transforms, split into chunks that are each evaluated by one worker.
pub type Grid<F> = Vec<Vec<PointTransform<F>>>;

/// Split `items` into `chunk_count` contiguous chunks whose lengths differ by at most one.
///
/// The first `items.len() % chunk_count` chunks hold the extra elements.
/// When there are fewer items than chunks, the trailing chunks are empty.
pub fn split_chunks<T: Clone>(items: &[T], chunk_count: usize) -> Vec<Vec<T>> {
    if chunk_count == 0 {
        return Vec::new();
    }
    let base = items.len() / chunk_count;
    let extra = items.len() % chunk_count;

    let mut start = 0;
    (0..chunk_count)
        .map(|i| {
            let len = base + usize::from(i < extra);
            let chunk = items[start..start + len].to_vec();
            start += len;
            chunk
        })
        .collect()
}

fn from_i64<F: Float>(value: i64) -> Result<F> {
    F::from_i64(value)
        .ok_or_else(|| SearchError::invalid_input(format!("{value} is not representable")))
}

/// Generate the translation grid at resolution `size`.
///
/// Both `dx` and `dy` range over `[-2^(min_size_exp + size), 2^(min_size_exp + size))`
/// in steps of `2^size`. The x range is split into `chunk_count` contiguous parts,
/// each crossed with the full y range.
pub fn get_transform_grids<F: Float>(
    size: u32,
    min_size_exp: u32,
    chunk_count: usize,
) -> Result<Grid<F>> {
    if chunk_count == 0 {
        return Err(SearchError::invalid_input("chunk count must be positive"));
    }
    let exp = size
        .checked_add(min_size_exp)
        .filter(|e| *e < 62)
        .ok_or_else(|| {
            SearchError::invalid_input(format!(
                "grid extent 2^({min_size_exp} + {size}) is too large"
            ))
        })?;

    let half = 1i64 << exp;
    let step = 1i64 << size;
    let axis = (-half..half)
        .step_by(step as usize)
        .map(from_i64::<F>)
        .collect::<Result<Vec<F>>>()?;

    if chunk_count > axis.len() {
        warn!(
            "{} chunks requested for {} grid columns, some chunks stay empty.",
            chunk_count,
            axis.len()
        );
    }
    debug!(
        "Translation grid with step {} and {} candidates per axis.",
        step,
        axis.len()
    );

    Ok(split_chunks(&axis, chunk_count)
        .into_iter()
        .map(|xs| {
            iproduct!(xs, axis.iter())
                .map(|(x, y)| PointTransform::translation(x, *y))
                .collect()
        })
        .collect())
}

/// Generate the rotation grid.
///
/// Every one of the `chunk_count` chunks holds `chunk_size = ceil(number_of_angle_steps / chunk_count)`
/// consecutive angles `k * angle_step`, so `k` runs over `0..chunk_count * chunk_size`. This covers
/// at least `number_of_angle_steps` angles and more when the division is not exact.
/// Each chunk then also receives the negation of every angle it holds.
/// All candidates rotate about `(origin_x, origin_y)`.
pub fn get_angle_grids<F: Float>(
    number_of_angle_steps: usize,
    angle_step: F,
    origin_x: F,
    origin_y: F,
    chunk_count: usize,
) -> Result<Grid<F>> {
    if number_of_angle_steps == 0 {
        return Err(SearchError::invalid_input(
            "number of angle steps must be positive",
        ));
    }
    if chunk_count == 0 {
        return Err(SearchError::invalid_input("chunk count must be positive"));
    }
    if !(FloatCore::is_finite(angle_step) && angle_step > F::zero()) {
        return Err(SearchError::invalid_input(
            "angle step must be finite and positive",
        ));
    }
    if !(FloatCore::is_finite(origin_x) && FloatCore::is_finite(origin_y)) {
        return Err(SearchError::invalid_input("rotation origin must be finite"));
    }
    let origin = Point::new(origin_x, origin_y);
    let chunk_size = number_of_angle_steps.div_ceil(chunk_count);
    if chunk_count * chunk_size > number_of_angle_steps {
        warn!(
            "{} angle steps do not split evenly into {} chunks, trying {} steps.",
            number_of_angle_steps,
            chunk_count,
            chunk_count * chunk_size
        );
    }

    (0..chunk_count)
        .map(|u| -> Result<Vec<PointTransform<F>>> {
            let positive = (u * chunk_size..(u + 1) * chunk_size)
                .map(|k| -> Result<PointTransform<F>> {
                    let k = F::from_usize(k).ok_or_else(|| {
                        SearchError::invalid_input(format!("{k} is not representable"))
                    })?;
                    Ok(PointTransform::rotation(angle_step * k, origin))
                })
                .collect::<Result<Vec<_>>>()?;
            let negative = positive
                .iter()
                .map(|t| PointTransform::rotation(-t.angle, origin))
                .collect::<Vec<_>>();
            Ok(positive.into_iter().chain(negative).collect())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::*;

    fn translations(grid: &Grid<f64>) -> Vec<(i64, i64)> {
        grid.iter()
            .flatten()
            .map(|t| (t.dx as i64, t.dy as i64))
            .sorted()
            .collect()
    }

    #[test]
    fn chunks_near_equal() {
        let items = (0..10).collect_vec();
        let chunks = split_chunks(&items, 3);

        assert_eq!(chunks, vec![vec![0, 1, 2, 3], vec![4, 5, 6], vec![7, 8, 9]]);
        assert_eq!(split_chunks(&items[..2], 4), vec![vec![0], vec![1], vec![], vec![]]);
        assert!(split_chunks(&items, 0).is_empty());
    }

    #[test]
    fn translation_grid_layout() {
        let grid = get_transform_grids::<f64>(1, 1, 2).unwrap();

        assert_eq!(grid.len(), 2);
        // Axis is [-4, -2, 0, 2].
        assert_eq!(grid[0].len(), 8);
        assert!(grid[0].iter().all(|t| t.dx < 0.));
        assert!(grid[1].iter().all(|t| t.dx >= 0.));
        assert!(grid.iter().flatten().all(|t| t.angle == 0.));
        assert_eq!(
            grid[0].iter().take(4).map(|t| (t.dx, t.dy)).collect_vec(),
            vec![(-4., -4.), (-4., -2.), (-4., 0.), (-4., 2.)]
        );
    }

    #[test]
    fn translation_grid_independent_of_chunks() {
        for (size, min_size_exp) in [(0, 0), (2, 1), (3, 2)] {
            let reference = translations(&get_transform_grids(size, min_size_exp, 1).unwrap());
            for chunk_count in [2, 3, 7, 100] {
                let grid = get_transform_grids(size, min_size_exp, chunk_count).unwrap();
                assert_eq!(grid.len(), chunk_count);
                assert_eq!(translations(&grid), reference);
            }
        }
    }

    #[test]
    fn translation_spacing_doubles() {
        let spacing = |size: u32| {
            let grid = get_transform_grids::<f64>(size, 2, 1).unwrap();
            let xs = grid[0].iter().map(|t| t.dx).dedup().collect_vec();
            xs[1] - xs[0]
        };

        for size in 1..6 {
            assert_eq!(spacing(size), 2. * spacing(size - 1));
        }
    }

    #[test]
    fn translation_grid_invalid() {
        assert!(get_transform_grids::<f64>(1, 1, 0).is_err());
        assert!(get_transform_grids::<f64>(40, 30, 1).is_err());
    }

    #[test]
    fn angle_grid_layout() {
        let grid = get_angle_grids(4, 15., 1., 2., 2).unwrap();

        let angles = grid
            .iter()
            .map(|chunk| chunk.iter().map(|t| t.angle).collect_vec())
            .collect_vec();
        assert_eq!(angles, vec![vec![0., 15., -0., -15.], vec![30., 45., -30., -45.]]);
        assert!(grid.iter().flatten().all(|t| t.origin == Point::new(1., 2.)));
        assert!(grid.iter().flatten().all(|t| t.dx == 0. && t.dy == 0.));
    }

    #[test]
    fn angle_grid_symmetric_chunks() {
        for (steps, chunk_count) in [(1, 1), (5, 2), (7, 3), (3, 5)] {
            let grid = get_angle_grids(steps, 2.5, 0., 0., chunk_count).unwrap();
            assert_eq!(grid.len(), chunk_count);

            let chunk_size = steps.div_ceil(chunk_count);
            let mut base = Vec::new();
            for chunk in &grid {
                assert_eq!(chunk.len(), 2 * chunk_size);
                let (pos, neg) = chunk.split_at(chunk.len() / 2);
                for (p, n) in pos.iter().zip(neg) {
                    assert_eq!(n.angle, -p.angle);
                    assert_eq!(pos.iter().filter(|t| t.angle == p.angle).count(), 1);
                }
                base.extend(pos.iter().map(|t| t.angle));
            }
            assert!(base.len() >= steps);
            assert_eq!(
                base,
                (0..chunk_count * chunk_size)
                    .map(|k| k as f64 * 2.5)
                    .collect_vec()
            );
        }
    }

    #[test]
    fn angle_grid_uneven_split() {
        let grid = get_angle_grids(1, 15., 0., 0., 2).unwrap();

        let angles = grid
            .iter()
            .map(|chunk| chunk.iter().map(|t| t.angle).collect_vec())
            .collect_vec();
        assert_eq!(angles, vec![vec![0., -0.], vec![15., -15.]]);
    }

    #[test]
    fn angle_grid_invalid() {
        assert!(get_angle_grids(0, 1., 0., 0., 1).is_err());
        assert!(get_angle_grids(3, 1., 0., 0., 0).is_err());
        assert!(get_angle_grids(3, f64::NAN, 0., 0., 1).is_err());
        assert!(get_angle_grids(3, 0., 0., 0., 1).is_err());
        assert!(get_angle_grids(3, -15., 0., 0., 1).is_err());
        assert!(get_angle_grids(3, 1., f64::INFINITY, 0., 1).is_err());
    }
}
