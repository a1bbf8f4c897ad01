//! Square-grid compositing of tile batches.
//!
//! A batch of `N` equally-shaped tiles is laid out row-major on a `G × G`
//! grid separated by black margins. `G` defaults to the smallest side with
//! `G * G >= N`. Batches that overflow the grid are truncated (sequential) or
//! sampled without replacement (random); batches that underflow it are padded
//! with blank cells.
//!
//! When probabilities are supplied, every real tile is labeled with
//! [`confidence_label`] before placement. Padding cells are never labeled.
//!
//! # Examples
//!
//! ```rust
//! use glomeruli_eval::core::{GridConfig, Tile};
//! use glomeruli_eval::processors::{GlyphAnnotator, GridCompositor};
//!
//! let tiles = vec![Tile::from_elem((8, 8, 3), 0.5); 5];
//! let compositor = GridCompositor::new(GridConfig::default(), GlyphAnnotator::without_font())?;
//! let grid = compositor.compose(&tiles, None)?;
//! // 3 × 3 cells of 8 px with 3 px margins
//! assert_eq!(grid.dim(), (30, 30, 3));
//! # Ok::<(), glomeruli_eval::core::EvalError>(())
//! ```

use crate::core::batch::{Grid, Tile, uniform_shape};
use crate::core::config::{ConfigValidator, GridConfig, SelectionMode};
use crate::core::errors::{EvalError, EvalResult};
use crate::core::traits::TileAnnotator;
use crate::domain::confidence_label;
use crate::processors::annotate::GlyphAnnotator;
use ndarray::s;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Smallest `G` with `G * G >= count`.
pub fn grid_side_for(count: usize) -> usize {
    let mut side = (count as f64).sqrt() as usize;
    while side * side < count {
        side += 1;
    }
    side
}

/// Pixel extent of one grid axis: `side * tile + (side - 1) * margin`.
///
/// Returns `None` when the extent does not fit in a `usize`.
pub fn grid_extent(side: usize, tile: usize, margin: usize) -> Option<usize> {
    side.checked_mul(tile)?
        .checked_add(side.saturating_sub(1).checked_mul(margin)?)
}

/// Composes tile batches into one annotated grid image.
#[derive(Debug)]
pub struct GridCompositor<A: TileAnnotator = GlyphAnnotator> {
    config: GridConfig,
    annotator: A,
}

impl<A: TileAnnotator> GridCompositor<A> {
    /// Creates a compositor after validating the grid configuration.
    pub fn new(config: GridConfig, annotator: A) -> EvalResult<Self> {
        config.validate()?;
        Ok(Self { config, annotator })
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn annotator(&self) -> &A {
        &self.annotator
    }

    /// Grid side used for a batch of `count` tiles.
    pub fn side_for(&self, count: usize) -> usize {
        self.config
            .grid_size
            .unwrap_or_else(|| grid_side_for(count))
    }

    /// Composes `tiles` into a grid.
    ///
    /// Random selection draws from a generator seeded with `GridConfig::seed`,
    /// or from OS entropy when no seed is configured.
    pub fn compose(&self, tiles: &[Tile], probabilities: Option<&[f32]>) -> EvalResult<Grid> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.compose_with_rng(tiles, probabilities, &mut rng)
    }

    /// Composes `tiles` into a grid, drawing random selections from `rng`.
    ///
    /// Sequential selection never touches `rng`.
    pub fn compose_with_rng<R: Rng + ?Sized>(
        &self,
        tiles: &[Tile],
        probabilities: Option<&[f32]>,
        rng: &mut R,
    ) -> EvalResult<Grid> {
        let (height, width, channels) = uniform_shape(tiles)?;
        if let Some(probabilities) = probabilities
            && probabilities.len() != tiles.len()
        {
            return Err(EvalError::LengthMismatch {
                tiles: tiles.len(),
                probabilities: probabilities.len(),
            });
        }

        let side = self.side_for(tiles.len());
        if side == 0 {
            return Err(EvalError::invalid_input("grid size must be greater than 0"));
        }
        let margin = self.config.margin;
        let too_large =
            || EvalError::invalid_input(format!("grid of side {} is too large", side));
        let cells = side.checked_mul(side).ok_or_else(too_large)?;
        let grid_height = grid_extent(side, height, margin).ok_or_else(too_large)?;
        let grid_width = grid_extent(side, width, margin).ok_or_else(too_large)?;
        grid_height
            .checked_mul(grid_width)
            .and_then(|n| n.checked_mul(channels))
            .filter(|&n| n <= isize::MAX as usize)
            .ok_or_else(too_large)?;
        let slots = self.select_slots(tiles.len(), cells, rng);

        debug!(
            "Composing {}x{} grid from {} tiles ({} blank cells)",
            side,
            side,
            tiles.len(),
            slots.iter().filter(|s| s.is_none()).count()
        );

        let mut grid = Grid::zeros((grid_height, grid_width, channels));

        for (k, slot) in slots.into_iter().enumerate() {
            // blank cells stay zero
            let Some(index) = slot else { continue };
            let (row, col) = (k / side, k % side);
            let top = row * (height + margin);
            let left = col * (width + margin);
            let mut cell = grid.slice_mut(s![top..top + height, left..left + width, ..]);

            match probabilities {
                Some(probabilities) => {
                    let label = confidence_label(probabilities[index]);
                    cell.assign(&self.annotator.annotate(&tiles[index], &label)?);
                }
                None => cell.assign(&tiles[index]),
            }
        }

        Ok(grid)
    }

    /// Maps each of the `cells` grid positions to a source tile index, or
    /// `None` for a blank cell.
    fn select_slots<R: Rng + ?Sized>(
        &self,
        count: usize,
        cells: usize,
        rng: &mut R,
    ) -> Vec<Option<usize>> {
        if cells <= count {
            match self.config.selection {
                SelectionMode::Sequential => (0..cells).map(Some).collect(),
                SelectionMode::Random => rand::seq::index::sample(rng, count, cells)
                    .into_iter()
                    .map(Some)
                    .collect(),
            }
        } else {
            (0..count)
                .map(Some)
                .chain(std::iter::repeat_n(None, cells - count))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Records labels and marks annotated tiles by negating them.
    #[derive(Debug, Default)]
    struct RecordingAnnotator {
        labels: Mutex<Vec<String>>,
    }

    impl RecordingAnnotator {
        fn labels(&self) -> Vec<String> {
            self.labels.lock().unwrap().clone()
        }
    }

    impl TileAnnotator for RecordingAnnotator {
        fn annotate(&self, tile: &Tile, text: &str) -> EvalResult<Tile> {
            self.labels.lock().unwrap().push(text.to_string());
            Ok(tile.mapv(|v| -v))
        }
    }

    fn tiles(count: usize, size: usize, channels: usize) -> Vec<Tile> {
        (0..count)
            .map(|i| Array3::from_elem((size, size, channels), (i + 1) as f32 / 100.0))
            .collect()
    }

    fn compositor(config: GridConfig) -> GridCompositor<RecordingAnnotator> {
        GridCompositor::new(config, RecordingAnnotator::default()).unwrap()
    }

    fn cell(grid: &Grid, row: usize, col: usize, size: usize, margin: usize) -> Tile {
        let top = row * (size + margin);
        let left = col * (size + margin);
        grid.slice(s![top..top + size, left..left + size, ..])
            .to_owned()
    }

    #[test]
    fn test_grid_side_for() {
        assert_eq!(grid_side_for(1), 1);
        assert_eq!(grid_side_for(2), 2);
        assert_eq!(grid_side_for(4), 2);
        assert_eq!(grid_side_for(5), 3);
        assert_eq!(grid_side_for(9), 3);
        assert_eq!(grid_side_for(10), 4);
        assert_eq!(grid_side_for(64), 8);
        assert_eq!(grid_side_for(65), 9);
    }

    #[test]
    fn test_perfect_square_places_every_tile_row_major() {
        let input = tiles(4, 2, 1);
        let grid = compositor(GridConfig::default())
            .compose(&input, None)
            .unwrap();

        assert_eq!(grid.dim(), (7, 7, 1));
        for k in 0..4 {
            assert_eq!(cell(&grid, k / 2, k % 2, 2, 3), input[k]);
        }
        // margins are black
        assert!(grid.slice(s![2..5, .., ..]).iter().all(|&v| v == 0.0));
        assert!(grid.slice(s![.., 2..5, ..]).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_underfull_batch_is_padded_and_padding_unlabeled() {
        let input = tiles(5, 3, 3);
        let probabilities = [0.1, 0.2, 0.3, 0.4, 0.5];
        let compositor = compositor(GridConfig::default());
        let grid = compositor.compose(&input, Some(&probabilities[..])).unwrap();

        assert_eq!(grid.dim(), (15, 15, 3));
        assert_eq!(
            compositor.annotator().labels(),
            vec!["90.000%", "80.000%", "70.000%", "60.000%", "50.000%"]
        );

        let blank = (5..9)
            .filter(|&k| cell(&grid, k / 3, k % 3, 3, 3).iter().all(|&v| v == 0.0))
            .count();
        assert_eq!(blank, 4);
        for k in 0..5 {
            assert_eq!(cell(&grid, k / 3, k % 3, 3, 3), input[k].mapv(|v| -v));
        }
    }

    #[test]
    fn test_overfull_sequential_keeps_first_tiles_deterministically() {
        let input = tiles(10, 2, 1);
        let probabilities: Vec<f32> = (0..10).map(|i| i as f32 / 10.0).collect();
        let compositor = compositor(GridConfig::default().with_grid_size(2).with_margin(1));

        let first = compositor.compose(&input, Some(&probabilities[..])).unwrap();
        let second = compositor.compose(&input, Some(&probabilities[..])).unwrap();
        assert_eq!(first, second);

        assert_eq!(first.dim(), (5, 5, 1));
        for k in 0..4 {
            assert_eq!(cell(&first, k / 2, k % 2, 2, 1), input[k].mapv(|v| -v));
        }
        assert_eq!(
            &compositor.annotator().labels()[..4],
            &["100.000%", "90.000%", "80.000%", "70.000%"]
        );
    }

    #[test]
    fn test_labels_follow_probability_formula() {
        let input = tiles(3, 2, 3);
        let compositor = compositor(GridConfig::default());
        compositor.compose(&input, Some(&[0.123, 1.0, 0.0][..])).unwrap();
        assert_eq!(
            compositor.annotator().labels(),
            vec!["87.700%", "0.000%", "100.000%"]
        );
    }

    #[test]
    fn test_single_tile_is_returned_unchanged() {
        let input = tiles(1, 4, 3);
        let grid = compositor(GridConfig::default())
            .compose(&input, None)
            .unwrap();
        assert_eq!(grid, input[0]);
    }

    #[test]
    fn test_input_tiles_are_not_mutated() {
        let input = tiles(3, 2, 1);
        let before = input.clone();
        compositor(GridConfig::default())
            .compose(&input, Some(&[0.5, 0.5, 0.5][..]))
            .unwrap();
        assert_eq!(input, before);
    }

    #[test]
    fn test_error_conditions() {
        let compositor = compositor(GridConfig::default());

        assert!(matches!(
            compositor.compose(&[], None),
            Err(EvalError::EmptyBatch)
        ));

        let input = tiles(3, 2, 3);
        assert!(matches!(
            compositor.compose(&input, Some(&[0.1, 0.2][..])),
            Err(EvalError::LengthMismatch {
                tiles: 3,
                probabilities: 2
            })
        ));

        let mixed = vec![
            Array3::zeros((100, 100, 3)),
            Array3::zeros((100, 100, 1)),
        ];
        assert!(matches!(
            compositor.compose(&mixed, None),
            Err(EvalError::ShapeMismatch { index: 1, .. })
        ));

        let ragged = vec![Array3::zeros((4, 4, 1)), Array3::zeros((4, 5, 1))];
        assert!(matches!(
            compositor.compose(&ragged, None),
            Err(EvalError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_zero_grid_size_rejected_at_construction() {
        let result = GridCompositor::new(
            GridConfig::default().with_grid_size(0),
            RecordingAnnotator::default(),
        );
        assert!(matches!(result, Err(EvalError::Config(_))));
    }

    #[test]
    fn test_grid_extent() {
        assert_eq!(grid_extent(3, 8, 3), Some(30));
        assert_eq!(grid_extent(1, 8, 3), Some(8));
        assert_eq!(grid_extent(usize::MAX, 2, 0), None);
        assert_eq!(grid_extent(2, 1, usize::MAX), None);
    }

    #[test]
    fn test_oversized_grid_is_an_error() {
        let input = tiles(2, 2, 3);

        let too_many_cells = compositor(GridConfig::default().with_grid_size(1 << 33));
        assert!(matches!(
            too_many_cells.compose(&input, None),
            Err(EvalError::InvalidInput { .. })
        ));

        // side * side fits, the pixel extent does not
        let too_wide = compositor(
            GridConfig::default()
                .with_grid_size(1 << 31)
                .with_margin(1 << 40),
        );
        assert!(matches!(
            too_wide.compose(&input, Some(&[0.1, 0.2][..])),
            Err(EvalError::InvalidInput { .. })
        ));
        assert!(too_wide.annotator().labels().is_empty());
    }

    #[test]
    fn test_random_selection_is_seeded_and_distinct() {
        let input = tiles(10, 2, 1);
        let config = GridConfig::default()
            .with_grid_size(2)
            .with_selection(SelectionMode::Random)
            .with_seed(9001);
        let compositor = compositor(config);

        let first = compositor.compose(&input, None).unwrap();
        let second = compositor.compose(&input, None).unwrap();
        assert_eq!(first, second);

        let picked: HashSet<u32> = (0..4)
            .map(|k| {
                let value = cell(&first, k / 2, k % 2, 2, 3)[[0, 0, 0]];
                (value * 100.0).round() as u32
            })
            .collect();
        assert_eq!(picked.len(), 4);
        assert!(picked.iter().all(|v| (1..=10).contains(v)));
    }

    #[test]
    fn test_random_selection_pairs_probabilities_with_tiles() {
        let input = tiles(9, 2, 1);
        // probability encodes the tile's own fill value
        let probabilities: Vec<f32> = (0..9).map(|i| (i + 1) as f32 / 100.0).collect();
        let config = GridConfig::default()
            .with_grid_size(2)
            .with_selection(SelectionMode::Random);
        let compositor = compositor(config);

        let mut rng = StdRng::seed_from_u64(7);
        let grid = compositor
            .compose_with_rng(&input, Some(&probabilities[..]), &mut rng)
            .unwrap();

        let labels = compositor.annotator().labels();
        for (k, label) in labels.iter().enumerate() {
            let value = -cell(&grid, k / 2, k % 2, 2, 3)[[0, 0, 0]];
            assert_eq!(label, &confidence_label(value));
        }
    }

    #[test]
    fn test_random_selection_with_padding_keeps_order() {
        let input = tiles(3, 2, 1);
        let config = GridConfig::default().with_selection(SelectionMode::Random);
        let grid = compositor(config).compose(&input, None).unwrap();
        for k in 0..3 {
            assert_eq!(cell(&grid, k / 2, k % 2, 2, 3), input[k]);
        }
        assert!(cell(&grid, 1, 1, 2, 3).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_missing_font_only_matters_with_probabilities() {
        let compositor =
            GridCompositor::new(GridConfig::default(), GlyphAnnotator::without_font()).unwrap();
        let input = tiles(2, 4, 3);

        assert!(compositor.compose(&input, None).is_ok());
        assert!(matches!(
            compositor.compose(&input, Some(&[0.2, 0.8][..])),
            Err(EvalError::RenderingUnavailable { .. })
        ));
    }
}
