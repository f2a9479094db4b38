/// Rectangular ground-height raster aligned to block coordinates.
///
/// Cells are stored row-major along x: `cells[(z - min_z) * width + (x - min_x)]`.
/// A `None` cell carries no data.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainGrid {
    pub min_x: i32,
    pub min_z: i32,
    pub width: usize,
    pub height: usize,
    cells: Vec<Option<i32>>,
}

impl TerrainGrid {
    /// Returns `None` when the cell count does not match `width * height`.
    pub fn new(
        min_x: i32,
        min_z: i32,
        width: usize,
        height: usize,
        cells: Vec<Option<i32>>,
    ) -> Option<Self> {
        if width.checked_mul(height)? != cells.len() {
            return None;
        }
        Some(Self {
            min_x,
            min_z,
            width,
            height,
            cells,
        })
    }

    pub fn in_bounds(&self, x: i32, z: i32) -> bool {
        self.index(x, z).is_some()
    }

    fn index(&self, x: i32, z: i32) -> Option<usize> {
        let ix = i64::from(x) - i64::from(self.min_x);
        let iz = i64::from(z) - i64::from(self.min_z);
        if ix < 0 || iz < 0 || ix >= self.width as i64 || iz >= self.height as i64 {
            return None;
        }
        Some(iz as usize * self.width + ix as usize)
    }

    pub fn ground_y(&self, x: i32, z: i32) -> Option<i32> {
        self.index(x, z).and_then(|i| self.cells[i])
    }

    pub fn set_ground_y(&mut self, x: i32, z: i32, y: Option<i32>) {
        if let Some(i) = self.index(x, z) {
            self.cells[i] = y;
        }
    }

    pub fn cells(&self) -> &[Option<i32>] {
        &self.cells
    }

    /// Block coordinates of every cell carrying data, row by row.
    pub fn known_coords(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        let width = self.width.max(1);
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_some())
            .filter_map(move |(i, _)| {
                let x = i64::from(self.min_x) + (i % width) as i64;
                let z = i64::from(self.min_z) + (i / width) as i64;
                Some((i32::try_from(x).ok()?, i32::try_from(z).ok()?))
            })
    }

    /// Number of cells carrying data.
    pub fn known_cells(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_major_indexing() {
        let grid = TerrainGrid::new(10, 20, 3, 2, vec![Some(1), Some(2), Some(3), Some(4), None, Some(6)])
            .unwrap();
        assert_eq!(grid.ground_y(10, 20), Some(1));
        assert_eq!(grid.ground_y(12, 20), Some(3));
        assert_eq!(grid.ground_y(10, 21), Some(4));
        assert_eq!(grid.ground_y(11, 21), None);
        assert_eq!(grid.ground_y(12, 21), Some(6));
        assert_eq!(grid.known_cells(), 5);
        let coords: Vec<_> = grid.known_coords().collect();
        assert_eq!(coords, vec![(10, 20), (11, 20), (12, 20), (10, 21), (12, 21)]);
    }

    #[test]
    fn test_out_of_bounds_is_no_data() {
        let grid = TerrainGrid::new(0, 0, 2, 2, vec![Some(5); 4]).unwrap();
        assert!(!grid.in_bounds(-1, 0));
        assert!(!grid.in_bounds(2, 0));
        assert!(!grid.in_bounds(0, 2));
        assert_eq!(grid.ground_y(i32::MIN, i32::MAX), None);
    }

    #[test]
    fn test_set_ground_y() {
        let mut grid = TerrainGrid::new(0, 0, 2, 1, vec![None, None]).unwrap();
        grid.set_ground_y(1, 0, Some(9));
        grid.set_ground_y(5, 5, Some(9));
        assert_eq!(grid.cells(), &[None, Some(9)]);
    }

    #[test]
    fn test_size_mismatch_rejected() {
        assert!(TerrainGrid::new(0, 0, 2, 2, vec![None; 3]).is_none());
    }
}
