use geovox::data::BlockCoordinate;
use geovox::projection::Region;
use geovox::raster::{band_cells, band_cells_within, bresenham};
use proptest::prelude::*;
use std::collections::{HashSet, VecDeque};

fn coord() -> impl Strategy<Value = BlockCoordinate> {
    (-60i32..60, -60i32..60).prop_map(|(x, z)| BlockCoordinate::new(x, z))
}

fn is_connected(cells: &[BlockCoordinate]) -> bool {
    let all: HashSet<BlockCoordinate> = cells.iter().copied().collect();
    let Some(&start) = cells.first() else {
        return true;
    };
    let mut seen = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);
    while let Some(c) = queue.pop_front() {
        for dx in -1..=1 {
            for dz in -1..=1 {
                let n = BlockCoordinate::new(c.x + dx, c.z + dz);
                if all.contains(&n) && seen.insert(n) {
                    queue.push_back(n);
                }
            }
        }
    }
    seen.len() == all.len()
}

proptest! {
    #[test]
    fn single_width_segment_is_an_eight_connected_walk(a in coord(), b in coord()) {
        let cells = band_cells(&[a, b], 1);
        prop_assert_eq!(cells.first(), Some(&a));
        prop_assert_eq!(cells.last(), Some(&b));
        let expected = (b.x - a.x).abs().max((b.z - a.z).abs()) as usize + 1;
        prop_assert_eq!(cells.len(), expected);
        for pair in cells.windows(2) {
            prop_assert!(pair[0].touches(&pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn polyline_band_is_connected_and_covers_centre_line(
        path in prop::collection::vec(coord(), 1..6),
        width in 1i32..8,
    ) {
        let cells = band_cells(&path, width);
        let unique: HashSet<_> = cells.iter().copied().collect();
        prop_assert_eq!(unique.len(), cells.len());
        prop_assert!(is_connected(&cells));
        for seg in path.windows(2) {
            for c in bresenham(seg[0], seg[1]) {
                prop_assert!(unique.contains(&c), "centre cell {:?} missing", c);
            }
        }
        for v in &path {
            prop_assert!(unique.contains(v));
        }
    }

    #[test]
    fn band_is_bounded_by_width(a in coord(), b in coord(), width in 1i32..10) {
        let cells = band_cells(&[a, b], width);
        let line = bresenham(a, b).len();
        let across = (2 * (width / 2) + 1) as usize;
        prop_assert!(cells.len() <= line * across);
        prop_assert!(cells.len() >= line);
    }

    #[test]
    fn clipped_band_is_the_band_inside_the_region(
        path in prop::collection::vec(coord(), 1..5),
        width in 1i32..12,
        min_x in -40i32..0,
        min_z in -40i32..0,
        w in 0i32..60,
        d in 0i32..60,
    ) {
        let region = Region { min_x, max_x: min_x + w, min_z, max_z: min_z + d };
        let (cells, clipped) = band_cells_within(&path, width, &region);
        let full = band_cells(&path, width);
        let inside: Vec<_> = full.iter().copied().filter(|c| region.contains(*c)).collect();
        prop_assert_eq!(&cells, &inside);
        prop_assert!(clipped >= full.len() - inside.len());
    }
}
