use glam::IVec2;
use rand::Rng;
use rand::rngs::StdRng;

use super::{Difficulty, Motion, Obstacle, Rect, TrackKind};

/// Clear distance kept free of obstructions past the start and before the finish.
pub const LANE_CLEARANCE: i32 = 1000;

/// Share of moving-blocks obstacles that actually move.
pub const MOVING_FRACTION: f64 = 0.5;

/// Fixed geometry every variant starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub bounds: Rect,
    pub start: IVec2,
    pub finish: IVec2,
    pub spacing: i32,
}

impl Default for Layout {
    fn default() -> Self {
        let bounds = Rect::new(-4000, -1000, 8000, 30000);
        Self {
            bounds,
            start: IVec2::new(0, 0),
            finish: IVec2::new(0, bounds.bottom() - 1000),
            spacing: 1000 / 2,
        }
    }
}

pub type ObstructionStrategy = fn(&Layout, Difficulty, &mut StdRng, u32) -> Vec<Obstacle>;

impl TrackKind {
    pub fn strategy(self) -> ObstructionStrategy {
        match self {
            TrackKind::OpenField => open_field,
            TrackKind::RandomBlocks => random_blocks,
            TrackKind::RandomMaze => random_maze,
            TrackKind::MovingBlocks => moving_blocks,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockParams {
    pub count: usize,
    pub min_size: i32,
    pub max_width: i32,
    pub max_height: i32,
}

impl BlockParams {
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        let (count, min_size, max_width, max_height) = match difficulty {
            Difficulty::Easy => (30, 500, 3000, 1000),
            Difficulty::Moderate => (100, 200, 2000, 1000),
            Difficulty::Difficult => (200, 100, 1500, 1000),
        };
        Self {
            count,
            min_size,
            max_width,
            max_height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MazeParams {
    pub wall_height: i32,
    pub gap_width: i32,
    pub wall_spacing: i32,
    pub max_gaps: usize,
}

impl MazeParams {
    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        let (wall_height, gap_width, wall_spacing, max_gaps) = match difficulty {
            Difficulty::Easy => (1000, 1000, 1000, 4),
            Difficulty::Moderate => (500, 500, 500, 6),
            Difficulty::Difficult => (150, 150, 150, 6),
        };
        Self {
            wall_height,
            gap_width,
            wall_spacing,
            max_gaps,
        }
    }
}

fn open_field(_: &Layout, _: Difficulty, _: &mut StdRng, _: u32) -> Vec<Obstacle> {
    Vec::new()
}

fn random_blocks(layout: &Layout, difficulty: Difficulty, rng: &mut StdRng, _: u32) -> Vec<Obstacle> {
    let params = BlockParams::for_difficulty(difficulty);
    let x_range = layout.bounds.width;
    let y_range = layout.finish.y - layout.start.y - 2 * LANE_CLEARANCE;

    (0..params.count)
        .map(|_| {
            let w = params.min_size + rng.gen_range(0..params.max_width);
            let h = params.min_size + rng.gen_range(0..params.max_height);

            let x = rng.gen_range(0..x_range) - w / 2 - x_range / 2;
            let y = rng.gen_range(0..(y_range - h).max(1)) + layout.start.y + LANE_CLEARANCE;

            Obstacle::fixed(Rect::new(x, y, w, h))
        })
        .collect()
}

fn random_maze(layout: &Layout, difficulty: Difficulty, rng: &mut StdRng, _: u32) -> Vec<Obstacle> {
    let params = MazeParams::for_difficulty(difficulty);
    let bounds = layout.bounds;
    let y_start = layout.start.y + LANE_CLEARANCE;
    // bands stop two clearances short of the finish
    let y_end = layout.finish.y - layout.start.y - 2 * LANE_CLEARANCE;

    let mut walls = Vec::new();
    let mut y = y_start;
    while y + params.wall_height <= y_end {
        let gaps = rng.gen_range(1..=params.max_gaps);
        let mut openings: Vec<i32> = (0..gaps)
            .map(|_| bounds.x + rng.gen_range(0..bounds.width - params.gap_width))
            .collect();
        openings.sort_unstable();

        // segments are the complement of the openings along the band
        let mut x1 = bounds.x + 1;
        for x2 in openings {
            if x2 > x1 {
                walls.push(Obstacle::fixed(Rect::new(x1, y, x2 - x1, params.wall_height)));
            }
            x1 = x1.max(x2 + params.gap_width);
        }
        let right = bounds.right() - 1;
        if x1 < right {
            walls.push(Obstacle::fixed(Rect::new(x1, y, right - x1, params.wall_height)));
        }

        y += params.wall_spacing + params.wall_height;
    }
    walls
}

fn moving_blocks(
    layout: &Layout,
    difficulty: Difficulty,
    rng: &mut StdRng,
    reversal_ticks: u32,
) -> Vec<Obstacle> {
    let mut obstacles = random_blocks(layout, difficulty, rng, reversal_ticks);
    for obstacle in &mut obstacles {
        if rng.gen_bool(MOVING_FRACTION) {
            obstacle.motion = Some(Motion {
                heading: rng.gen_range(0..360) as f64,
                ticks_until_reversal: reversal_ticks,
            });
        }
    }
    obstacles
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn default_layout_matches_course() {
        let layout = Layout::default();
        assert_eq!(layout.bounds, Rect::new(-4000, -1000, 8000, 30000));
        assert_eq!(layout.finish, IVec2::new(0, 28000));
        assert_eq!(layout.spacing, 500);
        assert!(layout.finish.y > layout.start.y);
    }

    #[test]
    fn harder_blocks_are_more_and_smaller() {
        let easy = BlockParams::for_difficulty(Difficulty::Easy);
        let hard = BlockParams::for_difficulty(Difficulty::Difficult);
        assert!(hard.count > easy.count);
        assert!(hard.min_size < easy.min_size);
        assert!(hard.max_width < easy.max_width);
    }

    #[test]
    fn blocks_stay_inside_the_clear_lanes() {
        let layout = Layout::default();
        for difficulty in Difficulty::ALL {
            let blocks = random_blocks(&layout, difficulty, &mut rng(), 600);
            assert_eq!(blocks.len(), BlockParams::for_difficulty(difficulty).count);
            for block in &blocks {
                assert!(block.rect.y >= layout.start.y + LANE_CLEARANCE);
                assert!(block.rect.bottom() <= layout.finish.y - LANE_CLEARANCE);
                assert!(block.motion.is_none());
            }
        }
    }

    #[test]
    fn maze_bands_leave_openings() {
        let layout = Layout::default();
        let params = MazeParams::for_difficulty(Difficulty::Easy);
        let walls = random_maze(&layout, Difficulty::Easy, &mut rng(), 600);
        assert!(!walls.is_empty());

        let mut bands: Vec<i32> = walls.iter().map(|w| w.rect.y).collect();
        bands.dedup();
        for band_y in bands {
            let covered: i32 = walls
                .iter()
                .filter(|w| w.rect.y == band_y)
                .map(|w| w.rect.width)
                .sum();
            assert!(covered <= layout.bounds.width - params.gap_width);
        }

        for wall in &walls {
            assert!(wall.rect.width > 0);
            assert_eq!(wall.rect.height, params.wall_height);
            assert!(wall.rect.x > layout.bounds.x);
            assert!(wall.rect.right() < layout.bounds.right());
            assert!(wall.rect.bottom() <= layout.finish.y - 2 * LANE_CLEARANCE);
        }
    }

    #[test]
    fn maze_stops_two_clearances_before_finish() {
        let layout = Layout::default();
        let params = MazeParams::for_difficulty(Difficulty::Difficult);
        let walls = random_maze(&layout, Difficulty::Difficult, &mut rng(), 600);

        let last_band = walls.iter().map(|w| w.rect.y).max().unwrap();
        assert!(last_band + params.wall_height <= 26000);
        assert!(last_band + params.wall_height + params.wall_spacing + params.wall_height > 26000);
    }

    #[test]
    fn harder_maze_has_more_bands() {
        let layout = Layout::default();
        let count_bands = |difficulty| {
            let mut ys: Vec<i32> = random_maze(&layout, difficulty, &mut rng(), 600)
                .iter()
                .map(|w| w.rect.y)
                .collect();
            ys.dedup();
            ys.len()
        };
        assert!(count_bands(Difficulty::Difficult) > count_bands(Difficulty::Easy));
    }

    #[test]
    fn moving_blocks_tag_a_fraction() {
        let layout = Layout::default();
        let blocks = moving_blocks(&layout, Difficulty::Moderate, &mut rng(), 600);
        let tagged = blocks.iter().filter(|b| b.motion.is_some()).count();

        assert_eq!(blocks.len(), 100);
        assert!(tagged > 0 && tagged < blocks.len());
        for motion in blocks.iter().filter_map(|b| b.motion) {
            assert!((0.0..360.0).contains(&motion.heading));
            assert_eq!(motion.ticks_until_reversal, 600);
        }
    }
}
