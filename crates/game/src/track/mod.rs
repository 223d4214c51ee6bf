mod animator;
mod generate;

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};

use glam::IVec2;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

pub use animator::{AnimatorConfig, ObstacleAnimator};
pub use generate::{
    BlockParams, LANE_CLEARANCE, Layout, MOVING_FRACTION, MazeParams, ObstructionStrategy,
};

/// Inset applied when a start slot would land outside the track.
pub const START_INSET: i32 = 10;

/// Axis-aligned integer rectangle; `y` grows towards the finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle of the given size centred on `center`, truncated to whole units.
    pub fn centered(center: glam::DVec2, width: i32, height: i32) -> Self {
        Self::new(
            (center.x - (width / 2) as f64) as i32,
            (center.y - (height / 2) as f64) as i32,
            width,
            height,
        )
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.right() <= self.right()
            && other.y >= self.y
            && other.bottom() <= self.bottom()
    }
}

/// Heading in degrees (0 = towards the finish) and a countdown to the next reversal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Motion {
    pub heading: f64,
    pub ticks_until_reversal: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub rect: Rect,
    pub motion: Option<Motion>,
}

impl Obstacle {
    pub fn fixed(rect: Rect) -> Self {
        Self { rect, motion: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackKind {
    OpenField,
    RandomBlocks,
    RandomMaze,
    MovingBlocks,
}

impl TrackKind {
    pub const ALL: [TrackKind; 4] = [
        TrackKind::RandomBlocks,
        TrackKind::RandomMaze,
        TrackKind::MovingBlocks,
        TrackKind::OpenField,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TrackKind::OpenField => "Open Field",
            TrackKind::RandomBlocks => "Random Blocks",
            TrackKind::RandomMaze => "Random Maze",
            TrackKind::MovingBlocks => "Moving Blocks",
        }
    }

    /// Unknown names fall back to the obstruction-free field.
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            log::warn!("Unknown track type {:?}, using {}", name, TrackKind::OpenField);
            TrackKind::OpenField
        })
    }

    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|k| *k == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {what}: {name}")]
pub struct UnknownName {
    what: &'static str,
    name: String,
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

impl FromStr for TrackKind {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        Self::ALL
            .into_iter()
            .find(|kind| normalize(kind.name()) == wanted)
            .ok_or_else(|| UnknownName {
                what: "track type",
                name: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Moderate,
    Difficult,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Moderate, Difficulty::Difficult];

    pub fn name(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Moderate => "Moderate",
            Difficulty::Difficult => "Difficult",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Difficulty::Easy => Difficulty::Moderate,
            Difficulty::Moderate => Difficulty::Difficult,
            Difficulty::Difficult => Difficulty::Easy,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Difficulty {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        Self::ALL
            .into_iter()
            .find(|level| normalize(level.name()) == wanted)
            .ok_or_else(|| UnknownName {
                what: "difficulty",
                name: s.to_string(),
            })
    }
}

/// Read-only copy of a track for the drawing side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSnapshot {
    pub kind: TrackKind,
    pub difficulty: Option<Difficulty>,
    pub bounds: Rect,
    pub start: IVec2,
    pub finish: IVec2,
    pub obstacles: Vec<Rect>,
}

/// Race course: fixed layout plus the obstacles of one variant.
///
/// The obstacle list is shared only with this track's animator. Call
/// [`Track::teardown`] when the track is replaced.
#[derive(Debug)]
pub struct Track {
    kind: TrackKind,
    difficulty: Option<Difficulty>,
    layout: Layout,
    obstacles: Arc<RwLock<Vec<Obstacle>>>,
    animator: Option<ObstacleAnimator>,
}

impl Track {
    pub fn generate(kind: TrackKind, difficulty: Difficulty) -> Self {
        Self::build(kind, Some(difficulty), &mut StdRng::from_entropy(), AnimatorConfig::default())
    }

    pub fn generate_seeded(kind: TrackKind, difficulty: Difficulty, seed: u64) -> Self {
        Self::build(
            kind,
            Some(difficulty),
            &mut StdRng::seed_from_u64(seed),
            AnimatorConfig::default(),
        )
    }

    /// Builds from control-panel names. An unknown type gives an open field;
    /// an unknown difficulty gives the requested type without obstructions.
    pub fn generate_named(kind: &str, difficulty: &str, seed: Option<u64>) -> Self {
        let kind = TrackKind::from_name(kind);
        let difficulty = match difficulty.parse::<Difficulty>() {
            Ok(level) => Some(level),
            Err(e) => {
                log::warn!("{}, generating {} without obstructions", e, kind);
                None
            }
        };
        Self::generate_variant(kind, difficulty, seed)
    }

    /// Without a difficulty the track keeps its kind but gets no obstructions.
    pub fn generate_variant(kind: TrackKind, difficulty: Option<Difficulty>, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::build(kind, difficulty, &mut rng, AnimatorConfig::default())
    }

    pub fn build(
        kind: TrackKind,
        difficulty: Option<Difficulty>,
        rng: &mut StdRng,
        animator_config: AnimatorConfig,
    ) -> Self {
        let layout = Layout::default();
        let obstacles = match difficulty {
            Some(level) => (kind.strategy())(&layout, level, rng, animator_config.reversal_ticks()),
            None => Vec::new(),
        };
        Self::from_parts(kind, difficulty, layout, obstacles, animator_config)
    }

    /// Starts an animator when any obstacle carries a motion tag.
    pub fn from_parts(
        kind: TrackKind,
        difficulty: Option<Difficulty>,
        layout: Layout,
        obstacles: Vec<Obstacle>,
        animator_config: AnimatorConfig,
    ) -> Self {
        let moving = obstacles.iter().filter(|o| o.motion.is_some()).count();
        let obstacles = Arc::new(RwLock::new(obstacles));

        let animator = if moving > 0 {
            match ObstacleAnimator::spawn(Arc::clone(&obstacles), animator_config) {
                Ok(animator) => Some(animator),
                Err(e) => {
                    log::error!("Failed to start obstacle animator, blocks stay still: {}", e);
                    None
                }
            }
        } else {
            None
        };

        log::debug!(
            "Generated {} ({}): {} obstacles, {} moving",
            kind,
            difficulty.map_or("no obstructions", |d| d.name()),
            obstacles.read().unwrap_or_else(PoisonError::into_inner).len(),
            moving
        );

        Self {
            kind,
            difficulty,
            layout,
            obstacles,
            animator,
        }
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn difficulty(&self) -> Option<Difficulty> {
        self.difficulty
    }

    pub fn bounds(&self) -> Rect {
        self.layout.bounds
    }

    pub fn start(&self) -> IVec2 {
        self.layout.start
    }

    pub fn finish(&self) -> IVec2 {
        self.layout.finish
    }

    pub fn spacing(&self) -> i32 {
        self.layout.spacing
    }

    pub fn is_animated(&self) -> bool {
        self.animator.as_ref().is_some_and(ObstacleAnimator::is_running)
    }

    pub fn obstacle_count(&self) -> usize {
        self.read_obstacles().len()
    }

    pub fn obstacles(&self) -> Vec<Obstacle> {
        self.read_obstacles().clone()
    }

    /// Start point for a slot: fanning out from the centre line, alternating
    /// left and right, clamped just inside the bounds.
    pub fn start_position(&self, index: usize) -> IVec2 {
        let spacing = self.layout.spacing as i64;
        let index = index as i64;
        let x = if index % 2 == 0 {
            -((index + 1) * spacing)
        } else {
            index * spacing
        };

        let bounds = self.layout.bounds;
        let x = if x < bounds.x as i64 {
            bounds.x + START_INSET
        } else if x > bounds.right() as i64 {
            bounds.right() - START_INSET
        } else {
            x as i32
        };
        IVec2::new(x, self.layout.start.y)
    }

    /// True when `rect` leaves the bounds or touches any obstacle.
    pub fn collides_with(&self, rect: &Rect) -> bool {
        if !self.layout.bounds.contains_rect(rect) {
            return true;
        }
        self.read_obstacles().iter().any(|o| o.rect.intersects(rect))
    }

    pub fn has_finished(&self, y: f64) -> bool {
        y >= self.layout.finish.y as f64
    }

    /// Stops the animator, then clears the obstacles. Safe to call twice.
    pub fn teardown(&mut self) {
        if let Some(mut animator) = self.animator.take() {
            animator.stop();
        }
        self.obstacles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn snapshot(&self) -> TrackSnapshot {
        TrackSnapshot {
            kind: self.kind,
            difficulty: self.difficulty,
            bounds: self.layout.bounds,
            start: self.layout.start,
            finish: self.layout.finish,
            obstacles: self.read_obstacles().iter().map(|o| o.rect).collect(),
        }
    }

    fn read_obstacles(&self) -> std::sync::RwLockReadGuard<'_, Vec<Obstacle>> {
        self.obstacles.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_field() -> Track {
        Track::generate(TrackKind::OpenField, Difficulty::Easy)
    }

    #[test]
    fn start_slots_alternate_around_centre() {
        let track = open_field();
        let spacing = track.spacing();

        let p0 = track.start_position(0);
        let p1 = track.start_position(1);
        assert_eq!(p0.x, -spacing);
        assert_eq!(p1.x, spacing);
        assert_eq!(p0.y, track.start().y);

        let p2 = track.start_position(2);
        let p3 = track.start_position(3);
        assert_eq!(p2.x, -3 * spacing);
        assert_eq!(p3.x, 3 * spacing);
        assert!(p2.x.abs() > p0.x.abs());
    }

    #[test]
    fn start_slots_clamp_inside_bounds() {
        let track = open_field();
        let bounds = track.bounds();

        assert_eq!(track.start_position(8).x, bounds.x + START_INSET);
        assert_eq!(track.start_position(40).x, bounds.x + START_INSET);
        assert_eq!(track.start_position(41).x, bounds.right() - START_INSET);
    }

    #[test]
    fn leaving_bounds_is_a_collision() {
        let track = open_field();
        assert_eq!(track.obstacle_count(), 0);
        let bounds = track.bounds();

        assert!(!track.collides_with(&Rect::new(-10, 0, 20, 30)));
        assert!(track.collides_with(&Rect::new(bounds.x - 1, 0, 20, 30)));
        assert!(track.collides_with(&Rect::new(bounds.right() - 19, 0, 20, 30)));
        assert!(track.collides_with(&Rect::new(0, bounds.y - 1, 20, 30)));
        assert!(track.collides_with(&Rect::new(0, bounds.bottom() - 29, 20, 30)));
    }

    #[test]
    fn obstacles_collide() {
        let track = Track::from_parts(
            TrackKind::RandomBlocks,
            Some(Difficulty::Easy),
            Layout::default(),
            vec![Obstacle::fixed(Rect::new(100, 2000, 500, 500))],
            AnimatorConfig::default(),
        );

        assert!(track.collides_with(&Rect::new(90, 1990, 20, 30)));
        assert!(!track.collides_with(&Rect::new(60, 1990, 20, 30)));
        assert!(!track.is_animated());
    }

    #[test]
    fn seeded_blocks_are_reproducible() {
        let a = Track::generate_seeded(TrackKind::RandomBlocks, Difficulty::Easy, 99);
        let b = Track::generate_seeded(TrackKind::RandomBlocks, Difficulty::Easy, 99);

        assert_eq!(a.obstacle_count(), 30);
        assert_eq!(a.obstacles(), b.obstacles());
        for obstacle in a.obstacles() {
            assert!(obstacle.rect.y >= a.start().y + LANE_CLEARANCE);
            assert!(obstacle.rect.bottom() <= a.finish().y - LANE_CLEARANCE);
        }
    }

    #[test]
    fn moving_blocks_animate_until_teardown() {
        let mut track = Track::generate_seeded(TrackKind::MovingBlocks, Difficulty::Moderate, 5);
        assert!(track.is_animated());
        assert_eq!(track.obstacle_count(), 100);

        track.teardown();
        assert!(!track.is_animated());
        assert_eq!(track.obstacle_count(), 0);

        track.teardown();
        assert_eq!(track.obstacle_count(), 0);
    }

    #[test]
    fn unknown_names_fall_back() {
        let track = Track::generate_named("Spiral", "Easy", Some(1));
        assert_eq!(track.kind(), TrackKind::OpenField);
        assert_eq!(track.obstacle_count(), 0);

        let track = Track::generate_named("Random Maze", "Brutal", Some(1));
        assert_eq!(track.kind(), TrackKind::RandomMaze);
        assert_eq!(track.difficulty(), None);
        assert_eq!(track.obstacle_count(), 0);
    }

    #[test]
    fn names_parse_loosely() {
        assert_eq!("random-blocks".parse::<TrackKind>().unwrap(), TrackKind::RandomBlocks);
        assert_eq!("Moving Blocks".parse::<TrackKind>().unwrap(), TrackKind::MovingBlocks);
        assert_eq!("difficult".parse::<Difficulty>().unwrap(), Difficulty::Difficult);
        assert!("hard".parse::<Difficulty>().is_err());
    }

    #[test]
    fn snapshot_copies_geometry() {
        let track = Track::generate_seeded(TrackKind::RandomMaze, Difficulty::Moderate, 3);
        let snapshot = track.snapshot();
        assert_eq!(snapshot.kind, TrackKind::RandomMaze);
        assert_eq!(snapshot.obstacles.len(), track.obstacle_count());
        assert_eq!(snapshot.finish, track.finish());
    }
}
