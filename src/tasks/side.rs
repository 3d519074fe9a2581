use rand::seq::index::sample;

use crate::config::SideParams;
use crate::error::Result;
use crate::geometry::RectPx;
use crate::outcome::Outcome;
use crate::scene::{Scene, SceneItem};
use crate::session::Counters;
use crate::tasks::{Progress, ResponseClock, TrialContext};

/// Thickness of every wall region in pixels.
const WALL_DEPTH: f32 = 200.0;

/// Side task: the subject must reach a drawn wall region (or, at level 1,
/// merely move the pointer). Levels 1-6 shrink the drawn subset from all
/// four walls down to a single partial wall.
#[derive(Debug)]
pub struct SideTask {
    pub(crate) params: SideParams,
    pub(crate) level: u8,
    /// Drawn walls for this trial as (wall index, rectangle).
    walls: Vec<(usize, RectPx)>,
    start_rect: Option<RectPx>,
    pub(crate) clock: ResponseClock,
}

/// The eight candidate wall regions: indices 0-3 are the full top, bottom,
/// left and right walls; 4-7 the quarter-length partial versions.
pub fn wall_rects(screen: RectPx) -> [RectPx; 8] {
    [
        RectPx::new(0.0, 0.0, screen.w, WALL_DEPTH),
        RectPx::new(0.0, screen.h - WALL_DEPTH, screen.w, WALL_DEPTH),
        RectPx::new(0.0, 0.0, WALL_DEPTH, screen.h),
        RectPx::new(screen.w - WALL_DEPTH, 0.0, WALL_DEPTH, screen.h),
        RectPx::new(0.0, 0.0, screen.w / 4.0, WALL_DEPTH),
        RectPx::new(0.0, screen.h - WALL_DEPTH, screen.w / 4.0, WALL_DEPTH),
        RectPx::new(0.0, 0.0, WALL_DEPTH, screen.h / 4.0),
        RectPx::new(screen.w - WALL_DEPTH, 0.0, WALL_DEPTH, screen.h / 4.0),
    ]
}

impl SideTask {
    pub fn new(params: SideParams) -> Self {
        let level = params.start_level;
        Self {
            params,
            level,
            walls: Vec::new(),
            start_rect: None,
            clock: ResponseClock::default(),
        }
    }

    pub fn setup(&mut self, ctx: &mut TrialContext<'_>) -> Result<()> {
        let indices: Vec<usize> = match self.level {
            1 | 2 => vec![0, 1, 2, 3],
            3 => sample(ctx.rng, 4, 3).into_vec(),
            4 => sample(ctx.rng, 4, 2).into_vec(),
            5 => sample(ctx.rng, 4, 1).into_vec(),
            _ => sample(ctx.rng, 4, 1)
                .into_vec()
                .into_iter()
                .map(|i| i + 4)
                .collect(),
        };
        let rects = wall_rects(ctx.screen);
        self.walls = indices.into_iter().map(|i| (i, rects[i])).collect();

        ctx.pointer
            .reset_center(ctx.screen.w / 2.0, ctx.screen.h / 2.0);
        self.start_rect = Some(ctx.pointer.rect);
        self.clock.arm(ctx.now, self.params.response_secs);
        Ok(())
    }

    pub fn evaluate(&mut self, ctx: &mut TrialContext<'_>) -> Option<Outcome> {
        if self.clock.expired(ctx.now) {
            return Some(Outcome::Timeout);
        }

        if self.level == 1 {
            // Any movement at all counts at level 1.
            if self.start_rect.is_some_and(|start| ctx.pointer.rect != start) {
                return Some(Outcome::Correct);
            }
        } else if self
            .walls
            .iter()
            .any(|(_, wall)| wall.intersects(&ctx.pointer.rect))
        {
            return Some(Outcome::Correct);
        }
        None
    }

    pub fn register_outcome(&mut self, _outcome: Outcome, counters: &Counters) -> Progress {
        if counters.correct_in_window >= self.params.trials_to_criterion {
            self.level += 1;
            if self.level > 6 {
                self.level = self.params.start_level;
                Progress::TaskComplete
            } else {
                Progress::AdvanceWindow
            }
        } else {
            Progress::Continue
        }
    }

    pub fn log_fields(&self, counters: &Counters, reaction_secs: f32) -> String {
        format!(
            "{}  {}  {}  {}  {:.2}",
            counters.total_trials,
            counters.trials_in_window,
            self.level,
            self.walls_label(),
            reaction_secs,
        )
    }

    /// Which walls were drawn this trial: T, R, B, L in that order.
    fn walls_label(&self) -> String {
        let drawn = |full: usize, partial: usize| {
            self.walls.iter().any(|(i, _)| *i == full || *i == partial)
        };
        let mut label = String::new();
        if drawn(0, 4) {
            label.push('T');
        }
        if drawn(3, 7) {
            label.push('R');
        }
        if drawn(1, 5) {
            label.push('B');
        }
        if drawn(2, 6) {
            label.push('L');
        }
        label
    }

    pub fn populate_scene(&self, scene: &mut Scene) {
        for (_, wall) in &self.walls {
            scene.push(SceneItem::Wall(*wall));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SideParams;
    use crate::geometry::Pointer;
    use crate::input::AxisSample;
    use crate::stimulus::StimulusLibrary;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn params() -> SideParams {
        SideParams {
            trials_to_criterion: 2,
            start_level: 1,
            response_secs: 10.0,
            fail_timeout_secs: 5.0,
            titration: false,
        }
    }

    fn screen() -> RectPx {
        RectPx::new(0.0, 0.0, 1920.0, 1080.0)
    }

    struct Fixture {
        pointer: Pointer,
        rng: StdRng,
        library: StimulusLibrary,
    }

    impl Fixture {
        fn new(seed: u64) -> Self {
            Self {
                pointer: Pointer::new(),
                rng: StdRng::seed_from_u64(seed),
                library: StimulusLibrary::from_entries(vec![("a", 10.0, 10.0), ("b", 10.0, 10.0)]),
            }
        }

        fn ctx(&mut self, now: u64) -> TrialContext<'_> {
            TrialContext {
                pointer: &mut self.pointer,
                screen: screen(),
                rng: &mut self.rng,
                library: &mut self.library,
                input: AxisSample::default(),
                now,
            }
        }
    }

    #[test]
    fn wall_subset_size_tracks_level() {
        for (level, expected) in [(1, 4), (2, 4), (3, 3), (4, 2), (5, 1), (6, 1)] {
            let mut task = SideTask::new(params());
            task.level = level;
            let mut fixture = Fixture::new(level as u64);
            task.setup(&mut fixture.ctx(0)).unwrap();
            assert_eq!(task.walls.len(), expected, "level {level}");
            if level == 6 {
                assert!(task.walls.iter().all(|(i, _)| (4..8).contains(i)));
            } else {
                assert!(task.walls.iter().all(|(i, _)| (0..4).contains(i)));
            }
        }
    }

    #[test]
    fn level_one_succeeds_on_any_movement() {
        let mut task = SideTask::new(params());
        let mut fixture = Fixture::new(1);
        task.setup(&mut fixture.ctx(0)).unwrap();

        assert_eq!(task.evaluate(&mut fixture.ctx(1)), None);
        fixture.pointer.rect.x += 3.0;
        assert_eq!(task.evaluate(&mut fixture.ctx(2)), Some(Outcome::Correct));
    }

    #[test]
    fn higher_levels_require_wall_contact() {
        let mut task = SideTask::new(params());
        task.level = 2;
        let mut fixture = Fixture::new(2);
        task.setup(&mut fixture.ctx(0)).unwrap();

        // Center of screen: no wall overlap.
        assert_eq!(task.evaluate(&mut fixture.ctx(1)), None);
        fixture.pointer.reset(0.0, 0.0);
        assert_eq!(task.evaluate(&mut fixture.ctx(2)), Some(Outcome::Correct));
    }

    #[test]
    fn timeout_beats_contact_in_same_tick() {
        let mut task = SideTask::new(params());
        task.level = 2;
        let mut fixture = Fixture::new(3);
        task.setup(&mut fixture.ctx(0)).unwrap();

        fixture.pointer.reset(0.0, 0.0);
        let expired = 10 * 60 + 1;
        assert_eq!(
            task.evaluate(&mut fixture.ctx(expired)),
            Some(Outcome::Timeout)
        );
    }

    #[test]
    fn criterion_advances_level_and_wraps_at_six() {
        let mut task = SideTask::new(params());
        task.level = 6;
        let counters = Counters {
            total_trials: 12,
            trials_in_window: 2,
            correct_in_window: 2,
        };
        assert_eq!(
            task.register_outcome(Outcome::Correct, &counters),
            Progress::TaskComplete
        );
        assert_eq!(task.level, params().start_level);
    }

    #[test]
    fn no_advance_below_criterion() {
        let mut task = SideTask::new(params());
        let counters = Counters {
            total_trials: 1,
            trials_in_window: 1,
            correct_in_window: 1,
        };
        assert_eq!(
            task.register_outcome(Outcome::Correct, &counters),
            Progress::Continue
        );
        assert_eq!(task.level, 1);
    }

    #[test]
    fn walls_label_orders_t_r_b_l() {
        let mut task = SideTask::new(params());
        let rects = wall_rects(screen());
        task.walls = vec![(0, rects[0]), (1, rects[1]), (2, rects[2]), (3, rects[3])];
        assert_eq!(task.walls_label(), "TRBL");

        task.walls = vec![(7, rects[7])];
        assert_eq!(task.walls_label(), "R");
    }
}
