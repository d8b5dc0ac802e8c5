//! Player feedback driven by engine events: floating score popups, clear flash cells, bell.

use crate::game::GameEvent;
use crate::grid::Position;
use crate::resolver::Resolution;

/// Popups float up one row per step and disappear after their lifetime.
const POPUP_STEP_MS: u32 = 150;
pub const POPUP_LIFETIME_MS: u32 = 1500;
/// Shallowest chain that rings the bell.
pub const BELL_MIN_CHAIN: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScorePopup {
    pub col: i32,
    pub row: i32,
    pub points: u64,
    pub chain: u32,
    pub age_ms: u32,
}

#[derive(Debug, Default)]
pub struct Feedback {
    popups: Vec<ScorePopup>,
    pending_flash: Vec<Position>,
    animations: bool,
    bell: bool,
    ring: bool,
}

impl Feedback {
    pub fn new(animations: bool, bell: bool) -> Self {
        Self {
            animations,
            bell,
            ..Self::default()
        }
    }

    pub fn popups(&self) -> &[ScorePopup] {
        &self.popups
    }

    /// Reacts to one drained event. `resolution` is the engine's latest resolution report.
    pub fn observe(&mut self, event: &GameEvent, resolution: Option<&Resolution>) {
        match event {
            GameEvent::Chain { depth, points, .. } => {
                if self.bell && *depth >= BELL_MIN_CHAIN {
                    self.ring = true;
                }
                if !self.animations {
                    return;
                }
                let Some(pass) = resolution.and_then(|r| r.passes.iter().find(|p| p.chain == *depth))
                else {
                    return;
                };
                // Popup starts at the top-left cleared cell of the pass.
                if let Some(origin) = pass.cleared.iter().min_by_key(|p| (p.row, p.col)) {
                    self.popups.push(ScorePopup {
                        col: origin.col,
                        row: origin.row,
                        points: *points,
                        chain: *depth,
                        age_ms: 0,
                    });
                }
                self.pending_flash.extend(pass.cleared.iter().copied());
            }
            GameEvent::Started => {
                self.popups.clear();
                self.pending_flash.clear();
            }
            _ => {}
        }
    }

    pub fn tick(&mut self, delta_ms: u32) {
        self.popups.retain_mut(|p| {
            let old_steps = p.age_ms / POPUP_STEP_MS;
            p.age_ms = p.age_ms.saturating_add(delta_ms);
            if p.age_ms / POPUP_STEP_MS > old_steps && p.row > 0 {
                p.row -= 1;
            }
            p.age_ms < POPUP_LIFETIME_MS
        });
    }

    /// Cells cleared since the last call, for the flash effect.
    pub fn take_flash(&mut self) -> Vec<Position> {
        std::mem::take(&mut self.pending_flash)
    }

    /// True once per chain that should ring the bell.
    pub fn take_bell(&mut self) -> bool {
        std::mem::take(&mut self.ring)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::resolver::ChainPass;

    fn resolution() -> Resolution {
        let pass = |chain: u32, row: i32| ChainPass {
            chain,
            cleared: (0..4).map(|col| Position::new(col, row)).collect(),
            points: 40,
        };
        Resolution {
            grid: Grid::empty(),
            score_delta: 120,
            chain_depth: 2,
            passes: vec![pass(1, 11), pass(2, 10)],
        }
    }

    fn chain(depth: u32) -> GameEvent {
        GameEvent::Chain {
            depth,
            cleared: 4,
            points: 40,
        }
    }

    #[test]
    fn test_chain_creates_popup_and_flash() {
        let mut fb = Feedback::new(true, false);
        let res = resolution();
        fb.observe(&chain(1), Some(&res));
        assert_eq!(fb.popups().len(), 1);
        assert_eq!(fb.popups()[0].row, 11);
        assert_eq!(fb.popups()[0].col, 0);
        assert_eq!(fb.take_flash().len(), 4);
        assert!(fb.take_flash().is_empty());
        assert!(!fb.take_bell());
    }

    #[test]
    fn test_bell_only_on_deep_chains_when_enabled() {
        let res = resolution();
        let mut quiet = Feedback::new(true, false);
        quiet.observe(&chain(2), Some(&res));
        assert!(!quiet.take_bell());

        let mut loud = Feedback::new(false, true);
        loud.observe(&chain(1), Some(&res));
        assert!(!loud.take_bell());
        loud.observe(&chain(2), Some(&res));
        assert!(loud.take_bell());
        assert!(!loud.take_bell());
        assert!(loud.popups().is_empty());
    }

    #[test]
    fn test_popups_float_and_expire() {
        let mut fb = Feedback::new(true, false);
        fb.observe(&chain(1), Some(&resolution()));
        fb.tick(POPUP_STEP_MS);
        assert_eq!(fb.popups()[0].row, 10);
        fb.tick(POPUP_LIFETIME_MS);
        assert!(fb.popups().is_empty());
    }

    #[test]
    fn test_new_game_clears_feedback() {
        let mut fb = Feedback::new(true, false);
        fb.observe(&chain(1), Some(&resolution()));
        fb.observe(&GameEvent::Started, None);
        assert!(fb.popups().is_empty());
        assert!(fb.take_flash().is_empty());
    }
}
