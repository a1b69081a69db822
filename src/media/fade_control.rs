use serde::{Deserialize, Serialize};

use super::fade::{fade_factor, fade_in_ratio, fade_out_ratio};
use super::position::PositionSnapshot;

pub const DEFAULT_FADE_WINDOW_SECS: f64 = 5.0;
pub const DEFAULT_FADE_OUT_EPSILON_SECS: f64 = 0.2;

/// Caller-facing fade configuration of one session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FadeConfig {
    pub fade_in: bool,
    pub fade_out: bool,
    pub window_secs: f64,
    /// Fade out now, regardless of how much of the media is left.
    pub force_fade_out: bool,
}

impl Default for FadeConfig {
    fn default() -> Self {
        Self::with_window(DEFAULT_FADE_WINDOW_SECS)
    }
}

impl FadeConfig {
    pub fn with_window(window_secs: f64) -> Self {
        Self {
            fade_in: false,
            fade_out: false,
            window_secs,
            force_fade_out: false,
        }
    }
}

/// Process-wide knobs shared by every session's fade controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeTuning {
    /// Gap to the fade end below which the session is stopped. Polling never
    /// lands exactly on zero.
    pub epsilon_secs: f64,
    /// Whether a forced fade-out also latches and reports `FadingOut`.
    pub latch_forced: bool,
}

impl Default for FadeTuning {
    fn default() -> Self {
        Self {
            epsilon_secs: DEFAULT_FADE_OUT_EPSILON_SECS,
            latch_forced: false,
        }
    }
}

/// What a fade check asks the session to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FadeAction {
    /// First tick inside the fade-out window.
    EnterFadeOut,
    /// The position moved back out of the window (seek, or the fade was
    /// switched off) before the fade finished.
    LeaveFadeOut,
    /// Send `gain * volume` to the engine.
    SetGain(f64),
    /// The fade-out reached its end: stop playback.
    Complete,
}

#[derive(Debug, Default)]
pub struct FadeController {
    config: FadeConfig,
    tuning: FadeTuning,
    fading_out: bool,
    /// `fading_out` was set by entering the window, not by the caller.
    entered: bool,
    end_position: f64,
    /// The engine currently plays at a fade-scaled gain.
    scaled: bool,
}

impl FadeController {
    pub fn new(config: FadeConfig, tuning: FadeTuning) -> Self {
        Self {
            config,
            tuning,
            fading_out: false,
            entered: false,
            end_position: 0.0,
            scaled: false,
        }
    }

    pub fn config(&self) -> FadeConfig {
        self.config
    }

    pub fn fading_out(&self) -> bool {
        self.fading_out
    }

    /// Inside a fade-out this controller started. A session resuming in
    /// this condition is still fading out.
    pub fn in_fade_out(&self) -> bool {
        self.fading_out && self.entered
    }

    pub fn end_position(&self) -> f64 {
        self.end_position
    }

    pub fn is_scaled(&self) -> bool {
        self.scaled
    }

    /// The raw volume was sent to the engine again.
    pub fn clear_scaled(&mut self) {
        self.scaled = false;
    }

    pub fn set_fade_in(&mut self, v: bool) {
        self.config.fade_in = v;
    }

    pub fn set_fade_out(&mut self, v: bool) {
        self.config.fade_out = v;
    }

    pub fn set_window(&mut self, secs: f64) {
        self.config.window_secs = secs;
    }

    /// Manual override of the latch.
    pub fn set_fading_out(&mut self, v: bool) {
        self.fading_out = v;
        self.entered = false;
    }

    /// Requests (or cancels) an immediate fade-out. The fade end is fixed
    /// now, one window past the current position and never past the end.
    pub fn set_force_fade_out(&mut self, v: bool, at: PositionSnapshot) {
        self.config.force_fade_out = v;
        let mut end = at.position.max(0.0) + self.config.window_secs;
        if at.duration_known() {
            end = end.min(at.duration);
        }
        self.end_position = end;
    }

    /// Clears both the forced flag and the latch, as a stop does.
    pub fn reset_latches(&mut self) {
        self.config.force_fade_out = false;
        self.fading_out = false;
        self.entered = false;
    }

    /// One tick of the fade logic against the latest position.
    ///
    /// Fade-out (natural or forced) wins over fade-in when both apply.
    pub fn check(&mut self, at: PositionSnapshot) -> Vec<FadeAction> {
        let window = self.config.window_secs;
        let mut actions = Vec::new();
        if window.is_nan() || window <= 0.0 || !at.position_known() {
            return actions;
        }

        let natural =
            self.config.fade_out && at.duration_known() && at.remaining <= window;
        if natural && !self.fading_out {
            self.fading_out = true;
            self.entered = true;
            self.end_position = (at.position + window).min(at.duration);
            actions.push(FadeAction::EnterFadeOut);
            tracing::debug!(
                position = at.position,
                end_position = self.end_position,
                "entering fade-out"
            );
        }

        let forced_gap = self.end_position - at.position;
        let forced = self.config.force_fade_out && forced_gap <= window;
        if forced && self.tuning.latch_forced && !self.fading_out {
            self.fading_out = true;
            self.entered = true;
            actions.push(FadeAction::EnterFadeOut);
        }

        if natural || forced {
            let gap = match (natural, forced) {
                (true, true) => at.remaining.min(forced_gap),
                (true, false) => at.remaining,
                _ => forced_gap,
            };
            let remaining_spent = at.duration_known() && at.remaining < self.tuning.epsilon_secs;
            if gap < self.tuning.epsilon_secs || remaining_spent {
                tracing::debug!(gap, position = at.position, "fade-out reached its end");
                actions.push(FadeAction::Complete);
            } else {
                self.scaled = true;
                actions.push(FadeAction::SetGain(fade_factor(fade_out_ratio(gap, window))));
            }
            return actions;
        }

        if self.in_fade_out() {
            tracing::debug!(position = at.position, "left the fade-out window");
            self.fading_out = false;
            self.entered = false;
            actions.push(FadeAction::LeaveFadeOut);
        }

        if self.config.fade_in && at.position < window {
            self.scaled = true;
            actions.push(FadeAction::SetGain(fade_factor(fade_in_ratio(
                at.position,
                window,
            ))));
        } else if self.scaled && !self.fading_out {
            // Left a fade window between two polls: settle on full gain.
            self.scaled = false;
            actions.push(FadeAction::SetGain(1.0));
        }
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(position: f64, duration: f64) -> PositionSnapshot {
        PositionSnapshot {
            position,
            duration,
            remaining: duration - position,
        }
    }

    fn fade_out_only() -> FadeController {
        let mut c = FadeController::new(FadeConfig::with_window(5.0), FadeTuning::default());
        c.set_fade_out(true);
        c
    }

    #[test]
    fn disabled_fades_do_nothing() {
        let mut c = FadeController::new(FadeConfig::default(), FadeTuning::default());
        assert!(c.check(at(1.0, 100.0)).is_empty());
        assert!(c.check(at(98.0, 100.0)).is_empty());
    }

    #[test]
    fn fade_out_entry_fires_once() {
        let mut c = fade_out_only();
        assert!(c.check(at(94.0, 100.0)).is_empty());

        let first = c.check(at(97.0, 100.0));
        assert_eq!(first[0], FadeAction::EnterFadeOut);
        assert!(c.fading_out());
        assert_eq!(c.end_position(), 100.0);

        let entries = (0..5)
            .flat_map(|i| c.check(at(97.2 + f64::from(i) * 0.4, 100.0)))
            .filter(|a| *a == FadeAction::EnterFadeOut)
            .count();
        assert_eq!(entries, 0);
    }

    #[test]
    fn fade_out_gain_uses_remaining() {
        let mut c = fade_out_only();
        let actions = c.check(at(97.0, 100.0));
        let FadeAction::SetGain(g) = actions[1] else {
            panic!("expected gain, got {actions:?}");
        };
        assert!((g - fade_factor(0.6)).abs() < 1e-12);
        assert!(c.is_scaled());
    }

    #[test]
    fn fade_out_completes_near_the_end() {
        let mut c = fade_out_only();
        c.check(at(96.0, 100.0));
        assert_eq!(c.check(at(99.85, 100.0)), vec![FadeAction::Complete]);
    }

    #[test]
    fn fade_in_ramps_then_settles() {
        let mut c = FadeController::new(FadeConfig::with_window(4.0), FadeTuning::default());
        c.set_fade_in(true);
        assert_eq!(c.check(at(0.0, 60.0)), vec![FadeAction::SetGain(0.0)]);
        let actions = c.check(at(2.0, 60.0));
        let FadeAction::SetGain(g) = actions[0] else {
            panic!("expected gain");
        };
        assert!((g - 0.5_f64.sqrt()).abs() < 1e-12);
        assert_eq!(c.check(at(4.1, 60.0)), vec![FadeAction::SetGain(1.0)]);
        assert!(c.check(at(4.3, 60.0)).is_empty());
    }

    #[test]
    fn fade_out_wins_over_fade_in_on_short_media() {
        let mut c = FadeController::new(FadeConfig::with_window(5.0), FadeTuning::default());
        c.set_fade_in(true);
        c.set_fade_out(true);
        let actions = c.check(at(2.0, 6.0));
        assert_eq!(actions[0], FadeAction::EnterFadeOut);
        assert_eq!(actions.len(), 2);
        let FadeAction::SetGain(g) = actions[1] else {
            panic!("expected gain");
        };
        assert!((g - fade_factor(4.0 / 5.0)).abs() < 1e-12);
    }

    #[test]
    fn forced_fade_uses_fixed_end() {
        let mut c = FadeController::new(FadeConfig::with_window(5.0), FadeTuning::default());
        c.set_force_fade_out(true, at(20.0, 100.0));
        assert_eq!(c.end_position(), 25.0);

        let actions = c.check(at(22.0, 100.0));
        assert_eq!(actions.len(), 1);
        let FadeAction::SetGain(g) = actions[0] else {
            panic!("expected gain");
        };
        assert!((g - fade_factor(3.0 / 5.0)).abs() < 1e-12);
        assert!(!c.fading_out());

        assert_eq!(c.check(at(24.9, 100.0)), vec![FadeAction::Complete]);
    }

    #[test]
    fn forced_fade_end_is_clamped_to_duration() {
        let mut c = FadeController::new(FadeConfig::with_window(5.0), FadeTuning::default());
        c.set_force_fade_out(true, at(98.0, 100.0));
        assert_eq!(c.end_position(), 100.0);
    }

    #[test]
    fn forced_fade_latches_when_configured() {
        let tuning = FadeTuning {
            latch_forced: true,
            ..FadeTuning::default()
        };
        let mut c = FadeController::new(FadeConfig::with_window(5.0), tuning);
        c.set_force_fade_out(true, at(10.0, 100.0));
        assert_eq!(c.check(at(11.0, 100.0))[0], FadeAction::EnterFadeOut);
        assert!(!c.check(at(12.0, 100.0)).contains(&FadeAction::EnterFadeOut));
    }

    #[test]
    fn seeking_out_of_the_window_restores_gain() {
        let mut c = fade_out_only();
        c.check(at(97.0, 100.0));
        assert!(c.in_fade_out());

        assert_eq!(
            c.check(at(40.0, 100.0)),
            vec![FadeAction::LeaveFadeOut, FadeAction::SetGain(1.0)]
        );
        assert!(!c.fading_out());
        assert!(!c.is_scaled());
        assert!(c.check(at(41.0, 100.0)).is_empty());
    }

    #[test]
    fn disabling_fade_out_mid_fade_restores_gain() {
        let mut c = fade_out_only();
        c.check(at(97.0, 100.0));
        c.set_fade_out(false);
        assert_eq!(
            c.check(at(97.5, 100.0)),
            vec![FadeAction::LeaveFadeOut, FadeAction::SetGain(1.0)]
        );
    }

    #[test]
    fn manual_latch_is_not_undone_outside_the_window() {
        let mut c = fade_out_only();
        c.set_fading_out(true);
        assert!(c.check(at(10.0, 100.0)).is_empty());
        assert!(c.fading_out());
        assert!(!c.in_fade_out());
    }

    #[test]
    fn reset_clears_force_and_latch() {
        let mut c = fade_out_only();
        c.check(at(97.0, 100.0));
        c.set_force_fade_out(true, at(97.0, 100.0));
        c.reset_latches();
        assert!(!c.fading_out());
        assert!(!c.config().force_fade_out);
    }
}
