//! Mark-range validation: the per-mode success predicates and their tuning.

use super::tape::{Color, FRAME_PIXELS, Tape};

/// Which win condition the current run plays under. Fixed for the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameMode {
    /// Coverage game: the marked range must be almost entirely target color.
    Standard,
    /// Isolation game: exactly one whole target segment, tight on both sides.
    Cat,
}

impl GameMode {
    pub fn from_ident(ident: &str) -> Option<GameMode> {
        match ident.to_ascii_lowercase().as_str() {
            "standard" => Some(GameMode::Standard),
            "cat" => Some(GameMode::Cat),
            _ => None,
        }
    }
}

/// Tunable rules of the game. These are policy, not invariants; tests and
/// future difficulty settings shrink or stretch them.
#[derive(Clone, Copy, Debug)]
pub struct Policy {
    /// Minimum fraction of the marked duration covered by the target color
    /// (standard mode). Tolerates edge rounding, not wrong-color content.
    pub standard_accuracy: f64,
    /// Non-target slack allowed on each side of the target segment in cat
    /// mode, measured independently per side, tape px.
    pub silence_allowance: f64,
    /// Float tolerance for containment checks, tape px.
    pub epsilon: f64,
    /// Accumulated sequence width that wins the run.
    pub win_width: f64,
    /// Press-to-release time under which a J/L release counts as a tap, ms.
    pub tap_threshold_ms: f64,
}

impl Default for Policy {
    fn default() -> Self {
        Policy {
            standard_accuracy: 0.95,
            silence_allowance: 10.0 * FRAME_PIXELS,
            epsilon: 0.1,
            win_width: 1800.0,
            tap_threshold_ms: 200.0,
        }
    }
}

/// Why an extraction attempt was refused. Any refusal ends the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reject {
    /// No target-colored content inside the marked range.
    MissingTarget,
    /// Cat mode wants exactly one target segment in range.
    MultipleTargets,
    /// The target segment sticks out past a mark edge.
    Truncated,
    LeadingSilence,
    TrailingSilence,
    /// Standard mode: too much off-target content in range.
    OffTarget,
}

impl Reject {
    /// Status-line copy for the shell.
    pub fn describe(self) -> &'static str {
        match self {
            Reject::MissingTarget => "no target in the marked range",
            Reject::MultipleTargets => "more than one target in the marked range",
            Reject::Truncated => "the target was cut off by a mark",
            Reject::LeadingSilence => "too much padding before the target",
            Reject::TrailingSilence => "too much padding after the target",
            Reject::OffTarget => "too much off-target content",
        }
    }
}

/// Test `[mark_in, mark_out)` against the active mode's success predicate.
pub fn validate(
    tape: &Tape,
    mark_in: f64,
    mark_out: f64,
    target: Color,
    mode: GameMode,
    policy: &Policy,
) -> Result<(), Reject> {
    debug_assert!(mark_out > mark_in);
    let overlapping = tape
        .segments()
        .iter()
        .filter(|s| s.end() > mark_in && s.x < mark_out);
    match mode {
        GameMode::Standard => {
            let mut on_target = 0.0;
            for seg in overlapping {
                if seg.color == target {
                    on_target += seg.end().min(mark_out) - seg.x.max(mark_in);
                }
            }
            if on_target / (mark_out - mark_in) >= policy.standard_accuracy {
                Ok(())
            } else {
                Err(Reject::OffTarget)
            }
        }
        GameMode::Cat => {
            let mut hit = None;
            for seg in overlapping {
                if seg.color == target {
                    if hit.is_some() {
                        return Err(Reject::MultipleTargets);
                    }
                    hit = Some(*seg);
                }
            }
            let seg = hit.ok_or(Reject::MissingTarget)?;
            let eps = policy.epsilon;
            if seg.x < mark_in - eps || seg.end() > mark_out + eps {
                return Err(Reject::Truncated);
            }
            // Each side's silence is measured on its own, not pooled.
            if (seg.x - mark_in).max(0.0) > policy.silence_allowance + eps {
                return Err(Reject::LeadingSilence);
            }
            if (mark_out - seg.end()).max(0.0) > policy.silence_allowance + eps {
                return Err(Reject::TrailingSilence);
            }
            Ok(())
        }
    }
}
