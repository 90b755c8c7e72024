//! Motion stages of the arm and their timing.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Current step of the arm's action.
///
/// `Idle`, `Completed` and `Fault` are rest states: [`Stage::next`] keeps
/// them unchanged and the controller leaves them only on an explicit call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Idle,
    PlaceStartBase,
    PlaceMoveShoulder,
    PlaceMoveElbow,
    GripStartBase,
    GripMoveShoulder,
    GripMoveElbow,
    ResetStartElbow,
    ResetMoveShoulder,
    ResetMoveBase,
    CompleteWait,
    Completed,
    /// A joint did not reach its target after the allowed retries.
    Fault,
}

/// Which joint a stage commands on entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JointKind {
    Base,
    Shoulder,
    Elbow,
}

impl fmt::Display for JointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JointKind::Base => "base",
            JointKind::Shoulder => "shoulder",
            JointKind::Elbow => "elbow",
        };
        f.write_str(name)
    }
}

impl Stage {
    pub fn is_rest(self) -> bool {
        matches!(self, Stage::Idle | Stage::Completed | Stage::Fault)
    }

    /// Successor once the stage's time gate has elapsed.
    ///
    /// The place and grip paths both end in the reset sequence, which moves
    /// the joints back in reverse order: elbow, shoulder, base.
    pub fn next(self) -> Stage {
        use Stage::*;

        match self {
            PlaceStartBase => PlaceMoveShoulder,
            PlaceMoveShoulder => PlaceMoveElbow,
            PlaceMoveElbow => ResetStartElbow,

            GripStartBase => GripMoveShoulder,
            GripMoveShoulder => GripMoveElbow,
            GripMoveElbow => ResetStartElbow,

            ResetStartElbow => ResetMoveShoulder,
            ResetMoveShoulder => ResetMoveBase,
            ResetMoveBase => CompleteWait,
            CompleteWait => Completed,

            Idle | Completed | Fault => self,
        }
    }

    /// The joint commanded when entering this stage, if any.
    pub fn joint(self) -> Option<JointKind> {
        use Stage::*;

        match self {
            PlaceStartBase | GripStartBase | ResetMoveBase => Some(JointKind::Base),
            PlaceMoveShoulder | GripMoveShoulder | ResetMoveShoulder => Some(JointKind::Shoulder),
            PlaceMoveElbow | GripMoveElbow | ResetStartElbow => Some(JointKind::Elbow),
            Idle | CompleteWait | Completed | Fault => None,
        }
    }

    /// Whether the stage moves toward the home pose rather than the task
    /// target.
    pub fn is_reset(self) -> bool {
        matches!(
            self,
            Stage::ResetStartElbow | Stage::ResetMoveShoulder | Stage::ResetMoveBase
        )
    }
}

/// Settle times of the motion sequence, in milliseconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionTiming {
    /// Minimum time in a stage before moving on.
    pub stage_settle_ms: u64,
    /// Longer settle for lifting the elbow at the start of a reset.
    pub reset_elbow_settle_ms: u64,
    /// Pause between pump and magnet when gripping or releasing.
    pub switch_settle_ms: u64,
    /// Worker polling interval while a sequence runs.
    pub poll_interval_ms: u64,
}

impl Default for MotionTiming {
    fn default() -> Self {
        Self {
            stage_settle_ms: 500,
            reset_elbow_settle_ms: 800,
            switch_settle_ms: 200,
            poll_interval_ms: 10,
        }
    }
}

impl MotionTiming {
    /// Time gate of `stage`; zero for rest states.
    pub fn gate(&self, stage: Stage) -> Duration {
        match stage {
            Stage::Idle | Stage::Completed | Stage::Fault => Duration::ZERO,
            Stage::ResetStartElbow => Duration::from_millis(self.reset_elbow_settle_ms),
            _ => Duration::from_millis(self.stage_settle_ms),
        }
    }

    pub fn switch_settle(&self) -> Duration {
        Duration::from_millis(self.switch_settle_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(mut stage: Stage) -> Vec<Stage> {
        let mut out = vec![stage];
        while !stage.is_rest() {
            stage = stage.next();
            out.push(stage);
        }
        out
    }

    #[test]
    fn place_path_funnels_into_reset() {
        use Stage::*;
        assert_eq!(
            walk(PlaceStartBase),
            vec![
                PlaceStartBase,
                PlaceMoveShoulder,
                PlaceMoveElbow,
                ResetStartElbow,
                ResetMoveShoulder,
                ResetMoveBase,
                CompleteWait,
                Completed
            ]
        );
    }

    #[test]
    fn grip_path_shares_the_reset_tail() {
        let grip = walk(Stage::GripStartBase);
        let place = walk(Stage::PlaceStartBase);
        assert_eq!(grip[3..], place[3..]);
    }

    #[test]
    fn reset_moves_joints_in_reverse_order() {
        let joints: Vec<_> = walk(Stage::ResetStartElbow)
            .into_iter()
            .filter_map(Stage::joint)
            .collect();
        assert_eq!(
            joints,
            vec![JointKind::Elbow, JointKind::Shoulder, JointKind::Base]
        );
    }

    #[test]
    fn rest_states_do_not_advance() {
        for s in [Stage::Idle, Stage::Completed, Stage::Fault] {
            assert_eq!(s.next(), s);
        }
    }

    #[test]
    fn reset_elbow_has_the_longer_gate() {
        let t = MotionTiming::default();
        assert_eq!(t.gate(Stage::ResetStartElbow), Duration::from_millis(800));
        assert_eq!(t.gate(Stage::PlaceMoveShoulder), Duration::from_millis(500));
        assert_eq!(t.gate(Stage::CompleteWait), Duration::from_millis(500));
        assert_eq!(t.gate(Stage::Idle), Duration::ZERO);
    }
}
