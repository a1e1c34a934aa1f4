use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{info, warn};

use crate::error::MillingError;
use crate::math::Point3;

use super::{MillingCommand, Milling};

/// Why an animation stopped early.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationFailure {
    pub message: String,
    /// `N` number of the command whose move was rejected.
    pub command_number: u32,
    pub error: MillingError,
}

/// State after an animation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationState {
    /// Commands remain.
    Running,
    /// Every command was executed.
    Finished,
    /// A move was rejected; see [`PathAnimator::failure`].
    Halted,
}

/// Feeds parsed commands to a [`Milling`] simulator.
///
/// After a rejected move the animator stays halted until
/// [`PathAnimator::restart`].
#[derive(Debug, Clone)]
pub struct PathAnimator {
    commands: Vec<MillingCommand>,
    start: Point3,
    position: Point3,
    next: usize,
    failure: Option<AnimationFailure>,
}

impl PathAnimator {
    /// An animator that starts at `start` and visits `commands` in order.
    #[must_use]
    pub fn new(commands: Vec<MillingCommand>, start: Point3) -> Self {
        Self {
            commands,
            start,
            position: start,
            next: 0,
            failure: None,
        }
    }

    #[must_use]
    pub fn commands(&self) -> &[MillingCommand] {
        &self.commands
    }

    /// Current cutter position.
    #[must_use]
    pub fn position(&self) -> Point3 {
        self.position
    }

    /// Index of the next command to execute.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.next
    }

    #[must_use]
    pub fn failure(&self) -> Option<&AnimationFailure> {
        self.failure.as_ref()
    }

    #[must_use]
    pub fn state(&self) -> AnimationState {
        if self.failure.is_some() {
            AnimationState::Halted
        } else if self.next >= self.commands.len() {
            AnimationState::Finished
        } else {
            AnimationState::Running
        }
    }

    /// Rewinds to the first command and clears any failure. The simulator's
    /// material is left alone.
    pub fn restart(&mut self) {
        self.position = self.start;
        self.next = 0;
        self.failure = None;
    }

    fn mill_to(&mut self, milling: &mut Milling, target: Point3, command_number: u32) -> bool {
        match milling.mill(&self.position, &target) {
            Ok(()) => {
                self.position = target;
                true
            }
            Err(error) => {
                warn!(command_number, %error, "animation halted");
                self.failure = Some(AnimationFailure {
                    message: error.to_string(),
                    command_number,
                    error,
                });
                false
            }
        }
    }

    /// Advances the cutter by at most `distance` along the path.
    ///
    /// A command longer than the remaining budget is split, and the rest is
    /// executed by later calls.
    pub fn step(&mut self, milling: &mut Milling, distance: f64) -> AnimationState {
        let mut budget = distance;
        while self.state() == AnimationState::Running && budget > 0.0 {
            let command = &self.commands[self.next];
            let (target, number) = (command.coordinates, command.command_number);
            let remaining = (target - self.position).norm();
            if remaining <= budget {
                if !self.mill_to(milling, target, number) {
                    break;
                }
                budget -= remaining;
                self.next += 1;
            } else {
                let partial = self.position + (target - self.position) * (budget / remaining);
                self.mill_to(milling, partial, number);
                break;
            }
        }
        self.state()
    }

    /// Executes all remaining commands.
    ///
    /// # Errors
    ///
    /// Returns the failure of the first rejected move.
    pub fn complete(&mut self, milling: &mut Milling) -> Result<(), AnimationFailure> {
        self.run(milling, None)
    }

    fn run(&mut self, milling: &mut Milling, cancel: Option<&AtomicBool>) -> Result<(), AnimationFailure> {
        while self.state() == AnimationState::Running {
            if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
                info!(cursor = self.next, "animation cancelled");
                return Ok(());
            }
            let command = &self.commands[self.next];
            let (target, number) = (command.coordinates, command.command_number);
            if !self.mill_to(milling, target, number) {
                break;
            }
            self.next += 1;
        }
        match &self.failure {
            Some(f) => Err(f.clone()),
            None => Ok(()),
        }
    }

    /// Runs the remaining commands on a worker thread.
    ///
    /// The simulator moves into the task, so nothing else can touch its
    /// height field until [`AnimationTask::join`] hands it back.
    #[must_use]
    pub fn spawn_complete(mut self, mut milling: Milling) -> AnimationTask {
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);
        let handle = thread::spawn(move || {
            let result = self.run(&mut milling, Some(&*flag));
            AnimationOutcome {
                cancelled: flag.load(Ordering::Relaxed) && self.state() == AnimationState::Running,
                animator: self,
                milling,
                result,
            }
        });
        AnimationTask { handle, cancel }
    }
}

/// Everything a background completion hands back.
#[derive(Debug)]
pub struct AnimationOutcome {
    pub animator: PathAnimator,
    pub milling: Milling,
    pub result: Result<(), AnimationFailure>,
    /// The task stopped on request before running out of commands.
    pub cancelled: bool,
}

/// Handle to a background completion started by
/// [`PathAnimator::spawn_complete`].
#[derive(Debug)]
pub struct AnimationTask {
    handle: JoinHandle<AnimationOutcome>,
    cancel: Arc<AtomicBool>,
}

impl AnimationTask {
    /// Asks the task to stop before its next move.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the task and takes back the simulator.
    ///
    /// # Errors
    ///
    /// Returns the panic payload if the worker panicked.
    pub fn join(self) -> thread::Result<AnimationOutcome> {
        self.handle.join()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::milling::{parse_program, Cutter, CutterKind, MillingParams, Stock};

    fn milling() -> Milling {
        let stock = Stock {
            size_x: 100.0,
            size_y: 100.0,
            height: 50.0,
            base_height: 10.0,
            ..Stock::default()
        };
        let params = MillingParams {
            resolution: (100, 100),
            ..MillingParams::default()
        };
        Milling::new(stock, Cutter::new(CutterKind::Spherical, 4.0), params)
    }

    fn program() -> Vec<MillingCommand> {
        let text = "N1 G00X-30.000Y00.000Z60.000\nN2 G01Z45.000\nN3 G01X30.000\nN4 G00Z60.000";
        parse_program(text, Point3::new(0.0, 0.0, 60.0)).unwrap()
    }

    #[test]
    fn stepping_matches_completion() {
        let mut stepped = milling();
        let mut animator = PathAnimator::new(program(), Point3::new(0.0, 0.0, 60.0));
        let mut guard = 0;
        while animator.step(&mut stepped, 7.0) == AnimationState::Running {
            guard += 1;
            assert!(guard < 1000);
        }
        assert_eq!(animator.state(), AnimationState::Finished);

        let mut whole = milling();
        let mut other = PathAnimator::new(program(), Point3::new(0.0, 0.0, 60.0));
        other.complete(&mut whole).unwrap();
        let a = stepped.field().stats().removed_volume;
        let b = whole.field().stats().removed_volume;
        assert!((a - b).abs() < 1e-6 * b.max(1.0));
    }

    #[test]
    fn failure_halts_until_restart() {
        let text = "N1 G01X0.000Y0.000Z45.000\nN2 G01Z5.000\nN3 G01Z60.000";
        let cmds = parse_program(text, Point3::new(0.0, 0.0, 60.0)).unwrap();
        let mut m = milling();
        let mut animator = PathAnimator::new(cmds, Point3::new(0.0, 0.0, 60.0));
        let failure = animator.complete(&mut m).unwrap_err();
        assert_eq!(failure.command_number, 2);
        assert!(matches!(failure.error, MillingError::BelowBase { .. }));
        assert_eq!(animator.step(&mut m, 100.0), AnimationState::Halted);
        assert_eq!(animator.cursor(), 1);
        animator.restart();
        assert_eq!(animator.state(), AnimationState::Running);
    }

    #[test]
    fn background_completion_returns_simulator() {
        let animator = PathAnimator::new(program(), Point3::new(0.0, 0.0, 60.0));
        let task = animator.spawn_complete(milling());
        let outcome = task.join().unwrap();
        assert!(outcome.result.is_ok());
        assert!(!outcome.cancelled);
        assert_eq!(outcome.animator.state(), AnimationState::Finished);
        assert!(outcome.milling.field().stats().removed_volume > 0.0);
    }

    #[test]
    fn cancelled_task_stops_early() {
        let animator = PathAnimator::new(program(), Point3::new(0.0, 0.0, 60.0));
        let task = animator.spawn_complete(milling());
        task.cancel();
        let outcome = task.join().unwrap();
        assert!(outcome.result.is_ok());
        // Either the flag was seen before the last move or the run had
        // already finished.
        assert!(outcome.cancelled || outcome.animator.state() == AnimationState::Finished);
    }
}
