//! Cooperative per-frame tasks
//!
//! Every animation (intro, confetti) and the throttled progress scan runs as
//! a task advanced once per animation frame. Each carries a [`CancelToken`]
//! that is checked before the body runs, so a torn-down view never gets
//! another tick.

use std::cell::Cell;
use std::rc::Rc;

/// Result of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Wants another frame
    Running,
    /// Finished on its own
    Done,
    /// Stopped through its token
    Cancelled,
}

/// Shared cancel flag
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Rc<Cell<bool>>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

/// Body of a frame task
///
/// `C` is whatever the task draws on (usually a `Canvas2d`).
pub trait FrameTask<C: ?Sized> {
    /// Advance to `elapsed_ms` since the first tick
    fn tick(&mut self, ctx: &mut C, elapsed_ms: f64) -> TaskStatus;

    /// Release whatever the task drew
    fn on_cancel(&mut self, _ctx: &mut C) {}
}

/// A task plus its start time and cancel token
#[derive(Debug)]
pub struct Scheduled<T> {
    task: T,
    token: CancelToken,
    started_at: Option<f64>,
    status: TaskStatus,
}

impl<T> Scheduled<T> {
    pub fn new(task: T) -> Self {
        Self {
            task,
            token: CancelToken::new(),
            started_at: None,
            status: TaskStatus::Running,
        }
    }

    /// Handle that can stop the task from outside
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    pub fn task(&self) -> &T {
        &self.task
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == TaskStatus::Running && !self.token.is_cancelled()
    }

    /// Run one frame at wall time `now_ms`
    ///
    /// The first call fixes the start time. Once the task is done or
    /// cancelled further calls are no-ops.
    pub fn run_frame<C: ?Sized>(&mut self, ctx: &mut C, now_ms: f64) -> TaskStatus
    where
        T: FrameTask<C>,
    {
        if self.status != TaskStatus::Running {
            return self.status;
        }
        if self.token.is_cancelled() {
            self.task.on_cancel(ctx);
            self.status = TaskStatus::Cancelled;
            return self.status;
        }

        let start = *self.started_at.get_or_insert(now_ms);
        self.status = self.task.tick(ctx, (now_ms - start).max(0.0));
        self.status
    }

    /// Cancel now and let the task clean up immediately
    pub fn cancel<C: ?Sized>(&mut self, ctx: &mut C)
    where
        T: FrameTask<C>,
    {
        self.token.cancel();
        if self.status == TaskStatus::Running {
            self.task.on_cancel(ctx);
            self.status = TaskStatus::Cancelled;
        }
    }
}

/// Request for work on the next frame; a newer request supersedes it
#[derive(Debug, Default)]
pub struct FrameRequest {
    pending: Option<CancelToken>,
}

impl FrameRequest {
    /// Schedule for the next frame, cancelling any request still pending
    pub fn request(&mut self) -> CancelToken {
        if let Some(old) = self.pending.take() {
            old.cancel();
        }
        let token = CancelToken::new();
        self.pending = Some(token.clone());
        token
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|t| !t.is_cancelled())
    }

    /// Consume the pending request at frame time; true if it should run
    pub fn take(&mut self) -> bool {
        self.pending.take().is_some_and(|t| !t.is_cancelled())
    }

    pub fn cancel(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }
}
