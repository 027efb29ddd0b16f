//! Contains the [`Scheduler`] type

// Copyright (c) 2025 Ferrous Systems
// SPDX-License-Identifier: GPL-3.0-or-later

use std::cell::RefCell;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use crate::{Error, KernelError, Priority, Task, TaskEntryFn};

/// Half the tick range; deadlines further away than this are in the past
const HALF_RANGE: u32 = u32::MAX / 2;

thread_local! {
    /// The kernel and task identity of the task running on this thread
    static CONTEXT: RefCell<Option<TaskContext>> = const { RefCell::new(None) };
}

/// Represents a Task
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TaskId(usize);

impl TaskId {
    /// Represents the Task ID we produce when not running inside a task
    const INVALID_ID: usize = usize::MAX;

    /// Is this the invalid Task ID?
    pub const fn is_invalid(self) -> bool {
        self.0 == Self::INVALID_ID
    }

    /// Create an invalid Task ID
    pub(crate) const fn invalid() -> TaskId {
        TaskId(Self::INVALID_ID)
    }

    /// Position of this task in the scheduler's task list
    pub const fn index(self) -> usize {
        self.0
    }
}

impl core::fmt::Display for TaskId {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_invalid() {
            write!(fmt, "T---")
        } else {
            write!(fmt, "T{:03}", self.0)
        }
    }
}

/// Settings for the kernel
#[derive(Clone, Debug)]
pub struct KernelConfig {
    /// Wall-clock time spent per idle tick
    ///
    /// Zero means idle time is skipped over instantly, which keeps runs
    /// deterministic.
    pub tick_period: Duration,
    /// Stop the scheduler once the tick counter reaches this value
    pub max_ticks: Option<u32>,
}

impl Default for KernelConfig {
    fn default() -> Self {
        KernelConfig {
            tick_period: Duration::ZERO,
            max_ticks: None,
        }
    }
}

/// Why the scheduler stopped
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// Someone asked it to stop
    Halted,
    /// The configured tick limit was reached
    TickLimit,
    /// Every task returned
    Finished,
    /// Tasks remain, but none of them can ever be woken
    Deadlock,
}

/// A task that ended with something other than a halt
#[derive(Debug)]
pub struct TaskFailure {
    pub task: &'static str,
    pub error: Error,
}

/// What happened during [`Scheduler::run`]
#[derive(Debug)]
pub struct RunReport {
    /// The tick count when the scheduler stopped
    pub ticks: u32,
    pub reason: StopReason,
    pub failures: Vec<TaskFailure>,
}

/// A pre-emptive, priority-based task scheduler
///
/// Each task gets its own OS thread, but only the thread holding the
/// (simulated) CPU makes progress. The CPU always goes to the highest
/// priority task that is ready to run, rotating round-robin between tasks of
/// equal priority.
///
/// Time is a tick counter which only moves when every task is waiting for
/// something. The scheduler then jumps to the next deadline (or, with a
/// non-zero tick period, walks there one paced tick at a time).
pub struct Scheduler {
    kernel: Arc<Kernel>,
    task_list: Vec<Task>,
}

impl Scheduler {
    /// Build the scheduler
    pub fn new(config: KernelConfig) -> Scheduler {
        Scheduler {
            kernel: Arc::new(Kernel::new(config)),
            task_list: Vec::new(),
        }
    }

    /// Add a task. It will start when [`Scheduler::run`] is called.
    pub fn spawn(&mut self, task: Task) -> TaskId {
        let task_id = TaskId(self.task_list.len());
        log::debug!(
            "Added task {} '{}' at {} priority",
            task_id,
            task.name(),
            task.priority()
        );
        self.task_list.push(task);
        task_id
    }

    /// Get a handle which can stop the scheduler from any thread
    pub fn halt_handle(&self) -> HaltHandle {
        HaltHandle(self.kernel.clone())
    }

    /// Run the scheduler until it stops, then collect the tasks
    pub fn run(self) -> Result<RunReport, Error> {
        let Scheduler { kernel, task_list } = self;

        {
            let mut state = kernel.lock_state();
            for task in task_list.iter() {
                state.tasks.push(TaskControl {
                    name: task.name(),
                    priority: task.priority(),
                    state: TaskState::Ready,
                });
            }
        }

        let mut handles = Vec::with_capacity(task_list.len());
        for (task_idx, task) in task_list.into_iter().enumerate() {
            let (name, _priority, entry_fn) = task.into_parts();
            let context = TaskContext {
                kernel: kernel.clone(),
                id: TaskId(task_idx),
            };
            let spawned = thread::Builder::new()
                .name(name.to_string())
                .spawn(move || task_main(context, entry_fn));
            match spawned {
                Ok(handle) => handles.push((name, handle)),
                Err(e) => {
                    // Unstarted tasks never get the CPU, so stop the ones we have
                    kernel.halt();
                    for (_name, handle) in handles {
                        let _ = handle.join();
                    }
                    return Err(Error::Io(e));
                }
            }
        }

        log::info!("Scheduler starting with {} tasks", handles.len());
        let reason = {
            let state = kernel.lock_state();
            let mut state = kernel.reschedule(state);
            loop {
                if let Some(reason) = state.stop {
                    break reason;
                }
                state = kernel
                    .cpu
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };

        let mut failures = Vec::new();
        for (name, handle) in handles {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(error)) if error.is_halt() => {}
                Ok(Err(error)) => {
                    log::warn!("Task '{}' failed: {}", name, error);
                    failures.push(TaskFailure { task: name, error });
                }
                Err(_) => {
                    log::warn!("Task '{}' panicked", name);
                    failures.push(TaskFailure {
                        task: name,
                        error: Error::Panicked(name),
                    });
                }
            }
        }

        let ticks = kernel.now();
        log::info!("Scheduler stopped at tick {}: {:?}", ticks, reason);
        Ok(RunReport {
            ticks,
            reason,
            failures,
        })
    }
}

/// Stops a running [`Scheduler`]
#[derive(Clone)]
pub struct HaltHandle(Arc<Kernel>);

impl HaltHandle {
    /// Ask the scheduler to stop. Tasks unwind at their next kernel call.
    pub fn halt(&self) {
        self.0.halt();
    }
}

/// Where a task is in its life
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum TaskState {
    /// Wants the CPU
    Ready,
    /// Sleeping until the given tick
    Delayed { until: u32 },
    /// Waiting on a kernel object, optionally with a deadline
    Blocked { until: Option<u32> },
    /// Returned from its entry function
    Finished,
}

/// The scheduler's view of one task
struct TaskControl {
    name: &'static str,
    priority: Priority,
    state: TaskState,
}

impl TaskControl {
    fn deadline(&self) -> Option<u32> {
        match self.state {
            TaskState::Delayed { until } => Some(until),
            TaskState::Blocked { until } => until,
            TaskState::Ready | TaskState::Finished => None,
        }
    }
}

/// Describes which task we picked
#[derive(Debug)]
enum TaskSelection {
    /// We picked a new task - do a task switch
    NewTask(TaskId),
    /// We like the current task - no switch required
    CurrentTask,
    /// Nothing can run until the given tick
    Idle { wake_at: u32 },
    /// Nothing can ever run again
    NoTasks,
}

struct KernelState {
    /// Current tick count
    ticks: u32,
    /// Which task holds the CPU
    current: Option<usize>,
    /// Which task held the CPU most recently, for round-robin
    last: Option<usize>,
    tasks: Vec<TaskControl>,
    /// Set once, when the scheduler stops
    stop: Option<StopReason>,
}

impl KernelState {
    /// Select the highest priority ready task, starting the round-robin
    /// search just after the task which ran last
    fn pick_next_task(&self) -> TaskSelection {
        log::trace!("> picking a task");
        let num_tasks = self.tasks.len();
        let start = self.last.map_or(0, |idx| idx + 1);
        let mut selected_next_task: Option<usize> = None;
        for offset in 0..num_tasks {
            let idx = (start + offset) % num_tasks;
            let task = &self.tasks[idx];
            if task.state != TaskState::Ready {
                continue;
            }
            match selected_next_task {
                Some(best) if self.tasks[best].priority >= task.priority => {}
                _ => selected_next_task = Some(idx),
            }
        }

        let task_sel = match selected_next_task {
            Some(idx) if Some(idx) == self.current => TaskSelection::CurrentTask,
            Some(idx) => TaskSelection::NewTask(TaskId(idx)),
            None => match self.earliest_deadline() {
                Some(wake_at) => TaskSelection::Idle { wake_at },
                None => TaskSelection::NoTasks,
            },
        };
        log::trace!("< picked {:?}", task_sel);
        task_sel
    }

    /// The nearest deadline of any sleeping or blocked task
    fn earliest_deadline(&self) -> Option<u32> {
        self.tasks
            .iter()
            .filter_map(TaskControl::deadline)
            .min_by_key(|deadline| deadline.wrapping_sub(self.ticks))
    }

    /// Make ready every task whose deadline has been reached
    fn wake_expired(&mut self) {
        let now = self.ticks;
        for task in self.tasks.iter_mut() {
            if let Some(deadline) = task.deadline() {
                if reached(now, deadline) {
                    task.state = TaskState::Ready;
                }
            }
        }
    }

    /// Is there a ready task that should take the CPU away from `me`?
    fn outranked(&self, me: usize) -> bool {
        let mine = self.tasks[me].priority;
        self.tasks
            .iter()
            .any(|task| task.state == TaskState::Ready && task.priority > mine)
    }
}

/// Has `now` reached `deadline`, allowing for the counter wrapping?
pub(crate) fn reached(now: u32, deadline: u32) -> bool {
    now.wrapping_sub(deadline) <= HALF_RANGE
}

/// The shared state behind a [`Scheduler`]
pub(crate) struct Kernel {
    state: Mutex<KernelState>,
    /// Signalled whenever the CPU changes hands or the scheduler stops
    cpu: Condvar,
    config: KernelConfig,
}

impl Kernel {
    fn new(config: KernelConfig) -> Kernel {
        Kernel {
            state: Mutex::new(KernelState {
                ticks: 0,
                current: None,
                last: None,
                tasks: Vec::new(),
                stop: None,
            }),
            cpu: Condvar::new(),
            config,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, KernelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get current tick count
    pub(crate) fn now(&self) -> u32 {
        self.lock_state().ticks
    }

    /// Get the static priority of a task
    pub(crate) fn priority(&self, task_id: TaskId) -> Priority {
        self.lock_state().tasks[task_id.0].priority
    }

    /// Put task `me` to sleep for at least `ticks` ticks
    pub(crate) fn delay(&self, me: TaskId, ticks: u32) -> Result<(), KernelError> {
        if ticks == 0 {
            return self.yield_now(me);
        }
        let until = self.now().wrapping_add(ticks);
        self.suspend(me, TaskState::Delayed { until })
    }

    /// Let any other ready task of equal or higher priority run
    pub(crate) fn yield_now(&self, me: TaskId) -> Result<(), KernelError> {
        self.suspend(me, TaskState::Ready)
    }

    /// Block task `me` until woken, or until the deadline passes
    pub(crate) fn block(&self, me: TaskId, until: Option<u32>) -> Result<(), KernelError> {
        self.suspend(me, TaskState::Blocked { until })
    }

    /// Make a blocked task ready again. It runs when the scheduler picks it.
    pub(crate) fn wake(&self, task_id: TaskId) {
        let mut state = self.lock_state();
        let task = &mut state.tasks[task_id.0];
        if let TaskState::Blocked { .. } = task.state {
            log::trace!("- waking {}", task_id);
            task.state = TaskState::Ready;
        }
    }

    /// Hand the CPU over if a higher priority task has become ready
    ///
    /// If the scheduler has stopped we just return; the caller will find
    /// out at its next blocking call.
    pub(crate) fn preempt(&self, me: TaskId) {
        let state = self.lock_state();
        if state.stop.is_some() || !state.outranked(me.0) {
            return;
        }
        log::trace!("- {} preempted", me);
        let state = self.reschedule(state);
        let _ = self.wait_for_cpu(state, me);
    }

    /// Stop the scheduler
    pub(crate) fn halt(&self) {
        let mut state = self.lock_state();
        if state.stop.is_none() {
            log::debug!("Halt requested at tick {}", state.ticks);
            state.stop = Some(StopReason::Halted);
        }
        state.current = None;
        self.cpu.notify_all();
    }

    /// Task `me` has returned from its entry function
    fn finish(&self, me: TaskId) {
        let mut state = self.lock_state();
        log::debug!("Task {} '{}' finished", me, state.tasks[me.0].name);
        state.tasks[me.0].state = TaskState::Finished;
        if state.current == Some(me.0) {
            let _state = self.reschedule(state);
        } else {
            self.cpu.notify_all();
        }
    }

    /// Move task `me` into `new_state` and wait until it gets the CPU back
    fn suspend(&self, me: TaskId, new_state: TaskState) -> Result<(), KernelError> {
        let mut state = self.lock_state();
        if state.stop.is_some() {
            return Err(KernelError::Halted);
        }
        state.tasks[me.0].state = new_state;
        let state = self.reschedule(state);
        self.wait_for_cpu(state, me)
    }

    /// Block this thread until task `me` holds the CPU
    fn wait_for_cpu(
        &self,
        mut state: MutexGuard<'_, KernelState>,
        me: TaskId,
    ) -> Result<(), KernelError> {
        loop {
            if state.stop.is_some() {
                return Err(KernelError::Halted);
            }
            if state.current == Some(me.0) {
                return Ok(());
            }
            state = self.cpu.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Decide who gets the CPU next, advancing time if nobody is ready
    fn reschedule<'a>(
        &'a self,
        mut state: MutexGuard<'a, KernelState>,
    ) -> MutexGuard<'a, KernelState> {
        loop {
            if state.stop.is_some() {
                state.current = None;
                self.cpu.notify_all();
                return state;
            }
            match state.pick_next_task() {
                TaskSelection::CurrentTask => {
                    return state;
                }
                TaskSelection::NewTask(task_id) => {
                    state.current = Some(task_id.0);
                    state.last = Some(task_id.0);
                    self.cpu.notify_all();
                    return state;
                }
                TaskSelection::Idle { wake_at } => {
                    state.current = None;
                    state = self.advance(state, wake_at);
                }
                TaskSelection::NoTasks => {
                    let all_finished = state
                        .tasks
                        .iter()
                        .all(|task| task.state == TaskState::Finished);
                    let reason = if all_finished {
                        StopReason::Finished
                    } else {
                        StopReason::Deadlock
                    };
                    log::debug!("Nothing left to run: {:?}", reason);
                    state.stop = Some(reason);
                }
            }
        }
    }

    /// Move the tick counter forward towards `wake_at`, waking tasks on the way
    fn advance<'a>(
        &'a self,
        mut state: MutexGuard<'a, KernelState>,
        wake_at: u32,
    ) -> MutexGuard<'a, KernelState> {
        let target = if self.config.tick_period.is_zero() {
            wake_at
        } else {
            // Sleep on the condvar so a halt can interrupt the tick
            let (guard, _timeout) = self
                .cpu
                .wait_timeout(state, self.config.tick_period)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
            if state.stop.is_some() {
                return state;
            }
            state.ticks.wrapping_add(1)
        };

        state.ticks = match self.config.max_ticks {
            Some(limit) if target.wrapping_sub(state.ticks) >= limit.wrapping_sub(state.ticks) => {
                log::debug!("Tick limit {} reached", limit);
                state.stop = Some(StopReason::TickLimit);
                limit
            }
            _ => target,
        };
        log::trace!("Tick {}", state.ticks);
        state.wake_expired();
        state
    }
}

/// Who is running on this thread
#[derive(Clone)]
pub(crate) struct TaskContext {
    pub(crate) kernel: Arc<Kernel>,
    pub(crate) id: TaskId,
}

/// Get the kernel and task ID for the calling thread, if it is a task
pub(crate) fn current() -> Option<TaskContext> {
    CONTEXT.with(|context| context.borrow().clone())
}

/// Marks the task finished when its thread exits, even by panicking
struct FinishGuard<'a> {
    kernel: &'a Kernel,
    id: TaskId,
}

impl Drop for FinishGuard<'_> {
    fn drop(&mut self) {
        self.kernel.finish(self.id);
    }
}

/// The body of every task thread
fn task_main(context: TaskContext, entry_fn: TaskEntryFn) -> Result<(), Error> {
    let kernel = context.kernel.clone();
    let id = context.id;
    CONTEXT.with(|slot| *slot.borrow_mut() = Some(context));
    let _finish = FinishGuard {
        kernel: &kernel,
        id,
    };
    kernel.wait_for_cpu(kernel.lock_state(), id)?;
    log::debug!("Task {} started at tick {}", id, kernel.now());
    entry_fn()
}


// End of File
