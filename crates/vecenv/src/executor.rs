//! # Vectorized Executor
//!
//! Runs one [`crate::GymEnv`] per worker thread and steps them together. Results
//! come back in worker order whatever order the workers finish in: every
//! reply of a round is collected before the batch is assembled, and a dead
//! worker only costs its own slot.
//!
//! ```text
//! step_async(actions) ──► Step(a_i) to every worker      pending = true
//! step_wait()         ◄── N replies, slot i = worker i   pending = false
//!                         every render_interval rounds: Render to every worker
//! ```

use crate::config::ExecutorConfig;
use crate::env::{EnvFactory, StepInfo, Transition};
use crate::error::{VecEnvError, WorkerFailure};
use crate::worker::{Command, WorkerHandle};
use messaging::Spaces;
use tracing::{debug, info, warn};

/// One step round: slot `i` belongs to worker `i`.
#[derive(Debug)]
pub struct StepBatch {
    pub slots: Vec<Result<Transition, WorkerFailure>>,
}

/// A fully successful [`StepBatch`] as parallel arrays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepArrays {
    pub observations: Vec<Vec<f32>>,
    pub rewards: Vec<f32>,
    pub dones: Vec<bool>,
    pub infos: Vec<StepInfo>,
}

impl StepBatch {
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[must_use]
    pub fn observations(&self) -> Vec<Option<&[f32]>> {
        self.slots.iter().map(|slot| slot.as_ref().ok().map(|t| t.observation.as_slice())).collect()
    }

    #[must_use]
    pub fn rewards(&self) -> Vec<Option<f32>> {
        self.slots.iter().map(|slot| slot.as_ref().ok().map(|t| t.reward)).collect()
    }

    #[must_use]
    pub fn dones(&self) -> Vec<Option<bool>> {
        self.slots.iter().map(|slot| slot.as_ref().ok().map(|t| t.done)).collect()
    }

    /// The failure with the lowest worker index.
    #[must_use]
    pub fn first_failure(&self) -> Option<&WorkerFailure> {
        self.slots.iter().find_map(|slot| slot.as_ref().err())
    }

    /// # Errors
    ///
    /// The first failed slot, as [`VecEnvError::Worker`].
    pub fn into_arrays(self) -> Result<StepArrays, VecEnvError> {
        let mut arrays = StepArrays::default();
        for slot in self.slots {
            let transition = slot?;
            arrays.observations.push(transition.observation);
            arrays.rewards.push(transition.reward);
            arrays.dones.push(transition.done);
            arrays.infos.push(transition.info);
        }
        Ok(arrays)
    }
}

pub struct VectorizedExecutor {
    workers: Vec<WorkerHandle>,
    /// Per worker: did the pending `Step` reach it.
    in_flight: Vec<bool>,
    pending: bool,
    closed: bool,
    spaces: Spaces,
    render_interval: u32,
    rounds_since_render: u32,
    renders_issued: u64,
}

impl VectorizedExecutor {
    /// Spawn one worker per factory and read the spaces from the first.
    ///
    /// # Errors
    ///
    /// - [`VecEnvError::InvalidConfig`] / [`VecEnvError::NoWorkers`] for bad
    ///   arguments.
    /// - [`VecEnvError::Spawn`] when a thread cannot be started.
    /// - [`VecEnvError::Worker`] when the first worker cannot report its
    ///   spaces. Already spawned workers are shut down in every error case.
    pub fn new(factories: Vec<EnvFactory>, config: ExecutorConfig) -> Result<Self, VecEnvError> {
        config.validate()?;
        if factories.is_empty() {
            return Err(VecEnvError::NoWorkers);
        }
        let count = factories.len();
        let mut executor = Self {
            workers: Vec::with_capacity(count),
            in_flight: vec![false; count],
            pending: false,
            closed: false,
            spaces: Spaces::default(),
            render_interval: config.render_interval,
            rounds_since_render: 0,
            renders_issued: 0,
        };
        for (index, factory) in factories.into_iter().enumerate() {
            let handle = WorkerHandle::spawn(index, factory)?;
            executor.workers.push(handle);
        }
        let first = &executor.workers[0];
        if !first.send(Command::GetSpaces) {
            return Err(WorkerFailure::Disconnected { worker: 0 }.into());
        }
        executor.spaces = first.receive_spaces()?;
        info!(workers = count, render_interval = executor.render_interval, "executor started");
        Ok(executor)
    }

    #[must_use]
    pub fn num_envs(&self) -> usize {
        self.workers.len()
    }

    /// Spaces reported by worker 0 at start-up.
    #[must_use]
    pub fn spaces(&self) -> &Spaces {
        &self.spaces
    }

    /// Render broadcasts issued so far, scheduled or manual.
    #[must_use]
    pub fn renders_issued(&self) -> u64 {
        self.renders_issued
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> Result<(), VecEnvError> {
        if self.closed {
            return Err(VecEnvError::Closed);
        }
        Ok(())
    }

    /// Hand action `i` to worker `i` and return without waiting.
    ///
    /// # Errors
    ///
    /// [`VecEnvError::ProtocolSequence`] while a step is already pending,
    /// [`VecEnvError::ActionCount`] unless there is one action per worker.
    pub fn step_async(&mut self, actions: Vec<Vec<f32>>) -> Result<(), VecEnvError> {
        self.ensure_open()?;
        if self.pending {
            return Err(VecEnvError::ProtocolSequence("step_async called while a step is pending"));
        }
        if actions.len() != self.workers.len() {
            return Err(VecEnvError::ActionCount { expected: self.workers.len(), actual: actions.len() });
        }
        for ((worker, action), sent) in self.workers.iter().zip(actions).zip(self.in_flight.iter_mut()) {
            *sent = worker.send(Command::Step(action));
            if !*sent {
                warn!(worker = worker.index(), "worker is gone; step not delivered");
            }
        }
        self.pending = true;
        Ok(())
    }

    /// Collect the replies to the pending step, one slot per worker.
    ///
    /// Waits for every worker before returning. A worker that died shows up
    /// as [`WorkerFailure::Disconnected`] in its slot.
    ///
    /// # Errors
    ///
    /// [`VecEnvError::ProtocolSequence`] without a pending `step_async`.
    pub fn step_wait(&mut self) -> Result<StepBatch, VecEnvError> {
        self.ensure_open()?;
        if !self.pending {
            return Err(VecEnvError::ProtocolSequence("step_wait called without a pending step_async"));
        }
        let batch = self.collect_step();
        self.rounds_since_render += 1;
        if self.rounds_since_render >= self.render_interval {
            self.rounds_since_render = 0;
            self.broadcast_render();
        }
        Ok(batch)
    }

    /// `step_async` followed by `step_wait`.
    ///
    /// # Errors
    ///
    /// See [`VectorizedExecutor::step_async`] and
    /// [`VectorizedExecutor::step_wait`].
    pub fn step(&mut self, actions: Vec<Vec<f32>>) -> Result<StepBatch, VecEnvError> {
        self.step_async(actions)?;
        self.step_wait()
    }

    fn collect_step(&mut self) -> StepBatch {
        let slots = self
            .workers
            .iter()
            .zip(&self.in_flight)
            .map(|(worker, &sent)| {
                if sent {
                    worker.receive_step()
                } else {
                    Err(WorkerFailure::Disconnected { worker: worker.index() })
                }
            })
            .collect();
        self.pending = false;
        StepBatch { slots }
    }

    /// Reset every worker. A pending step is drained and discarded first.
    ///
    /// # Errors
    ///
    /// The first worker failure, after every worker has answered.
    pub fn reset(&mut self) -> Result<Vec<Vec<f32>>, VecEnvError> {
        self.reset_with(|| Command::Reset)
    }

    /// Reset every worker into its configured task.
    ///
    /// # Errors
    ///
    /// The first worker failure, after every worker has answered.
    pub fn reset_task(&mut self) -> Result<Vec<Vec<f32>>, VecEnvError> {
        self.reset_with(|| Command::ResetTask)
    }

    fn reset_with(&mut self, command: impl Fn() -> Command) -> Result<Vec<Vec<f32>>, VecEnvError> {
        self.ensure_open()?;
        if self.pending {
            debug!("discarding the pending step before reset");
            self.collect_step();
        }
        let sent: Vec<bool> = self.workers.iter().map(|worker| worker.send(command())).collect();
        let slots: Vec<Result<Vec<f32>, WorkerFailure>> = self
            .workers
            .iter()
            .zip(sent)
            .map(|(worker, sent)| {
                if sent {
                    worker.receive_observation()
                } else {
                    Err(WorkerFailure::Disconnected { worker: worker.index() })
                }
            })
            .collect();
        slots.into_iter().collect::<Result<Vec<_>, _>>().map_err(VecEnvError::from)
    }

    /// Ask every worker to render now. Never waits for the workers.
    ///
    /// # Errors
    ///
    /// [`VecEnvError::Closed`] after `close`.
    pub fn render(&mut self) -> Result<(), VecEnvError> {
        self.ensure_open()?;
        self.broadcast_render();
        Ok(())
    }

    fn broadcast_render(&mut self) {
        for worker in &self.workers {
            if !worker.send(Command::Render) {
                debug!(worker = worker.index(), "render not delivered");
            }
        }
        self.renders_issued += 1;
    }

    /// Stop every worker and wait for its thread. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        if self.pending {
            self.collect_step();
        }
        for worker in &mut self.workers {
            worker.shutdown();
        }
        self.closed = true;
        info!(workers = self.workers.len(), "executor closed");
    }
}

impl Drop for VectorizedExecutor {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for VectorizedExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorizedExecutor")
            .field("workers", &self.workers)
            .field("pending", &self.pending)
            .field("closed", &self.closed)
            .field("render_interval", &self.render_interval)
            .field("renders_issued", &self.renders_issued)
            .finish_non_exhaustive()
    }
}
