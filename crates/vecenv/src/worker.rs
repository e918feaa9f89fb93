//! Worker threads and the command protocol they speak.

use crate::env::{EnvFactory, GymEnv, Transition};
use crate::error::{VecEnvError, WorkerFailure};
use crossbeam::channel::{unbounded, Receiver, Sender};
use environment::EnvironmentError;
use messaging::Spaces;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info_span, warn};

#[derive(Debug)]
pub(crate) enum Command {
    Step(Vec<f32>),
    Reset,
    ResetTask,
    GetSpaces,
    /// Fire and forget; never answered.
    Render,
    Close,
}

#[derive(Debug)]
pub(crate) enum Reply {
    Step(Result<Transition, EnvironmentError>),
    Observation(Result<Vec<f32>, EnvironmentError>),
    Spaces(Result<Spaces, EnvironmentError>),
}

impl Reply {
    fn kind(&self) -> &'static str {
        match self {
            Reply::Step(_) => "step",
            Reply::Observation(_) => "observation",
            Reply::Spaces(_) => "spaces",
        }
    }
}

/// Executor side of one worker.
pub struct WorkerHandle {
    index: usize,
    commands: Sender<Command>,
    replies: Receiver<Reply>,
    thread: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    pub(crate) fn spawn(index: usize, factory: EnvFactory) -> Result<Self, VecEnvError> {
        let (commands, command_rx) = unbounded();
        let (reply_tx, replies) = unbounded();
        let thread = thread::Builder::new()
            .name(format!("vecenv-worker-{index}"))
            .spawn(move || run_worker(index, factory, &command_rx, &reply_tx))?;
        Ok(Self { index, commands, replies, thread: Some(thread) })
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Queue a command; `false` when the worker is gone.
    pub(crate) fn send(&self, command: Command) -> bool {
        self.commands.send(command).is_ok()
    }

    /// Block for the next reply. Returns immediately once the worker thread
    /// has exited.
    pub(crate) fn receive(&self) -> Result<Reply, WorkerFailure> {
        self.replies.recv().map_err(|_| WorkerFailure::Disconnected { worker: self.index })
    }

    pub(crate) fn receive_step(&self) -> Result<Transition, WorkerFailure> {
        match self.receive()? {
            Reply::Step(result) => result.map_err(|source| self.failed(source)),
            other => Err(self.unexpected("step", &other)),
        }
    }

    pub(crate) fn receive_observation(&self) -> Result<Vec<f32>, WorkerFailure> {
        match self.receive()? {
            Reply::Observation(result) => result.map_err(|source| self.failed(source)),
            other => Err(self.unexpected("observation", &other)),
        }
    }

    pub(crate) fn receive_spaces(&self) -> Result<Spaces, WorkerFailure> {
        match self.receive()? {
            Reply::Spaces(result) => result.map_err(|source| self.failed(source)),
            other => Err(self.unexpected("spaces", &other)),
        }
    }

    fn failed(&self, source: EnvironmentError) -> WorkerFailure {
        WorkerFailure::Environment { worker: self.index, source }
    }

    fn unexpected(&self, expected: &'static str, got: &Reply) -> WorkerFailure {
        WorkerFailure::UnexpectedReply { worker: self.index, expected, got: got.kind() }
    }

    /// Ask the worker to stop and wait for its thread. Idempotent.
    pub(crate) fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        let _ = self.commands.send(Command::Close);
        if thread.join().is_err() {
            warn!(worker = self.index, "worker thread panicked");
        }
    }
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("index", &self.index)
            .field("running", &self.thread.is_some())
            .finish()
    }
}

/// One command at a time until `Close` or until the executor hangs up.
fn run_worker(index: usize, factory: EnvFactory, commands: &Receiver<Command>, replies: &Sender<Reply>) {
    let span = info_span!("worker", index);
    let _entered = span.enter();

    let mut env = match factory() {
        Ok(env) => env,
        Err(e) => {
            error!(error = %e, "environment construction failed");
            return;
        }
    };
    debug!("worker started");

    while let Ok(command) = commands.recv() {
        let reply = match command {
            Command::Step(action) => Reply::Step(step_with_auto_reset(env.as_mut(), &action)),
            Command::Reset => Reply::Observation(env.reset()),
            Command::ResetTask => Reply::Observation(env.reset_task()),
            Command::GetSpaces => Reply::Spaces(env.spaces()),
            Command::Render => {
                env.render();
                continue;
            }
            Command::Close => break,
        };
        if replies.send(reply).is_err() {
            break;
        }
    }

    if let Err(e) = env.close() {
        warn!(error = %e, "closing environment failed");
    }
    debug!("worker stopped");
}

/// A finished episode is reset before the reply goes out; the reply then
/// carries the first observation of the new episode and the terminal one
/// moves into the info.
fn step_with_auto_reset(env: &mut dyn GymEnv, action: &[f32]) -> Result<Transition, EnvironmentError> {
    let mut transition = env.step(action)?;
    if transition.done {
        let terminal = std::mem::replace(&mut transition.observation, env.reset()?);
        transition.info.terminal_observation = Some(terminal);
    }
    Ok(transition)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OneStep {
        resets: u8,
    }

    impl GymEnv for OneStep {
        fn step(&mut self, action: &[f32]) -> Result<Transition, EnvironmentError> {
            Ok(Transition { observation: vec![action[0]], reward: 1.0, done: true, ..Transition::default() })
        }

        fn reset(&mut self) -> Result<Vec<f32>, EnvironmentError> {
            self.resets += 1;
            Ok(vec![-f32::from(self.resets)])
        }

        fn spaces(&mut self) -> Result<Spaces, EnvironmentError> {
            Ok(Spaces::default())
        }
    }

    #[test]
    fn terminal_step_returns_the_reset_observation() {
        let mut env = OneStep { resets: 0 };
        let first = step_with_auto_reset(&mut env, &[7.0]).unwrap();
        assert_eq!(first.observation, vec![-1.0]);
        assert_eq!(first.info.terminal_observation, Some(vec![7.0]));
        assert!(first.done);

        let second = step_with_auto_reset(&mut env, &[8.0]).unwrap();
        assert_eq!(second.observation, vec![-2.0]);
        assert_eq!(second.info.terminal_observation, Some(vec![8.0]));
    }

    #[test]
    fn worker_answers_in_command_order_and_stops_on_close() {
        let factory: EnvFactory = Box::new(|| Ok(Box::new(OneStep { resets: 0 }) as Box<dyn GymEnv>));
        let mut handle = WorkerHandle::spawn(3, factory).unwrap();
        assert!(handle.send(Command::Reset));
        assert!(handle.send(Command::Render));
        assert!(handle.send(Command::Step(vec![1.0])));
        assert_eq!(handle.receive_observation().unwrap(), vec![-1.0]);
        assert_eq!(handle.receive_step().unwrap().observation, vec![-2.0]);

        handle.shutdown();
        handle.shutdown();
        assert!(matches!(handle.receive(), Err(WorkerFailure::Disconnected { worker: 3 })));
    }

    #[test]
    fn failed_construction_shows_up_as_disconnect() {
        let factory: EnvFactory = Box::new(|| Err(EnvironmentError::NoEnvironment));
        let handle = WorkerHandle::spawn(0, factory).unwrap();
        handle.send(Command::GetSpaces);
        assert!(matches!(handle.receive_spaces(), Err(WorkerFailure::Disconnected { worker: 0 })));
    }
}
