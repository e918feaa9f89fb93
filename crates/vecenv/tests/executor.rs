use connection::ConnectionConfig;
use environment::{EnvironmentError, EnvironmentSession, LoopbackConnector, RollingSphere};
use messaging::Spaces;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use vecenv::{
    EnvFactory, ExecutorConfig, GymEnv, SessionEnv, Transition, VecEnvError, VectorizedExecutor, WorkerFailure,
};

/// Echoes its worker id and the action back, after an optional delay.
struct Echo {
    id: f32,
    delay: Duration,
    episode_len: u32,
    t: u32,
    resets: u32,
    renders: Arc<AtomicUsize>,
}

impl GymEnv for Echo {
    fn step(&mut self, action: &[f32]) -> Result<Transition, EnvironmentError> {
        assert!(action[0] >= 0.0, "negative action kills the worker");
        thread::sleep(self.delay);
        self.t += 1;
        Ok(Transition {
            observation: vec![self.id, action[0]],
            reward: action[0],
            done: self.t >= self.episode_len,
            ..Transition::default()
        })
    }

    fn reset(&mut self) -> Result<Vec<f32>, EnvironmentError> {
        self.t = 0;
        self.resets += 1;
        Ok(vec![self.id, -(self.resets as f32)])
    }

    fn spaces(&mut self) -> Result<Spaces, EnvironmentError> {
        Ok(Spaces::default())
    }

    fn render(&mut self) {
        self.renders.fetch_add(1, Ordering::SeqCst);
    }
}

struct Fleet {
    delays: Vec<Duration>,
    episode_len: u32,
    renders: Arc<AtomicUsize>,
}

impl Fleet {
    fn new(count: usize) -> Self {
        Self { delays: vec![Duration::ZERO; count], episode_len: u32::MAX, renders: Arc::new(AtomicUsize::new(0)) }
    }

    fn factories(&self) -> Vec<EnvFactory> {
        self.delays
            .iter()
            .enumerate()
            .map(|(id, &delay)| {
                let renders = Arc::clone(&self.renders);
                let episode_len = self.episode_len;
                let factory: EnvFactory = Box::new(move || {
                    let id = id as f32;
                    Ok(Box::new(Echo { id, delay, episode_len, t: 0, resets: 0, renders }) as Box<dyn GymEnv>)
                });
                factory
            })
            .collect()
    }

    fn executor(&self, render_interval: u32) -> VectorizedExecutor {
        VectorizedExecutor::new(self.factories(), ExecutorConfig::new(render_interval).unwrap()).unwrap()
    }
}

fn actions(values: &[f32]) -> Vec<Vec<f32>> {
    values.iter().map(|&v| vec![v]).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn results_follow_action_order_under_latency(
        delays in prop::collection::vec(0u64..8, 1..6),
        rounds in 1usize..4,
    ) {
        let mut fleet = Fleet::new(delays.len());
        fleet.delays = delays.iter().map(|&ms| Duration::from_millis(ms)).collect();
        let mut executor = fleet.executor(100);

        for round in 0..rounds {
            let values: Vec<f32> = (0..delays.len()).map(|i| (i * 10 + round) as f32).collect();
            executor.step_async(actions(&values)).unwrap();
            let arrays = executor.step_wait().unwrap().into_arrays().unwrap();
            for (i, observation) in arrays.observations.iter().enumerate() {
                let id = i as f32;
                prop_assert_eq!(observation, &vec![id, values[i]]);
            }
            prop_assert_eq!(arrays.rewards, values);
        }
        executor.close();
    }
}

#[test]
fn second_step_wait_is_a_sequence_error() {
    let fleet = Fleet::new(2);
    let mut executor = fleet.executor(100);
    executor.step_async(actions(&[1.0, 2.0])).unwrap();
    executor.step_wait().unwrap();

    let err = executor.step_wait().unwrap_err();
    assert!(matches!(err, VecEnvError::ProtocolSequence(_)), "got {err:?}");
    assert!(!executor.is_pending());

    let batch = executor.step(actions(&[3.0, 4.0])).unwrap();
    assert_eq!(batch.rewards(), vec![Some(3.0), Some(4.0)]);
}

#[test]
fn second_step_async_is_a_sequence_error() {
    let fleet = Fleet::new(2);
    let mut executor = fleet.executor(100);
    executor.step_async(actions(&[1.0, 2.0])).unwrap();
    let err = executor.step_async(actions(&[5.0, 6.0])).unwrap_err();
    assert!(matches!(err, VecEnvError::ProtocolSequence(_)), "got {err:?}");

    let batch = executor.step_wait().unwrap();
    assert_eq!(batch.rewards(), vec![Some(1.0), Some(2.0)]);
}

#[test]
fn action_count_must_match_workers() {
    let fleet = Fleet::new(3);
    let mut executor = fleet.executor(100);
    let err = executor.step_async(actions(&[1.0])).unwrap_err();
    assert!(matches!(err, VecEnvError::ActionCount { expected: 3, actual: 1 }), "got {err:?}");
    assert!(!executor.is_pending());
}

#[test]
fn terminal_steps_return_reset_observations() {
    let mut fleet = Fleet::new(2);
    fleet.episode_len = 1;
    let mut executor = fleet.executor(100);
    assert_eq!(executor.reset().unwrap(), vec![vec![0.0, -1.0], vec![1.0, -1.0]]);

    let first = executor.step(actions(&[7.0, 8.0])).unwrap().into_arrays().unwrap();
    assert_eq!(first.dones, vec![true, true]);
    assert_eq!(first.observations, vec![vec![0.0, -2.0], vec![1.0, -2.0]]);
    assert_eq!(first.infos[0].terminal_observation, Some(vec![0.0, 7.0]));

    let second = executor.step(actions(&[9.0, 9.0])).unwrap().into_arrays().unwrap();
    assert_eq!(second.observations, vec![vec![0.0, -3.0], vec![1.0, -3.0]]);
    assert_eq!(second.infos[1].terminal_observation, Some(vec![1.0, 9.0]));
}

#[test]
fn render_fires_every_interval_rounds() {
    let fleet = Fleet::new(3);
    let mut executor = fleet.executor(5);
    for _ in 0..12 {
        executor.step(actions(&[0.0, 0.0, 0.0])).unwrap();
    }
    assert_eq!(executor.renders_issued(), 2);

    executor.close();
    assert_eq!(fleet.renders.load(Ordering::SeqCst), 6);
}

#[test]
fn reset_drains_a_pending_step() {
    let fleet = Fleet::new(2);
    let mut executor = fleet.executor(100);
    executor.reset().unwrap();
    executor.step_async(actions(&[1.0, 1.0])).unwrap();

    let observations = executor.reset_task().unwrap();
    assert_eq!(observations, vec![vec![0.0, -2.0], vec![1.0, -2.0]]);
    assert!(!executor.is_pending());
    assert!(matches!(executor.step_wait(), Err(VecEnvError::ProtocolSequence(_))));
}

#[test]
fn dead_worker_fails_only_its_slot() {
    let fleet = Fleet::new(3);
    let mut executor = fleet.executor(100);

    let batch = executor.step(actions(&[1.0, -1.0, 3.0])).unwrap();
    assert_eq!(batch.rewards(), vec![Some(1.0), None, Some(3.0)]);
    assert_eq!(batch.first_failure().map(WorkerFailure::worker), Some(1));
    let err = batch.into_arrays().unwrap_err();
    assert!(matches!(err, VecEnvError::Worker(WorkerFailure::Disconnected { worker: 1 })), "got {err:?}");

    let again = executor.step(actions(&[1.0, 2.0, 3.0])).unwrap();
    assert!(matches!(again.slots[1], Err(WorkerFailure::Disconnected { worker: 1 })));
    assert!(again.slots[0].is_ok() && again.slots[2].is_ok());

    assert!(matches!(executor.reset(), Err(VecEnvError::Worker(WorkerFailure::Disconnected { worker: 1 }))));
    executor.close();
}

#[test]
fn close_is_idempotent_and_final() {
    let fleet = Fleet::new(2);
    let mut executor = fleet.executor(100);
    executor.close();
    executor.close();
    assert!(executor.is_closed());
    assert!(matches!(executor.step(actions(&[0.0, 0.0])), Err(VecEnvError::Closed)));
    assert!(matches!(executor.render(), Err(VecEnvError::Closed)));
}

#[test]
fn broken_factory_fails_construction() {
    let factories: Vec<EnvFactory> = vec![Box::new(|| Err(EnvironmentError::NoEnvironment))];
    let err = VectorizedExecutor::new(factories, ExecutorConfig::default()).unwrap_err();
    assert!(matches!(err, VecEnvError::Worker(WorkerFailure::Disconnected { worker: 0 })), "got {err:?}");
    assert!(matches!(VectorizedExecutor::new(Vec::new(), ExecutorConfig::default()), Err(VecEnvError::NoWorkers)));
}

#[test]
fn sessions_over_loopback() {
    let factories: Vec<EnvFactory> = (0..3)
        .map(|_| {
            let factory: EnvFactory = Box::new(|| {
                let manager = LoopbackConnector::new(RollingSphere::default()).into_manager(ConnectionConfig::default());
                Ok(Box::new(SessionEnv::new(EnvironmentSession::new(manager))) as Box<dyn GymEnv>)
            });
            factory
        })
        .collect();
    let mut executor = VectorizedExecutor::new(factories, ExecutorConfig::default()).unwrap();
    assert_eq!(executor.spaces().action.len(), 1);
    assert_eq!(executor.num_envs(), 3);

    executor.reset().unwrap();
    let arrays = executor.step(actions(&[10.0, 0.0, -10.0])).unwrap().into_arrays().unwrap();
    assert!((arrays.observations[0][0] - 0.2).abs() < 1e-6);
    assert!(arrays.observations[1][0].abs() < 1e-6);
    assert!((arrays.observations[2][0] + 0.2).abs() < 1e-6);
    assert!(arrays.infos.iter().all(|info| info.frame_number == 1));
}
