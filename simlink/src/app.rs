//! # Command Drivers
//!
//! One function per subcommand. Each builds its collaborators from the
//! loaded [`AppConfig`] and runs until its step budget is spent.

use anyhow::{Context, Result};
use environment::{Environment, EnvironmentSession, LoopbackConnector, ResetRequest, RollingSphere, SimulatorServer};
use simlink::config::AppConfig;
use std::time::Instant;
use vecenv::{EnvFactory, GymEnv, SessionEnv, VectorizedExecutor};

const REPORT_EVERY: u64 = 100;

/// Host a [`RollingSphere`] on the configured endpoint until interrupted.
///
/// # Errors
///
/// Bind or accept failures.
pub fn serve(config: &AppConfig, describe_after: u32) -> Result<()> {
    let endpoint = &config.connection.endpoint;
    let server = SimulatorServer::bind((endpoint.host.as_str(), endpoint.port))
        .with_context(|| format!("binding {endpoint}"))?;
    let mut sphere = RollingSphere::default().describe_after(describe_after);
    server.run(&mut sphere)?;
    Ok(())
}

/// React with uniformly sampled actions, resetting whenever an episode ends.
///
/// # Errors
///
/// Handshake timeouts and any exchange failure.
pub fn run(config: AppConfig, steps: u64) -> Result<()> {
    let mut session = EnvironmentSession::tcp(config.connection);
    session.on_event(connection::ConnectionEvent::Disconnected, || tracing::warn!("simulator went away"));
    let first = session.reset(ResetRequest::new()).context("initial reset")?;
    tracing::info!(environment = %first.environment_name, "session ready");

    let mut window = Instant::now();
    let mut episodes = 0u64;
    for step in 1..=steps {
        let action = session.spaces().context("simulator did not describe its spaces")?.action.sample();
        let state = session.react(action.into())?;
        if state.terminated {
            episodes += 1;
            tracing::debug!(
                frame = state.frame_number,
                reason = state.termination_reason.as_deref().unwrap_or("unknown"),
                "episode ended"
            );
            session.reset(ResetRequest::new())?;
        }
        if step % REPORT_EVERY == 0 {
            #[allow(clippy::cast_precision_loss)]
            let fps = REPORT_EVERY as f64 / window.elapsed().as_secs_f64();
            tracing::info!(step, episodes, fps, "progress");
            window = Instant::now();
        }
    }
    session.close()?;
    Ok(())
}

/// Step `envs` in-process rolling spheres and log the mean reward.
///
/// # Errors
///
/// Executor start-up failures and the first failed worker of any round.
pub fn vec(config: &AppConfig, envs: usize, steps: u64) -> Result<()> {
    let factories = (0..envs)
        .map(|index| {
            let connection = config.connection.clone();
            let factory: EnvFactory = Box::new(move || {
                let sphere = RollingSphere::new(format!("rolling_sphere_{index}"));
                let manager = LoopbackConnector::new(sphere).into_manager(connection);
                Ok(Box::new(SessionEnv::new(EnvironmentSession::new(manager))) as Box<dyn GymEnv>)
            });
            factory
        })
        .collect();
    let mut executor = VectorizedExecutor::new(factories, config.executor)?;
    let action_space = executor.spaces().action.clone();
    executor.reset()?;

    let started = Instant::now();
    let mut reward_sum = 0.0f64;
    let mut episodes = 0usize;
    for step in 1..=steps {
        let actions = (0..envs).map(|_| action_space.sample()).collect();
        let arrays = executor.step(actions)?.into_arrays()?;
        reward_sum += arrays.rewards.iter().map(|&r| f64::from(r)).sum::<f64>();
        episodes += arrays.dones.iter().filter(|&&done| done).count();
        if step % REPORT_EVERY == 0 {
            #[allow(clippy::cast_precision_loss)]
            let mean_reward = reward_sum / (step as f64 * envs as f64);
            tracing::info!(step, episodes, mean_reward, renders = executor.renders_issued(), "progress");
        }
    }
    #[allow(clippy::cast_precision_loss)]
    let steps_per_second = (steps as f64 * envs as f64) / started.elapsed().as_secs_f64();
    tracing::info!(envs, steps, episodes, steps_per_second, "done");
    executor.close();
    Ok(())
}
