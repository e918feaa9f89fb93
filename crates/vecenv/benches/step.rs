use connection::ConnectionConfig;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use environment::{EnvironmentSession, LoopbackConnector, RollingSphere};
use vecenv::{EnvFactory, ExecutorConfig, GymEnv, SessionEnv, VectorizedExecutor};

fn sphere_factories(count: usize) -> Vec<EnvFactory> {
    (0..count)
        .map(|_| {
            let factory: EnvFactory = Box::new(|| {
                let manager = LoopbackConnector::new(RollingSphere::default()).into_manager(ConnectionConfig::default());
                Ok(Box::new(SessionEnv::new(EnvironmentSession::new(manager))) as Box<dyn GymEnv>)
            });
            factory
        })
        .collect()
}

fn bench_vectorized_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("vectorized_step");
    for envs in [1usize, 4, 8] {
        let mut executor = VectorizedExecutor::new(sphere_factories(envs), ExecutorConfig::default())
            .expect("executor starts");
        executor.reset().expect("reset");
        group.bench_with_input(BenchmarkId::from_parameter(envs), &envs, |b, &envs| {
            b.iter(|| {
                let actions = (0..envs).map(|i| vec![if i % 2 == 0 { 1.0 } else { -1.0 }]).collect();
                executor.step(actions).expect("step")
            });
        });
        executor.close();
    }
    group.finish();
}

criterion_group!(benches, bench_vectorized_step);
criterion_main!(benches);
