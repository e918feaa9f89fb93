use connection::frame::{read_frame, write_frame};
use connection::ConnectionConfig;
use environment::{Environment, EnvironmentSession, ResetRequest, RollingSphere, SimulatorServer};
use messaging::{JsonCodec, MessageCodec, Reaction};
use std::net::TcpStream;
use std::thread;
use std::time::Duration;

#[test]
fn session_over_tcp() -> anyhow::Result<()> {
    let server = SimulatorServer::bind("127.0.0.1:0")?;
    let endpoint = server.local_endpoint()?;
    let handle = thread::spawn(move || {
        let mut sphere = RollingSphere::default().describe_after(1);
        server.accept_one(&mut sphere).map(|()| sphere.position())
    });

    let config = ConnectionConfig::default()
        .with_endpoint(endpoint)
        .with_retry_interval(Duration::from_millis(5));
    let mut session = EnvironmentSession::tcp(config);
    session.reset(ResetRequest::new().with_configuration("start_x", 1.0))?;
    let state = session.react(vec![10.0].into())?;
    assert!((state.observables[0] - 1.2).abs() < 1e-5);
    session.close()?;

    let final_position = handle.join().expect("server thread")?;
    assert!((final_position - 1.2).abs() < 1e-5);
    Ok(())
}

#[test]
fn undecodable_request_gets_an_empty_frame() -> anyhow::Result<()> {
    let server = SimulatorServer::bind("127.0.0.1:0")?;
    let endpoint = server.local_endpoint()?;
    let handle = thread::spawn(move || server.accept_one(&mut RollingSphere::default()));

    let mut stream = TcpStream::connect((endpoint.host.as_str(), endpoint.port))?;
    write_frame(&mut stream, b"definitely not a reaction")?;
    assert!(read_frame(&mut stream)?.is_empty());

    write_frame(&mut stream, &JsonCodec.encode_reactions(&[Reaction::describe()])?)?;
    let response = JsonCodec.decode_response(&read_frame(&mut stream)?)?;
    assert!(response.states["rolling_sphere"].non_empty_description().is_some());

    drop(stream);
    handle.join().expect("server thread")?;
    Ok(())
}
