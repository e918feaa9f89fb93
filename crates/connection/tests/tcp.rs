use connection::frame::{read_frame, write_frame};
use connection::{ConnectionConfig, ConnectionError, ConnectionManager, ConnectionState, Endpoint};
use messaging::{Actor, Description, JsonCodec, MessageCodec, Response, State};
use std::collections::BTreeMap;
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

/// Serve one client: answer request `n` with a state whose frame number is `n`,
/// sleeping `delays[n]` before answering.
fn serve_once(delays: Vec<Duration>) -> (Endpoint, thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut frame_number = 0u64;
        while let Ok(request) = read_frame(&mut stream) {
            JsonCodec.decode_reactions(&request).unwrap();
            if let Some(delay) = delays.get(usize::try_from(frame_number).unwrap()) {
                thread::sleep(*delay);
            }
            let mut actors = BTreeMap::new();
            actors.insert("agent".to_owned(), Actor { name: "agent".to_owned(), alive: true, motors: vec![] });
            let state = State {
                environment_name: "arena".into(),
                frame_number,
                description: Some(Description { actors, ..Description::default() }),
                ..State::default()
            };
            let payload = JsonCodec.encode_response(&Response::new([state])).unwrap();
            if write_frame(&mut stream, &payload).is_err() {
                break;
            }
            frame_number += 1;
        }
    });
    (Endpoint::new("127.0.0.1", port), handle)
}

fn frame_of(payload: &[u8]) -> u64 {
    JsonCodec.decode_response(payload).unwrap().states["arena"].frame_number
}

#[test]
fn handshake_and_exchange_over_tcp() {
    let (endpoint, server) = serve_once(Vec::new());
    let mut manager = ConnectionManager::tcp(ConnectionConfig::default().with_endpoint(endpoint));

    let confirmed = manager.connect().unwrap();
    assert_eq!(confirmed.states["arena"].frame_number, 0);

    let probe = JsonCodec.encode_reactions(&[messaging::Reaction::describe()]).unwrap();
    assert_eq!(frame_of(&manager.send(&probe).unwrap()), 1);

    manager.close();
    server.join().unwrap();
}

#[test]
fn late_response_is_not_paired_with_the_next_request() {
    let delays = vec![Duration::ZERO, Duration::from_millis(300)];
    let (endpoint, server) = serve_once(delays);
    let config = ConnectionConfig::default()
        .with_endpoint(endpoint)
        .with_request_timeout(Duration::from_millis(50));
    let mut manager = ConnectionManager::tcp(config);
    manager.connect().unwrap();

    let probe = JsonCodec.encode_reactions(&[messaging::Reaction::describe()]).unwrap();
    let err = manager.send(&probe).unwrap_err();
    assert!(matches!(err, ConnectionError::RequestTimeout(_)), "got {err:?}");
    assert_eq!(manager.state(), ConnectionState::Connected);

    thread::sleep(Duration::from_millis(400));
    assert_eq!(frame_of(&manager.send(&probe).unwrap()), 2);

    manager.close();
    server.join().unwrap();
}

#[test]
fn unreachable_endpoint_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = ConnectionConfig::default()
        .with_endpoint(Endpoint::new("127.0.0.1", port))
        .with_max_connect_attempts(2)
        .with_retry_interval(Duration::from_millis(1))
        .with_connect_timeout(Duration::from_millis(50));
    let mut manager = ConnectionManager::tcp(config);

    let err = manager.connect().unwrap_err();
    assert!(matches!(err, ConnectionError::Timeout { attempts: 2, .. }), "got {err:?}");
    assert_eq!(manager.state(), ConnectionState::TimedOut);
}

#[test]
fn remote_shutdown_is_reported_as_disconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let request = read_frame(&mut stream).unwrap();
        JsonCodec.decode_reactions(&request).unwrap();
        let mut actors = BTreeMap::new();
        actors.insert("agent".to_owned(), Actor { name: "agent".to_owned(), alive: true, motors: vec![] });
        let state = State {
            environment_name: "arena".into(),
            description: Some(Description { actors, ..Description::default() }),
            ..State::default()
        };
        write_frame(&mut stream, &JsonCodec.encode_response(&Response::new([state])).unwrap()).unwrap();
    });

    let mut manager = ConnectionManager::tcp(ConnectionConfig::default().with_endpoint(Endpoint::new("127.0.0.1", port)));
    manager.connect().unwrap();
    server.join().unwrap();

    let err = manager.send(b"after hangup").unwrap_err();
    assert!(matches!(err, ConnectionError::Disconnected(_)), "got {err:?}");
    assert_eq!(manager.state(), ConnectionState::Disconnected);
}
