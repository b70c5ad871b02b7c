//! End-to-end calls against an in-process user service.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

use dynclient::ApplicationException;
use dynclient::ApplicationExceptionKind;
use dynclient::Client;
use dynclient::Error;
use dynclient::FlushFailurePolicy;
use dynclient::MemoryTransport;
use dynclient::Record;
use dynclient::Value;
use dynclient::transport;
use dynpack::Decoder;
use dynpack::Encoder;
use dynpack::MessageHeader;
use dynpack::MessageType;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Faction {
    #[serde(rename = "field_1")]
    id: i32,
    #[serde(rename = "field_2")]
    name: String,
    #[serde(rename = "field_3")]
    rank: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct User {
    #[serde(rename = "field_1")]
    id: i32,
    #[serde(rename = "field_2")]
    name: String,
    #[serde(rename = "field_3")]
    faction: Faction,
}

fn red_team() -> Faction {
    Faction { id: 100, name: "Red Team".into(), rank: "Captain".into() }
}

// ============================================================================
//  THE SERVICE
// ============================================================================

/// Answers one request the way a generated server would.
///
/// - `GetUser2(id: i32, name: string) -> User`
/// - `GetUser3(id: i32, user: User) -> User` (echoes the user)
/// - `Ping()`
/// - `Explode()` raises the declared exception in field 1
/// - anything else is an unknown method
fn serve(request: &[u8]) -> dynrpc::Result<Vec<u8>> {
    let mut dec = Decoder::new(request);
    let header = dec.message_begin()?;
    let args = if dec.remaining() > 0 { dynrpc::decode_record(&mut dec)? } else { Record::default() };

    let mut kind = MessageType::Reply;
    let mut body = Record::new(format!("{}_result", header.name));
    match header.name.as_str() {
        "GetUser2" => {
            let faction = dynrpc::to_value(&red_team())?;
            let user = Record::new("User")
                .with(1, args.get(1).cloned().unwrap_or_default())?
                .with(2, args.get(2).cloned().unwrap_or_default())?
                .with(3, faction)?;
            body.insert(0, Value::Record(user))?;
        }
        "GetUser3" => {
            body.insert(0, args.get(2).cloned().unwrap_or_default())?;
        }
        "Ping" => {}
        "Explode" => {
            body.insert(1, Value::Record(Record::new("Boom").with(1, "exploded")?))?;
        }
        other => {
            kind = MessageType::Exception;
            body = ApplicationException::new(
                ApplicationExceptionKind::UnknownMethod,
                format!("unknown method {other}"),
            )
            .to_record();
        }
    }

    let mut enc = Encoder::new();
    enc.message_begin(&MessageHeader::new(header.name, kind, header.seq))?;
    dynrpc::encode_record(&mut enc, &body)?;
    enc.message_end()?;
    Ok(enc.into_bytes()?)
}

fn service() -> MemoryTransport {
    MemoryTransport::new(|req| serve(req).map_err(|e| transport::Error::Io(e.to_string())))
}

fn client(transport: MemoryTransport) -> Client {
    Client::builder("memory://users").build_with(Box::new(transport))
}

// ============================================================================
//  CALLS
// ============================================================================

#[tokio::test]
async fn test_get_user2() -> anyhow::Result<()> {
    let mut client = client(service());
    let user: User = client.call("GetUser2", (2i32, "Jaina")).await?;
    assert_eq!(user, User { id: 2, name: "Jaina".into(), faction: red_team() });
    Ok(())
}

#[tokio::test]
async fn test_get_user3_sends_nested_record() -> anyhow::Result<()> {
    let mut client = client(service());
    let sent = User { id: 3, name: "Jaina".into(), faction: red_team() };
    let echoed: User = client.call("GetUser3", (3i32, &sent)).await?;
    assert_eq!(echoed, sent);
    Ok(())
}

#[tokio::test]
async fn test_request_bytes_on_the_wire() -> anyhow::Result<()> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let transport = MemoryTransport::new(move |req| {
        log.lock().unwrap().push(req.to_vec());
        serve(req).map_err(|e| transport::Error::Io(e.to_string()))
    });
    let mut client = client(transport);
    let _: User = client.call("GetUser2", (2i32, "Jaina")).await?;

    let requests = seen.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let mut dec = Decoder::new(&requests[0]);
    let header = dec.message_begin()?;
    assert_eq!((header.name.as_str(), header.kind, header.seq), ("GetUser2", MessageType::Call, 0));
    let args = dynrpc::decode_record(&mut dec)?;
    assert_eq!(args.get(1), Some(&Value::I32(2)));
    assert_eq!(args.get(2), Some(&Value::String("Jaina".into())));
    assert_eq!(dec.remaining(), 0);
    Ok(())
}

#[tokio::test]
async fn test_void_method_yields_default() -> anyhow::Result<()> {
    let mut client = client(service());
    client.call::<_, ()>("Ping", ()).await?;
    let user: User = client.call("Ping", ()).await?;
    assert_eq!(user, User::default());
    Ok(())
}

#[tokio::test]
async fn test_declared_exception_visible_through_call_value() -> anyhow::Result<()> {
    let mut client = client(service());

    let user: User = client.call("Explode", ()).await?;
    assert_eq!(user, User::default());

    let reply = client.call_value("Explode", ()).await?;
    let boom = reply
        .as_record()
        .and_then(|r| r.get(1))
        .and_then(Value::as_record)
        .and_then(|r| r.get(1))
        .and_then(Value::as_str);
    assert_eq!(boom, Some("exploded"));
    Ok(())
}

#[tokio::test]
async fn test_unknown_method_is_remote_fault() {
    let mut client = client(service());
    let result: dynclient::Result<User> = client.call("GetUser9", (1i32,)).await;
    let err = result.unwrap_err();
    let fault = err.remote().expect("remote fault");
    assert_eq!(fault.kind, ApplicationExceptionKind::UnknownMethod);
    assert_eq!(fault.message, "unknown method GetUser9");
}

#[tokio::test]
async fn test_coercion_failure_names_path() {
    let mut client = client(service());
    let result: dynclient::Result<Faction> = client.call("GetUser2", (2i32, "Jaina")).await;
    match result {
        Err(Error::Rpc(dynrpc::Error::Coercion { path, .. })) => {
            assert_eq!(path, vec!["field_0", "field_3"]);
        }
        other => panic!("expected a coercion failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unsupported_argument_fails_before_sending() {
    let seen = Arc::new(Mutex::new(0usize));
    let count = seen.clone();
    let transport = MemoryTransport::new(move |req| {
        *count.lock().unwrap() += 1;
        serve(req).map_err(|e| transport::Error::Io(e.to_string()))
    });
    let mut client = client(transport);
    let result: dynclient::Result<User> = client.call("GetUser2", (u64::MAX,)).await;
    assert!(matches!(result, Err(Error::Rpc(dynrpc::Error::Unsupported(_)))));
    assert_eq!(*seen.lock().unwrap(), 0);
}

// ============================================================================
//  FLUSH FAILURES
// ============================================================================

#[tokio::test]
async fn test_flush_failure_logged_and_reply_read() -> anyhow::Result<()> {
    let transport = service().failing_flush(transport::Error::ConnectionLost("reset".into()));
    let mut client = client(transport);
    let user: User = client.call("GetUser2", (2i32, "Jaina")).await?;
    assert_eq!(user.name, "Jaina");
    Ok(())
}

#[tokio::test]
async fn test_flush_failure_propagated() {
    let failure = transport::Error::ConnectionLost("reset".into());
    let transport = service().failing_flush(failure.clone());
    let mut client = Client::builder("memory://users")
        .flush_failure(FlushFailurePolicy::Propagate)
        .build_with(Box::new(transport));
    let result: dynclient::Result<User> = client.call("GetUser2", (2i32, "Jaina")).await;
    match result {
        Err(Error::Transport(e)) => assert_eq!(e, failure),
        other => panic!("expected a transport failure, got {:?}", other),
    }
}

// ============================================================================
//  FRAMED TCP
// ============================================================================

/// Serves every connection; the very first reply is held back by `first_reply_delay`.
async fn spawn_framed_server(first_reply_delay: Duration) -> anyhow::Result<std::net::SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let served = Arc::new(AtomicUsize::new(0));
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let served = served.clone();
            tokio::spawn(async move {
                while let Ok(size) = socket.read_u32().await {
                    let mut frame = vec![0u8; size as usize];
                    if socket.read_exact(&mut frame).await.is_err() {
                        return;
                    }
                    let Ok(reply) = serve(&frame) else {
                        return;
                    };
                    if served.fetch_add(1, Ordering::SeqCst) == 0 {
                        tokio::time::sleep(first_reply_delay).await;
                    }
                    if socket.write_u32(reply.len() as u32).await.is_err()
                        || socket.write_all(&reply).await.is_err()
                    {
                        return;
                    }
                }
            });
        }
    });
    Ok(addr)
}

#[tokio::test]
async fn test_framed_tcp_roundtrip() -> anyhow::Result<()> {
    let addr = spawn_framed_server(Duration::ZERO).await?;
    let mut client = Client::connect(format!("tcp://{addr}"))?;

    let user: User = client.call("GetUser2", (2i32, "Jaina")).await?;
    assert_eq!(user.faction, red_team());

    let again: User = client.call("GetUser3", (3i32, &user)).await?;
    assert_eq!(again, user);

    client.close().await?;
    assert!(!client.is_open());
    Ok(())
}

#[tokio::test]
async fn test_framed_tcp_rejects_oversized_reply() -> anyhow::Result<()> {
    let addr = spawn_framed_server(Duration::ZERO).await?;
    let mut client = Client::builder(format!("tcp://{addr}")).max_message_size(64).build()?;

    let result: dynclient::Result<User> = client.call("GetUser2", (2i32, "Jaina")).await;
    assert!(matches!(
        result,
        Err(Error::Transport(transport::Error::FrameTooLarge { limit: 64, .. }))
    ));
    Ok(())
}

#[tokio::test]
async fn test_timed_out_call_does_not_leak_into_next() -> anyhow::Result<()> {
    let addr = spawn_framed_server(Duration::from_millis(300)).await?;
    let mut client = Client::builder(format!("tcp://{addr}"))
        .timeout(Duration::from_millis(100))
        .build()?;

    let first: dynclient::Result<User> = client.call("GetUser2", (1i32, "First")).await;
    assert!(matches!(first, Err(Error::Transport(transport::Error::Timeout))));
    assert!(!client.is_open());

    let second: User = client.call("GetUser2", (2i32, "Second")).await?;
    assert_eq!((second.id, second.name.as_str()), (2, "Second"));

    // The late reply to the first call must not surface on later calls either.
    tokio::time::sleep(Duration::from_millis(300)).await;
    let third: User = client.call("GetUser2", (3i32, "Third")).await?;
    assert_eq!((third.id, third.name.as_str()), (3, "Third"));
    Ok(())
}

#[tokio::test]
async fn test_oversized_reply_drops_connection() -> anyhow::Result<()> {
    let addr = spawn_framed_server(Duration::ZERO).await?;
    let mut client = Client::builder(format!("tcp://{addr}")).max_message_size(64).build()?;

    let _ = client.call::<_, User>("GetUser2", (2i32, "Jaina")).await;
    assert!(!client.is_open());

    // A small reply on a fresh connection is read in step.
    client.call::<_, ()>("Ping", ()).await?;
    Ok(())
}

// ============================================================================
//  HTTP
// ============================================================================

/// Answers every POST with `status` and an empty body.
async fn spawn_http_status_server(status: &'static str) -> anyhow::Result<std::net::SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut head = Vec::new();
                let mut byte = [0u8; 1];
                while !head.ends_with(b"\r\n\r\n") {
                    if socket.read_exact(&mut byte).await.is_err() {
                        return;
                    }
                    head.push(byte[0]);
                }
                let head = String::from_utf8_lossy(&head).to_ascii_lowercase();
                let length = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                let mut body = vec![0u8; length];
                if socket.read_exact(&mut body).await.is_err() {
                    return;
                }
                let reply = format!("HTTP/1.1 {status}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    Ok(addr)
}

#[tokio::test]
async fn test_http_status_failure_reported_under_log_and_read() -> anyhow::Result<()> {
    let addr = spawn_http_status_server("500 Internal Server Error").await?;
    let mut client = Client::connect(format!("http://{addr}/"))?;

    let result: dynclient::Result<User> = client.call("GetUser2", (2i32, "Jaina")).await;
    match result {
        Err(Error::Transport(e)) => assert_eq!(e, transport::Error::Status(500)),
        other => panic!("expected the HTTP status failure, got {:?}", other),
    }
    Ok(())
}
