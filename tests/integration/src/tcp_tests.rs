//! TCP Tests - End-to-End Over Sockets
//!
//! The server runs on its own Tokio runtime; clients are plain threads, as
//! the client side of the invocation layer blocks.

mod common;

use std::any::Any;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use common::*;
use remobj::{
    ArgList, ErrorKind, Exception, Interface, Object, Orb, RmiError, RmiServer, ServerConfig,
    TypeInfo,
};
use tokio::runtime::Runtime;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct TestServer {
    runtime: Runtime,
    orb: Orb,
    endpoint: String,
    stats: Arc<remobj::server::ServerStats>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<remobj::Result<()>>>,
}

impl TestServer {
    fn start(config: ServerConfig) -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();
        let orb = Orb::new();
        let server = runtime
            .block_on(RmiServer::bind(orb.clone(), config))
            .unwrap();
        let endpoint = server.endpoint().to_string();
        let stats = server.stats().clone();

        let (tx, rx) = oneshot::channel::<()>();
        let task = runtime.spawn(server.run_until(async {
            let _ = rx.await;
        }));

        Self {
            runtime,
            orb,
            endpoint,
            stats,
            shutdown: Some(tx),
            task: Some(task),
        }
    }

    fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            self.runtime.block_on(task).unwrap().unwrap();
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// `pkg.Bar` implementation that sleeps through every call
struct Sleeper(Duration);

impl Object for Sleeper {
    fn type_info(&self) -> &'static TypeInfo {
        &BAR_TYPE
    }

    fn exec(&self, _orb: &Orb, _method: &str, _args: &ArgList) -> Result<ArgList, Exception> {
        thread::sleep(self.0);
        Ok(ArgList::new())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Test: calls, casts, exceptions and release over TCP
#[test]
fn test_tcp_end_to_end() {
    init_logging();
    println!("=== TCP End-to-End Test ===");

    let mut server = TestServer::start(ServerConfig::default());
    assert!(server.endpoint.starts_with("tcp://127.0.0.1:"));

    let dropped = Arc::new(AtomicBool::new(false));
    let object: Arc<dyn Object> = Arc::new(FooObject::with_drop_flag("tcp", dropped.clone()));
    let id = server.orb.instances().export(object);
    let url = format!("{}/{}", server.endpoint, id);

    let client = Orb::new();
    let bar = client.connect_as::<Bar>(&url).unwrap().unwrap();
    assert_eq!(bar.label().unwrap(), "tcp");
    assert_eq!(server.orb.instances().remote_refs(&id), Some(1));

    let foo = bar.object().cast_to::<Foo>().unwrap().unwrap();
    assert_eq!(foo.go(20).unwrap(), 40);
    assert!(foo.object().is_same(bar.object()).unwrap());

    let err = foo.go(-1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Application);
    match err {
        RmiError::Exception(ex) => {
            assert_eq!(ex.message, "bad input");
            assert_eq!(ex.trace, vec!["Exception unserialized from pkg.Foo.go.".to_string()]);
        }
        other => panic!("unexpected error: {:?}", other),
    }

    let info = foo.object().class_info().unwrap();
    assert_eq!(info.name().unwrap(), FOO);
    drop(info);

    drop(foo);
    drop(bar);
    assert!(!server.orb.instances().contains(&id));
    assert!(dropped.load(Ordering::SeqCst));

    let stats = server.stats.snapshot();
    assert_eq!(stats.connections_accepted, 1);
    assert!(stats.requests_processed >= 8);

    server.stop();
    assert!(!server.orb.is_local_url(&url));

    println!("TCP End-to-End Test: PASSED");
}

/// Test: many client threads share one connection
#[test]
fn test_tcp_concurrent_callers() {
    init_logging();
    println!("=== TCP Concurrent Callers Test ===");

    const THREADS: i32 = 8;
    const CALLS: i32 = 50;

    let server = TestServer::start(ServerConfig::default());
    let url = server
        .orb
        .publish(Arc::new(FooObject::new("busy")))
        .unwrap();

    let client = Orb::new();
    let foo = client.connect_as::<Foo>(&url).unwrap().unwrap();

    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let foo = foo.clone();
            thread::spawn(move || {
                for i in 0..CALLS {
                    let n = t * 1000 + i;
                    assert_eq!(foo.go(n).unwrap(), n * 2);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(client.protocols().open_connections(), 1);
    assert_eq!(server.stats.snapshot().connections_accepted, 1);

    println!("TCP Concurrent Callers Test: PASSED");
}

/// Test: remote creation over TCP
#[test]
fn test_tcp_create() {
    init_logging();

    let server = TestServer::start(ServerConfig::default());
    let factory: remobj::registry::ClassFactory =
        Arc::new(|| Arc::new(FooObject::new("made")) as Arc<dyn Object>);
    server.orb.classes().register(FOO, factory);

    let client = Orb::new();
    let foo = client.create_as::<Foo>(&server.endpoint).unwrap();
    assert_eq!(foo.go(2).unwrap(), 4);
    assert_eq!(server.orb.instances().len(), 1);

    drop(foo);
    assert!(server.orb.instances().is_empty());
}

/// Test: nothing listening is an unreachable peer
#[test]
fn test_tcp_unreachable() {
    init_logging();

    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let client = Orb::new();
    let err = client
        .connect(&format!("tcp://127.0.0.1:{}/x", port))
        .unwrap_err();
    assert!(matches!(err, RmiError::Unreachable { .. }));
    assert_eq!(err.kind(), ErrorKind::Connection);
}

/// Test: a stopped server fails later calls instead of hanging
#[test]
fn test_tcp_server_shutdown() {
    init_logging();

    let mut server = TestServer::start(ServerConfig::default());
    let url = server
        .orb
        .publish(Arc::new(FooObject::new("short-lived")))
        .unwrap();

    let client = Orb::new();
    let foo = client.connect_as::<Foo>(&url).unwrap().unwrap();
    assert_eq!(foo.go(1).unwrap(), 2);

    // Returns once the server has closed every connection.
    server.stop();

    let err = foo.go(1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
}

/// Test: oversized requests are refused by the server
#[test]
fn test_tcp_frame_limit() {
    init_logging();

    let server = TestServer::start(ServerConfig::builder().max_frame_size(256).build());
    let url = server
        .orb
        .publish(Arc::new(FooObject::new("small")))
        .unwrap();

    let client = Orb::new();
    let handle = client.connect(&url).unwrap();

    let mut args = remobj::ArgList::new();
    args.pack_string("n", "x".repeat(1024)).unwrap();
    let err = handle.exec("go", args).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
}

/// Test: a reply over the client's frame limit retires the stream
#[test]
fn test_tcp_oversized_reply_retires_stream() {
    init_logging();
    println!("=== TCP Oversized Reply Test ===");

    let server = TestServer::start(ServerConfig::default());
    let label = "x".repeat(300);
    let url = server
        .orb
        .publish(Arc::new(FooObject::new(&label)))
        .unwrap();

    let client = Orb::builder().max_frame_size(128).build();
    let bar = client.connect_as::<Bar>(&url).unwrap().unwrap();
    let foo = bar.object().cast_to::<Foo>().unwrap().unwrap();
    let connection = bar.object().instance_handle().unwrap().connection().clone();

    let err = bar.label().unwrap_err();
    assert!(matches!(err, RmiError::FrameTooLarge { size: 321, max: 128 }));
    assert!(connection.is_closed());

    // The unread reply body must never be taken for the next reply.
    assert!(matches!(foo.go(21).unwrap_err(), RmiError::ConnectionClosed));

    let again = client.connect_as::<Foo>(&url).unwrap().unwrap();
    assert!(!again
        .object()
        .instance_handle()
        .unwrap()
        .connection()
        .is_closed());
    assert_eq!(again.go(21).unwrap(), 42);

    println!("TCP Oversized Reply Test: PASSED");
}

/// Test: a client reconnects to a server restarted on the same address
#[test]
fn test_tcp_server_restart() {
    init_logging();
    println!("=== TCP Server Restart Test ===");

    let mut first = TestServer::start(ServerConfig::default());
    let url = first
        .orb
        .publish_as("world", Arc::new(FooObject::new("first")))
        .unwrap();
    let addr: SocketAddr = first.endpoint.trim_start_matches("tcp://").parse().unwrap();

    let client = Orb::new();
    let before = client.connect_as::<Bar>(&url).unwrap().unwrap();
    assert_eq!(before.label().unwrap(), "first");

    first.stop();
    drop(first);

    let second = TestServer::start(ServerConfig::new(addr));
    assert_eq!(
        second
            .orb
            .publish_as("world", Arc::new(FooObject::new("second")))
            .unwrap(),
        url
    );

    // The cached connection is dead; connecting replaces it.
    let after = client.connect_as::<Bar>(&url).unwrap().unwrap();
    assert_eq!(after.label().unwrap(), "second");
    assert_eq!(client.protocols().open_connections(), 1);
    assert_eq!(second.orb.instances().remote_refs("world"), Some(1));

    let err = before.label().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert!(before
        .object()
        .instance_handle()
        .unwrap()
        .connection()
        .is_closed());

    println!("TCP Server Restart Test: PASSED");
}

/// Test: closing a connection fails a call blocked on it
#[test]
fn test_tcp_close_interrupts_call() {
    init_logging();
    println!("=== TCP Close Interrupts Call Test ===");

    const NAP: Duration = Duration::from_secs(3);

    let server = TestServer::start(ServerConfig::default());
    let url = server.orb.publish(Arc::new(Sleeper(NAP))).unwrap();

    let client = Orb::new();
    let handle = client.connect(&url).unwrap();
    let connection = handle.instance_handle().unwrap().connection().clone();

    let caller = {
        let handle = handle.clone();
        thread::spawn(move || {
            let start = Instant::now();
            let result = handle.exec("nap", ArgList::new());
            (result, start.elapsed())
        })
    };

    thread::sleep(Duration::from_millis(200));
    connection.close();

    let (result, elapsed) = caller.join().unwrap();
    assert!(matches!(result, Err(RmiError::ConnectionClosed)));
    assert!(elapsed < NAP / 2, "call returned after {:?}", elapsed);

    println!("TCP Close Interrupts Call Test: PASSED");
}
