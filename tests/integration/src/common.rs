//! Shared fixtures for the integration tests
//!
//! Two interfaces, `pkg.Bar` and `pkg.Foo` (which extends `pkg.Bar`), one
//! implementation of both, and a pair of orbs joined by a loopback network.

#![allow(dead_code)]

use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use remobj::{
    ArgList, Exception, Interface, LoopbackNetwork, Object, ObjectRef, Orb, Result, TypeInfo,
    RETVAL,
};

pub const BAR: &str = "pkg.Bar";
pub const FOO: &str = "pkg.Foo";

pub const BAR_TYPE: TypeInfo = TypeInfo::new(BAR, "1.0", &[]);
pub const FOO_TYPE: TypeInfo = TypeInfo::new(FOO, "2.1", &[BAR]);

pub const BAD_INPUT: &str = "pkg.BadInput";

/// Initialize test logging
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .try_init();
}

/// Implementation of `pkg.Foo`.
///
/// Records how it was called and flags its own destruction.
pub struct FooObject {
    label: String,
    calls: AtomicUsize,
    methods: Mutex<Vec<String>>,
    dropped: Arc<AtomicBool>,
}

impl FooObject {
    pub fn new(label: &str) -> Self {
        Self::with_drop_flag(label, Arc::new(AtomicBool::new(false)))
    }

    pub fn with_drop_flag(label: &str, dropped: Arc<AtomicBool>) -> Self {
        Self {
            label: label.to_string(),
            calls: AtomicUsize::new(0),
            methods: Mutex::new(Vec::new()),
            dropped,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn methods(&self) -> Vec<String> {
        self.methods.lock().clone()
    }
}

impl Drop for FooObject {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

impl Object for FooObject {
    fn type_info(&self) -> &'static TypeInfo {
        &FOO_TYPE
    }

    fn exec(&self, orb: &Orb, method: &str, args: &ArgList) -> std::result::Result<ArgList, Exception> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.methods.lock().push(method.to_string());

        let mut results = ArgList::new();
        match method {
            "label" => results.pack_string(RETVAL, self.label.clone())?,
            "go" => {
                let n = args.unpack_int("n")?;
                if n < 0 {
                    return Err(Exception::new(BAD_INPUT, "bad input"));
                }
                results.pack_int(RETVAL, n * 2)?;
            }
            "relay" => {
                let target = orb
                    .unpack_object(args, "target")?
                    .ok_or_else(|| Exception::new(BAD_INPUT, "null target"))?;
                let n = args.unpack_int("n")?;
                let mut forwarded = ArgList::new();
                forwarded.pack_int("n", n)?;
                let reply = target.exec("go", forwarded)?;
                results.pack_int(RETVAL, reply.unpack_int(RETVAL)?)?;
            }
            "echo" => {
                let object = orb.unpack_object(args, "object")?;
                orb.pack_object(&mut results, RETVAL, object.as_ref())?;
            }
            other => {
                return Err(Exception::new(
                    "remobj.NoSuchMethod",
                    format!("{}.{}", FOO, other),
                ))
            }
        }
        Ok(results)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `pkg.Bar` view
#[derive(Debug, Clone)]
pub struct Bar(ObjectRef);

impl Interface for Bar {
    const TYPE_INFO: &'static TypeInfo = &BAR_TYPE;

    fn from_object(object: ObjectRef) -> Self {
        Self(object)
    }

    fn object(&self) -> &ObjectRef {
        &self.0
    }
}

impl Bar {
    pub fn label(&self) -> Result<String> {
        let results = self.0.exec("label", ArgList::new())?;
        Ok(results.unpack_string(RETVAL)?)
    }
}

/// `pkg.Foo` view
#[derive(Debug, Clone)]
pub struct Foo(ObjectRef);

impl Interface for Foo {
    const TYPE_INFO: &'static TypeInfo = &FOO_TYPE;

    fn from_object(object: ObjectRef) -> Self {
        Self(object)
    }

    fn object(&self) -> &ObjectRef {
        &self.0
    }
}

impl Foo {
    pub fn go(&self, n: i32) -> Result<i32> {
        let mut args = ArgList::new();
        args.pack_int("n", n)?;
        let results = self.0.exec("go", args)?;
        Ok(results.unpack_int(RETVAL)?)
    }

    /// Ask this object to call `go` on `target`.
    pub fn relay(&self, target: &Foo, n: i32) -> Result<i32> {
        let mut args = ArgList::new();
        self.0.orb().pack_object(&mut args, "target", Some(target.object()))?;
        args.pack_int("n", n)?;
        let results = self.0.exec("relay", args)?;
        Ok(results.unpack_int(RETVAL)?)
    }

    /// Send `object` to this object and take back what it returns.
    pub fn echo(&self, object: Option<&ObjectRef>) -> Result<Option<ObjectRef>> {
        let mut args = ArgList::new();
        self.0.orb().pack_object(&mut args, "object", object)?;
        let results = self.0.exec("echo", args)?;
        self.0.orb().unpack_object(&results, RETVAL)
    }
}

/// Two orbs on one loopback network
pub struct LoopbackPair {
    pub network: LoopbackNetwork,
    pub host: Orb,
    pub client: Orb,
    /// `loop://host`
    pub host_endpoint: String,
}

impl LoopbackPair {
    /// `host` serves objects; `client` can reach it but serves nothing.
    pub fn new() -> Self {
        let network = LoopbackNetwork::new();
        let host = Orb::builder().tcp(false).build();
        let client = Orb::builder().tcp(false).build();
        let host_endpoint = network.bind("host", &host);
        network.attach(&client);
        Self {
            network,
            host,
            client,
            host_endpoint,
        }
    }

    /// Also serve objects from the client orb, at `loop://client`.
    pub fn bind_client(&self) -> String {
        self.network.bind("client", &self.client)
    }

    /// Pin a fresh `FooObject` on the host; returns it and its URL.
    pub fn publish_foo(&self, label: &str) -> (Arc<FooObject>, String) {
        let object = Arc::new(FooObject::new(label));
        let url = self
            .host
            .publish(object.clone())
            .expect("host has an endpoint");
        (object, url)
    }

    /// Peer references the host counts for the object at `url`
    pub fn host_refs(&self, url: &str) -> Option<u32> {
        let id = url.rsplit('/').next()?;
        self.host.instances().remote_refs(id)
    }

    /// Number of recorded calls of `method`
    pub fn count(&self, method: &str) -> usize {
        self.network
            .methods()
            .iter()
            .filter(|m| m.as_str() == method)
            .count()
    }
}

impl Default for LoopbackPair {
    fn default() -> Self {
        Self::new()
    }
}
