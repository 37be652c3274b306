//! Cast Tests - Dynamic Interface Resolution
//!
//! These tests exercise:
//! - Casts answered from a proxy's static type table
//! - Casts resolved through the connect registry after an isType query
//! - Failed casts as ordinary results
//! - Identity across casts and across handles

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use common::*;
use remobj::types::BASE_INTERFACE;
use remobj::Interface;

/// Test: a pkg.Bar handle on a pkg.Foo object casts to pkg.Foo
#[test]
fn test_cast_through_connect_registry() {
    init_logging();
    println!("=== Registry Cast Test ===");

    let pair = LoopbackPair::new();
    let (_object, url) = pair.publish_foo("castable");
    assert!(pair.client.connectors().register(FOO, Foo::connector()));

    let bar = pair.client.connect_as::<Bar>(&url).unwrap().unwrap();
    assert_eq!(bar.object().view(), BAR);
    assert_eq!(pair.host_refs(&url), Some(1));
    let holders = bar.object().ref_count();

    pair.network.reset();
    let foo = bar.object().cast_to::<Foo>().unwrap().unwrap();
    assert_eq!(pair.network.methods(), vec!["isType".to_string()]);
    assert_eq!(foo.object().view(), FOO);
    assert_eq!(foo.go(21).unwrap(), 42);

    assert!(foo.object().is_same(bar.object()).unwrap());
    assert!(bar.object().is_same(foo.object()).unwrap());
    assert_eq!(bar.object().ref_count(), holders + 1);
    assert_eq!(pair.host_refs(&url), Some(1));
    assert_eq!(pair.count("addRef"), 0);

    drop(foo);
    assert_eq!(bar.object().ref_count(), holders);
    assert_eq!(bar.label().unwrap(), "castable");

    println!("Registry Cast Test: PASSED");
}

/// Test: a cast the static table answers sends nothing
#[test]
fn test_static_cast_sends_no_request() {
    init_logging();

    let pair = LoopbackPair::new();
    let (_object, url) = pair.publish_foo("static");

    let foo = pair.client.connect_as::<Foo>(&url).unwrap().unwrap();
    pair.network.reset();

    let bar = foo.object().cast_to::<Bar>().unwrap().unwrap();
    let base = foo.object().cast(BASE_INTERFACE).unwrap().unwrap();
    assert_eq!(pair.network.round_trips(), 0);
    assert_eq!(bar.object().view(), BAR);
    assert_eq!(base.view(), BASE_INTERFACE);
}

/// Test: an unimplemented interface fails the cast and keeps the count
#[test]
fn test_failed_cast_keeps_count() {
    init_logging();
    println!("=== Failed Cast Test ===");

    let pair = LoopbackPair::new();
    let (_object, url) = pair.publish_foo("plain");

    let handle = pair.client.connect(&url).unwrap();
    let holders = handle.ref_count();

    assert!(handle.cast("pkg.Missing").unwrap().is_none());
    assert!(!handle.is_type("pkg.Missing").unwrap());
    assert_eq!(handle.ref_count(), holders);
    assert_eq!(pair.host_refs(&url), Some(1));

    let local = pair.host.connect(&url).unwrap();
    let local_holders = local.ref_count();
    assert!(local.cast("pkg.Missing").unwrap().is_none());
    assert_eq!(local.ref_count(), local_holders);

    println!("Failed Cast Test: PASSED");
}

/// Test: an implemented interface with no connector is not castable
#[test]
fn test_cast_without_connector() {
    init_logging();

    let pair = LoopbackPair::new();
    let (_object, url) = pair.publish_foo("unregistered");

    let bar = pair.client.connect_as::<Bar>(&url).unwrap().unwrap();
    assert!(bar.object().is_type(FOO).unwrap());
    assert!(bar.object().cast(FOO).unwrap().is_none());

    // The typed cast registers its connector on first use.
    assert!(bar.object().cast_to::<Foo>().unwrap().is_some());
    assert!(pair.client.connectors().contains(FOO));
    assert!(!Foo::register(&pair.client));
}

/// Test: connector registration is idempotent
#[test]
fn test_connector_registration_is_idempotent() {
    let pair = LoopbackPair::new();
    let registry = pair.client.connectors();

    let before = registry.len();
    assert!(registry.register(FOO, Foo::connector()));
    assert!(!registry.register(FOO, Bar::connector()));
    assert!(registry.register_type(&BAR_TYPE));
    assert!(!registry.register_type(&BAR_TYPE));
    assert_eq!(registry.len(), before + 2);
}

/// Test: is_same is reflexive, symmetric and stable under casting
#[test]
fn test_identity_laws() {
    init_logging();
    println!("=== Identity Test ===");

    let pair = LoopbackPair::new();
    let (_a, url_a) = pair.publish_foo("a");
    let (_b, url_b) = pair.publish_foo("b");

    let a = pair.client.connect_as::<Foo>(&url_a).unwrap().unwrap();
    let b = pair.client.connect_as::<Foo>(&url_b).unwrap().unwrap();
    let a_as_bar = a.object().cast_to::<Bar>().unwrap().unwrap();

    assert!(a.object().is_same(a.object()).unwrap());
    assert!(a.object().is_same(a_as_bar.object()).unwrap());
    assert!(a_as_bar.object().is_same(a.object()).unwrap());
    assert!(!a.object().is_same(b.object()).unwrap());
    assert!(!b.object().is_same(a.object()).unwrap());

    let local_a = pair.host.connect(&url_a).unwrap();
    assert!(local_a.is_local());
    assert!(local_a.is_same(&pair.host.connect(&url_a).unwrap()).unwrap());
    assert!(!local_a.is_same(&pair.host.connect(&url_b).unwrap()).unwrap());

    println!("Identity Test: PASSED");
}

/// Test: comparisons between local and remote handles
#[test]
fn test_identity_across_locality() {
    init_logging();

    let pair = LoopbackPair::new();
    let (_object, url) = pair.publish_foo("mixed");
    let remote = pair.client.connect(&url).unwrap();
    let dropped = Arc::new(AtomicBool::new(false));
    let own = pair
        .client
        .wrap(Arc::new(FooObject::with_drop_flag("own", dropped.clone())));

    // A local handle resolves the remote URL against its own orb.
    pair.network.reset();
    assert!(!own.is_same(&remote).unwrap());
    assert_eq!(pair.network.round_trips(), 0);

    // A remote handle is never one of this orb's objects.
    assert!(!remote.is_same(&own).unwrap());
    pair.bind_client();
    assert!(!remote.is_same(&own).unwrap());
    assert_eq!(pair.network.round_trips(), 0);

    // Comparing does not export the local object or keep it alive.
    assert!(pair.client.instances().is_empty());
    drop(own);
    assert!(dropped.load(Ordering::SeqCst));
}
