//! Resource lifecycle through the public API.

use std::cell::RefCell;
use std::rc::Rc;

use suite_bench::{ResourceManager, ResourceSpec, SuiteError};

type Log = Rc<RefCell<Vec<String>>>;

/// A marker resource that logs `+name` on create and `-name` on release.
fn tracked(name: &'static str, deps: &[&str], log: &Log) -> ResourceSpec<()> {
    let on_create = log.clone();
    let on_release = log.clone();
    ResourceSpec::new(name)
        .with_dependencies(deps.iter().copied())
        .with_create(move || {
            on_create.borrow_mut().push(format!("+{name}"));
            Ok(())
        })
        .with_release(move |_| {
            on_release.borrow_mut().push(format!("-{name}"));
            Ok(())
        })
}

#[test]
fn test_diamond_dependencies_create_once() {
    let log = Log::default();
    let mut manager = ResourceManager::new();
    manager.register(tracked("db", &[], &log)).unwrap();
    manager.register(tracked("cache", &["db"], &log)).unwrap();
    manager.register(tracked("queue", &["db"], &log)).unwrap();
    manager.register(tracked("app", &["cache", "queue"], &log)).unwrap();

    manager.create("app", true).unwrap();
    assert_eq!(*log.borrow(), ["+db", "+cache", "+queue", "+app"]);
    assert_eq!(manager.created(), ["db", "cache", "queue", "app"]);

    log.borrow_mut().clear();
    manager.delete_all().unwrap();
    assert_eq!(*log.borrow(), ["-app", "-queue", "-cache", "-db"]);
    assert!(manager.created().is_empty());
}

#[test]
fn test_delete_refused_while_dependents_live() {
    let log = Log::default();
    let mut manager = ResourceManager::new();
    manager.register(tracked("A", &[], &log)).unwrap();
    manager.register(tracked("B", &["A"], &log)).unwrap();
    manager.create("B", true).unwrap();

    let err = manager.delete("A").unwrap_err();
    assert!(matches!(err, SuiteError::ResourceInUse { ref names } if names == &["B"]));

    manager.delete("B").unwrap();
    manager.delete("A").unwrap();
    manager.remove_all().unwrap();
    assert!(manager.is_empty());
}

#[test]
fn test_dependency_cycle_is_an_error() {
    let log = Log::default();
    let mut manager = ResourceManager::new();
    manager.register(tracked("A", &["B"], &log)).unwrap();
    manager.register(tracked("B", &["A"], &log)).unwrap();

    let err = manager.create("A", true).unwrap_err();
    assert!(matches!(err, SuiteError::DependencyCycle(ref name) if name == "A"));
    assert!(log.borrow().is_empty());
    assert!(manager.created().is_empty());
}

#[test]
fn test_already_created() {
    let log = Log::default();
    let mut manager = ResourceManager::new();
    manager.register(tracked("A", &[], &log)).unwrap();
    manager.create("A", true).unwrap();

    assert!(matches!(manager.create("A", true), Err(SuiteError::AlreadyCreated(_))));
    manager.create("A", false).unwrap();
    assert_eq!(*log.borrow(), ["+A"]);
}

#[test]
fn test_failing_release_still_deletes() {
    let mut manager = ResourceManager::new();
    let key = manager
        .register(
            ResourceSpec::new("conn")
                .with_create(|| Ok(String::from("open")))
                .with_release(|_| anyhow::bail!("close failed")),
        )
        .unwrap();
    manager.create("conn", true).unwrap();
    assert_eq!(manager.get(&key).unwrap(), "open");

    assert!(manager.delete_all().is_err());
    assert!(!manager.is_created("conn").unwrap());
    assert!(matches!(manager.get(&key), Err(SuiteError::ResourceNotCreated(_))));
}

#[test]
fn test_stale_key_after_reregistration() {
    let mut manager = ResourceManager::new();
    let old = manager.register(ResourceSpec::new("value").with_default(1_u8)).unwrap();
    manager.remove(&old).unwrap();
    manager
        .register(ResourceSpec::new("value").with_default(String::from("text")))
        .unwrap();

    assert!(matches!(
        manager.get(&old),
        Err(SuiteError::ResourceTypeMismatch { ref name, .. }) if name == "value"
    ));
}

#[test]
fn test_create_many_ignores_argument_order() {
    let run = |names: &[&str]| {
        let log = Log::default();
        let mut manager = ResourceManager::new();
        manager.register(tracked("X", &[], &log)).unwrap();
        manager.register(tracked("Y", &[], &log)).unwrap();
        manager.create_many(names, true).unwrap();
        let created = manager.created().to_vec();
        let order = log.borrow().clone();
        (created, order)
    };
    assert_eq!(run(&["X", "Y"]), run(&["Y", "X"]));
    assert_eq!(run(&["Y", "X"]).1, ["+X", "+Y"]);
}

#[test]
fn test_create_many_validates_before_creating() {
    let log = Log::default();
    let mut manager = ResourceManager::new();
    manager.register(tracked("X", &[], &log)).unwrap();

    let err = manager.create_many(&["X", "nope"], true).unwrap_err();
    assert!(matches!(err, SuiteError::UnknownResource(ref name) if name == "nope"));
    assert!(log.borrow().is_empty());
}

#[test]
fn test_remove_then_register_again() {
    let mut manager = ResourceManager::new();
    let key = manager.register(ResourceSpec::new("r").with_default(1_i64)).unwrap();
    assert!(matches!(
        manager.register(ResourceSpec::new("r").with_default(2_i64)),
        Err(SuiteError::DuplicateResource(_))
    ));
    let spec = manager.remove(&key).unwrap();
    assert_eq!(spec.default_value(), Some(&1));

    let key = manager.register(ResourceSpec::new("r").with_default(3_i64)).unwrap();
    assert_eq!(*manager.get(&key).unwrap(), 3);
}
