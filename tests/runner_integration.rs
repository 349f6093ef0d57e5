//! Runner ordering, filtering and failure handling.

use std::cell::RefCell;
use std::rc::Rc;

use suite_bench::bench::ManualClock;
use suite_bench::report::MemoryReporter;
use suite_bench::report::memory::Event;
use suite_bench::runner::TestStatus;
use suite_bench::{BenchmarkRequest, ResourceSpec, Runner, TestSuite};

type Log = Rc<RefCell<Vec<String>>>;

fn push(log: &Log, entry: &str) {
    log.borrow_mut().push(entry.to_string());
}

fn hooked_suite(log: &Log) -> TestSuite {
    let (setup, before, after, t1, t2) = (log.clone(), log.clone(), log.clone(), log.clone(), log.clone());
    TestSuite::new("Hooks")
        .with_setup(move |_| {
            push(&setup, "setup");
            Ok(())
        })
        .with_before_each(move |_| {
            push(&before, "before");
            Ok(())
        })
        .with_after_each(move |_| {
            push(&after, "after");
            Ok(())
        })
        .with_test("one", move |_| {
            push(&t1, "one");
            Ok(())
        })
        .and_then(|s| {
            s.with_test("two", move |_| {
                push(&t2, "two");
                anyhow::bail!("two failed")
            })
        })
        .unwrap()
}

fn memory_runner() -> (Runner, Rc<RefCell<MemoryReporter>>) {
    let memory = Rc::new(RefCell::new(MemoryReporter::new()));
    let runner = Runner::new("integration")
        .with_clock(ManualClock::new())
        .with_reporter(memory.clone());
    (runner, memory)
}

#[test]
fn test_hook_order_and_after_each_on_failure() {
    let log = Log::default();
    let (runner, memory) = memory_runner();
    let summary = runner.run(&mut [hooked_suite(&log)]);

    assert_eq!(
        *log.borrow(),
        ["setup", "before", "one", "after", "before", "two", "after"]
    );
    assert_eq!(summary.passed(), 1);
    assert_eq!(summary.failed(), 1);
    let failure = summary.failures().next().unwrap();
    assert_eq!(failure.test, "two");
    assert_eq!(
        failure.status,
        TestStatus::Failed {
            message: "two failed".into()
        }
    );

    let events = memory.borrow().events().to_vec();
    assert_eq!(events.first(), Some(&Event::RunStarted("integration".into())));
    assert_eq!(events.last(), Some(&Event::RunCompleted { passed: 1, failed: 1 }));
}

#[test]
fn test_filters_skip_unselected_suites() {
    let log = Log::default();
    let (runner, memory) = memory_runner();
    let runner = runner.with_filters(["^Other\\."]).unwrap();
    let other = TestSuite::new("Other").with_test("x", |_| Ok(())).unwrap();
    let summary = runner.run(&mut [hooked_suite(&log), other]);

    assert!(log.borrow().is_empty(), "unselected suite ran: {:?}", log.borrow());
    assert_eq!(summary.suites.len(), 1);
    assert_eq!(summary.suites[0].name, "Other");
    assert!(
        !memory
            .borrow()
            .events()
            .iter()
            .any(|e| matches!(e, Event::SuiteStarted { suite, .. } if suite == "Hooks"))
    );
}

#[test]
fn test_panicking_test_is_a_failure() {
    let (runner, _) = memory_runner();
    let suite = TestSuite::new("Panics")
        .with_test("boom", |_| panic!("exploded"))
        .and_then(|s| s.with_test("after", |_| Ok(())))
        .unwrap();
    let summary = runner.run(&mut [suite]);

    let outcomes = &summary.suites[0].outcomes;
    assert_eq!(
        outcomes[0].status,
        TestStatus::Failed {
            message: "panicked: exploded".into()
        }
    );
    assert!(outcomes[1].passed());
}

#[test]
fn test_setup_failure_fails_every_selected_test() {
    let (runner, _) = memory_runner();
    let ran = Rc::new(RefCell::new(false));
    let flag = ran.clone();
    let suite = TestSuite::new("Broken")
        .with_setup(|_| anyhow::bail!("no database"))
        .with_test("a", move |_| {
            *flag.borrow_mut() = true;
            Ok(())
        })
        .and_then(|s| s.with_test("b", |_| Ok(())))
        .unwrap();
    let summary = runner.run(&mut [suite]);

    assert!(!*ran.borrow());
    assert_eq!(summary.failed(), 2);
    for outcome in &summary.suites[0].outcomes {
        assert!(matches!(
            &outcome.status,
            TestStatus::Failed { message } if message == "suite setup failed: no database"
        ));
    }
}

#[test]
fn test_resources_live_across_tests_and_die_with_the_suite() {
    let released = Rc::new(RefCell::new(0));
    let counter = released.clone();
    let suite = TestSuite::new("Shared")
        .with_setup(move |ctx| {
            let counter = counter.clone();
            ctx.register(ResourceSpec::new("pool").with_create(|| Ok(4_usize)).with_release(
                move |_| {
                    *counter.borrow_mut() += 1;
                    Ok(())
                },
            ))?;
            Ok(())
        })
        .with_test("create", |ctx| {
            ctx.create("pool")?;
            Ok(())
        })
        .and_then(|s| {
            s.with_test("still_there", |ctx| {
                anyhow::ensure!(ctx.resources().is_created("pool")?);
                Ok(())
            })
        })
        .unwrap();

    let (runner, _) = memory_runner();
    let summary = runner.run(&mut [suite]);
    assert!(summary.success(), "{:?}", summary.failures().collect::<Vec<_>>());
    assert_eq!(*released.borrow(), 1);
}

#[test]
fn test_benchmarks_reach_runner_reporters() {
    let (runner, memory) = memory_runner();
    let suite = TestSuite::new("Bench")
        .with_test("measure", |ctx| {
            ctx.measure(BenchmarkRequest::fixed(100, |_| Ok(())).with_label("noop"))?;
            Ok(())
        })
        .unwrap();
    runner.run(&mut [suite]);

    let memory = memory.borrow();
    let results = memory.results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].label.as_deref(), Some("noop"));
    assert_eq!(results[0].n, 99);
}

#[test]
fn test_resource_can_be_created_after_its_factory_panicked() {
    let calls = Rc::new(RefCell::new(0));
    let counter = calls.clone();
    let suite = TestSuite::new("Flaky")
        .with_setup(move |ctx| {
            let counter = counter.clone();
            ctx.register(ResourceSpec::new("conn").with_create(move || {
                *counter.borrow_mut() += 1;
                if *counter.borrow() == 1 {
                    panic!("connection refused");
                }
                Ok(1_u8)
            }))?;
            Ok(())
        })
        .with_test("first", |ctx| {
            ctx.create("conn")?;
            Ok(())
        })
        .and_then(|s| {
            s.with_test("second", |ctx| {
                ctx.create("conn")?;
                Ok(())
            })
        })
        .unwrap();

    let (runner, _) = memory_runner();
    let summary = runner.run(&mut [suite]);
    let outcomes = &summary.suites[0].outcomes;
    assert_eq!(
        outcomes[0].status,
        TestStatus::Failed {
            message: "panicked: connection refused".into()
        }
    );
    assert!(outcomes[1].passed(), "{:?}", outcomes[1].status);
    assert_eq!(*calls.borrow(), 2);
}

#[test]
fn test_failing_release_at_suite_end_fails_the_run() {
    let suite = TestSuite::new("Leaky")
        .with_setup(|ctx| {
            ctx.register(
                ResourceSpec::new("socket")
                    .with_create(|| Ok(9_u16))
                    .with_release(|_| anyhow::bail!("socket busy")),
            )?;
            Ok(())
        })
        .with_test("open", |ctx| {
            ctx.create("socket")?;
            Ok(())
        })
        .unwrap();

    let (runner, memory) = memory_runner();
    let summary = runner.run(&mut [suite]);
    assert_eq!(summary.failed(), 0);
    assert!(!summary.success());
    let teardown = summary.suites[0].teardown_error.as_deref().unwrap();
    assert!(teardown.contains("socket busy"), "{teardown}");
    assert!(
        memory
            .borrow()
            .events()
            .contains(&Event::SuiteCompleted("Leaky".into()))
    );
}
