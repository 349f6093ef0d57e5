//! Suites that exercise the framework through its own runner.
//!
//! `suite-bench` with no arguments runs all of them.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use anyhow::ensure;

use crate::bench::{BenchmarkRequest, Iterations, ParameterSweep};
use crate::resource::ResourceSpec;
use crate::suite::TestSuite;
use crate::{SuiteError, SuiteResult};

pub fn suites() -> SuiteResult<Vec<TestSuite>> {
    Ok(vec![resources()?, benchmarks()?, callbacks()?, fixtures()?])
}

fn fails<T>(result: SuiteResult<T>, what: &str) -> anyhow::Result<()> {
    ensure!(result.is_err(), "{what} should have failed");
    Ok(())
}

/// Resource lifecycle. Every test leaves the table as it found it.
pub fn resources() -> SuiteResult<TestSuite> {
    let mut suite = TestSuite::new("Resources");
    suite
        .add_test("delete_all_on_empty_table", |ctx| {
            ctx.delete_all()?;
            Ok(())
        })?
        .add_test("unknown_names_are_rejected", |ctx| {
            fails(ctx.create("missing"), "create")?;
            fails(ctx.delete("missing"), "delete")?;
            fails(ctx.resources().is_created("missing"), "is_created")?;
            fails(ctx.create_many(&["missing"]), "create_many")?;
            Ok(())
        })?
        .add_test("duplicate_registration", |ctx| {
            let key = ctx.register(ResourceSpec::<()>::new("dup"))?;
            fails(ctx.register(ResourceSpec::<()>::new("dup")), "second register")?;
            ctx.remove(&key)?;
            Ok(())
        })?
        .add_test("created_resources_cannot_be_removed", |ctx| {
            let key = ctx.register(ResourceSpec::<()>::new("held"))?;
            ctx.create("held")?;
            fails(ctx.remove(&key), "remove")?;
            fails(ctx.resources_mut().remove_all(), "remove_all")?;
            ctx.delete("held")?;
            ctx.remove(&key)?;
            Ok(())
        })?
        .add_test("create_get_delete", |ctx| {
            let released = Rc::new(Cell::new(10));
            let sink = released.clone();
            let key = ctx.register(
                ResourceSpec::new("counter")
                    .with_create(|| Ok(1))
                    .with_release(move |value: Option<i32>| {
                        sink.set(sink.get() + value.unwrap_or_default());
                        Ok(())
                    }),
            )?;
            fails(ctx.get(&key), "get before create")?;

            ctx.create("counter")?;
            ensure!(*ctx.get(&key)? == 1);
            ensure!(released.get() == 10);

            ctx.delete("counter")?;
            fails(ctx.get(&key), "get after delete")?;
            ensure!(released.get() == 11);
            ctx.remove(&key)?;
            Ok(())
        })?
        .add_test("default_value_while_not_created", |ctx| {
            let key = ctx.register(
                ResourceSpec::new("flag")
                    .with_default(false)
                    .with_create(|| Ok(true)),
            )?;
            ensure!(!*ctx.get(&key)?);
            ctx.create("flag")?;
            ensure!(*ctx.get(&key)?);
            ensure!(ctx.resources().is_created("flag")?);
            ctx.delete("flag")?;
            ensure!(!*ctx.get(&key)?);
            ensure!(!ctx.resources().is_created("flag")?);
            ctx.remove(&key)?;
            Ok(())
        })?
        .add_test("dependencies_are_created_first", |ctx| {
            ctx.register(ResourceSpec::<()>::new("outer").depends_on("inner"))?;
            fails(ctx.create("outer"), "create with unregistered dependency")?;

            let inner = ctx.register(
                ResourceSpec::new("inner")
                    .with_default(false)
                    .with_create(|| Ok(true)),
            )?;
            ctx.create("outer")?;
            ensure!(*ctx.get(&inner)?);
            ensure!(ctx.resources().is_created("outer")?);
            ctx.delete_all()?;
            ctx.resources_mut().remove_all()?;
            Ok(())
        })?
        .add_test("delete_all_unwinds_creation_order", |ctx| {
            let deletes = Rc::new(RefCell::new(Vec::new()));
            for (name, deps) in [("A", vec![]), ("B", vec!["A"]), ("C", vec![])] {
                let log = deletes.clone();
                ctx.register(
                    ResourceSpec::<()>::new(name)
                        .with_dependencies(deps)
                        .with_release(move |_| {
                            log.borrow_mut().push(name);
                            Ok(())
                        }),
                )?;
            }

            ctx.create("C")?;
            ctx.create("B")?;
            ctx.delete_all()?;
            ensure!(*deletes.borrow() == ["B", "A", "C"], "got {:?}", deletes.borrow());

            deletes.borrow_mut().clear();
            ctx.create_many(&["A", "C", "B"])?;
            ctx.delete_all()?;
            ensure!(*deletes.borrow() == ["B", "C", "A"], "got {:?}", deletes.borrow());
            ctx.resources_mut().remove_all()?;
            Ok(())
        })?
        .add_test("failing_factory_leaves_nothing_created", |ctx| {
            ctx.register(
                ResourceSpec::<()>::new("broken").with_create(|| anyhow::bail!("no connection")),
            )?;
            fails(ctx.create("broken"), "create")?;
            ensure!(!ctx.resources().is_created("broken")?);
            ctx.resources_mut().remove_all()?;
            Ok(())
        })?
        .add_test("create_many_uses_registration_order", |ctx| {
            let order = Rc::new(RefCell::new(Vec::new()));
            for (name, deps) in [("A", vec![]), ("B", vec!["A"]), ("C", vec![]), ("D", vec![])] {
                let log = order.clone();
                ctx.register(ResourceSpec::new(name).with_dependencies(deps).with_create(
                    move || {
                        log.borrow_mut().push(name);
                        Ok(())
                    },
                ))?;
            }
            ctx.create_many(&["C", "B"])?;
            ensure!(*order.borrow() == ["A", "B", "C"], "got {:?}", order.borrow());
            ctx.delete_all()?;
            ctx.resources_mut().remove_all()?;
            Ok(())
        })?
        .add_test("removed_spec_keeps_its_factory", |ctx| {
            let calls = Rc::new(Cell::new(0));
            let counter = calls.clone();
            let key = ctx.register(ResourceSpec::new("A").with_create(move || {
                counter.set(counter.get() + 1);
                Ok(counter.get())
            }))?;
            let mut spec = ctx.remove(&key)?;
            ensure!(spec.has_create());
            let value = spec.create_value().transpose()?;
            ensure!(value == Some(1) && calls.get() == 1);
            Ok(())
        })?;
    Ok(suite)
}

/// Warmup accounting, validation and failure reporting.
pub fn benchmarks() -> SuiteResult<TestSuite> {
    let mut suite = TestSuite::new("Benchmarks");
    suite
        .add_test("invalid_requests", |ctx| {
            let invalid = [
                Iterations::fixed(10).with_warmups(100),
                Iterations::fixed(100).with_warmups(100),
                Iterations::fixed(0),
                Iterations::target_time(Duration::ZERO, 10),
                Iterations::target_time(Duration::from_secs(1), 0),
            ];
            for iterations in invalid {
                let result = ctx.measure(BenchmarkRequest::new(iterations, |_| Ok(())));
                ensure!(
                    matches!(result, Err(SuiteError::InvalidBenchmarkRequest(_))),
                    "{iterations:?} was accepted"
                );
            }
            Ok(())
        })?
        .add_test("default_warmups", |ctx| {
            let mut calls = 0_u64;
            let result = ctx.measure(BenchmarkRequest::fixed(1000, |_| {
                calls += 1;
                Ok(())
            }))?;
            ensure!(calls == 1000);
            ensure!(result.n == 990 && result.warmups == 10);
            Ok(())
        })?
        .add_test("explicit_warmups", |ctx| {
            let mut calls = 0_u64;
            let result = ctx.measure(
                BenchmarkRequest::fixed(1000, |_| {
                    calls += 1;
                    Ok(())
                })
                .with_warmups(100),
            )?;
            ensure!(calls == 1000);
            ensure!(result.n == 900 && result.warmups == 100);
            Ok(())
        })?
        .add_test("single_operation", |ctx| {
            let mut calls = 0_u64;
            let result = ctx.measure(
                BenchmarkRequest::fixed(1, |_| {
                    calls += 1;
                    Ok(())
                })
                .with_warmups(0),
            )?;
            ensure!(calls == 1 && result.n == 1 && result.warmups == 0);
            Ok(())
        })?
        .add_test("target_time", |ctx| {
            let mut calls = 0_u64;
            let result = ctx.measure(
                BenchmarkRequest::target_time(Duration::from_millis(20), 10_000, |i| {
                    calls += 1;
                    Ok(i.wrapping_mul(31))
                })
                .with_label("target"),
            )?;
            ensure!(result.n >= 1 && result.warmups == 10_000);
            ensure!(calls == result.n + result.warmups);
            Ok(())
        })?
        .add_test("operation_index", |ctx| {
            let mut seen = Vec::new();
            ctx.measure(
                BenchmarkRequest::fixed(10, |i| {
                    seen.push(i);
                    Ok(())
                })
                .with_warmups(5),
            )?;
            ensure!(seen == (0..10).collect::<Vec<_>>(), "got {seen:?}");
            Ok(())
        })?
        .add_test("errors_stop_the_run", |ctx| {
            for (fail_at, in_warmup) in [(5, true), (50, true), (500, false)] {
                let mut successes = 0_u64;
                let result = ctx.measure(
                    BenchmarkRequest::fixed(1000, |i| {
                        ensure!(i != fail_at, "failure at {i}");
                        successes += 1;
                        Ok(())
                    })
                    .with_warmups(100),
                );
                let Err(SuiteError::BenchmarkFailed {
                    iteration,
                    during_warmup,
                    ..
                }) = result
                else {
                    anyhow::bail!("operation {fail_at} should have failed the benchmark");
                };
                ensure!(iteration == fail_at && during_warmup == in_warmup);
                ensure!(successes == fail_at);
            }
            Ok(())
        })?
        .add_test("parameter_sweep", |ctx| {
            let mut calls = 0_u64;
            let before = RefCell::new(Vec::new());
            let after = RefCell::new(Vec::new());
            let results = ctx.measure_sweep(
                ParameterSweep::new(Iterations::fixed(100), ["a", "b", "c"], |_: &&str, _: u64| {
                    calls += 1;
                    Ok(())
                })
                .before(|p, i| {
                    before.borrow_mut().push((p.to_string(), i));
                    Ok(())
                })
                .after(|p, i| {
                    after.borrow_mut().push((p.to_string(), i));
                    Ok(())
                }),
            )?;
            let expected = vec![("a".to_string(), 0), ("b".to_string(), 1), ("c".to_string(), 2)];
            ensure!(calls == 300);
            ensure!(before.into_inner() == expected);
            ensure!(after.into_inner() == expected);
            ensure!(results.contains_key("a") && !results.contains_key("d"));
            ensure!(results["a"].n == 99);
            Ok(())
        })?;
    Ok(suite)
}

/// `before_each` and `after_each` wrap every test, in order.
pub fn callbacks() -> SuiteResult<TestSuite> {
    let before = Rc::new(Cell::new(0));
    let after = Rc::new(Cell::new(0));
    let (b, a) = (before.clone(), after.clone());
    let (b1, a1) = (before.clone(), after.clone());

    TestSuite::new("Callbacks")
        .with_before_each(move |_| {
            b.set((b.get() + 1) * 2);
            Ok(())
        })
        .with_after_each(move |_| {
            a.set((a.get() + 1) * 2);
            Ok(())
        })
        .with_test("first", move |_| {
            ensure!(b1.get() == 2 && a1.get() == 0, "before {}, after {}", b1.get(), a1.get());
            Ok(())
        })?
        .with_test("second", move |_| {
            ensure!(
                before.get() == 6 && after.get() == 2,
                "before {}, after {}",
                before.get(),
                after.get()
            );
            Ok(())
        })
}

/// Resources registered once in `setup` and shared by all tests of the suite.
pub fn fixtures() -> SuiteResult<TestSuite> {
    let keys = Rc::new(RefCell::new(None));
    let registered = keys.clone();
    let (k1, k2, k3) = (keys.clone(), keys.clone(), keys);

    TestSuite::new("Fixtures")
        .with_setup(move |ctx| {
            let a = ctx.register(ResourceSpec::new("A").with_create(|| Ok(42_i32)))?;
            let b = ctx.register(ResourceSpec::new("B").with_create(|| Ok("initialized".to_string())))?;
            let c = ctx.register(ResourceSpec::new("C").with_default(false).with_create(|| Ok(true)))?;
            ctx.register(ResourceSpec::<()>::new("AB").with_dependencies(["A", "B"]))?;
            *registered.borrow_mut() = Some((a, b, c));
            Ok(())
        })
        .with_test("get_before_create", move |ctx| {
            let keys = k1.borrow();
            let Some((a, b, c)) = keys.as_ref() else {
                anyhow::bail!("setup did not run");
            };
            fails(ctx.get(a), "A")?;
            fails(ctx.get(b), "B")?;
            ensure!(!*ctx.get(c)?);
            Ok(())
        })?
        .with_test("create", move |ctx| {
            let keys = k2.borrow();
            let Some((a, b, c)) = keys.as_ref() else {
                anyhow::bail!("setup did not run");
            };
            ctx.create("A")?;
            ensure!(*ctx.get(a)? == 42);
            ctx.create("B")?;
            ensure!(ctx.get(b)? == "initialized");
            ctx.create("C")?;
            ensure!(*ctx.get(c)?);
            Ok(())
        })?
        .with_test("delete", move |ctx| {
            let keys = k3.borrow();
            let Some((a, b, c)) = keys.as_ref() else {
                anyhow::bail!("setup did not run");
            };
            ctx.delete("A")?;
            fails(ctx.get(a), "A")?;
            ctx.delete("B")?;
            fails(ctx.get(b), "B")?;
            ctx.delete("C")?;
            ensure!(!*ctx.get(c)?);
            Ok(())
        })
}
