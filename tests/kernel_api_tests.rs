use labsim::core::execution::{SimulationConfig, SimulationEngine, SimulationObserver};
use labsim::{Action, FnProcess, ProcessId, SimError, SimTime};
use proptest::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

fn engine(end: SimTime, seed: u64) -> SimulationEngine {
    SimulationEngine::new(SimulationConfig::new(0.0, end).with_seed(seed)).unwrap()
}

/// Records every resumption the kernel performs
struct ResumeLog(Rc<RefCell<Vec<(SimTime, ProcessId)>>>);

impl SimulationObserver for ResumeLog {
    fn on_resume(&mut self, time: SimTime, process: ProcessId) {
        self.0.borrow_mut().push((time, process));
    }
}

#[test]
fn test_facility_hand_over_at_release_instant() {
    let mut sim = engine(100.0, 1);
    let printer = sim.add_facility("Printer 1");
    let grants = Rc::new(RefCell::new(Vec::new()));

    let mut ids = Vec::new();
    for (name, hold) in [("first", 7.0), ("second", 3.0)] {
        let grants = Rc::clone(&grants);
        let mut step = 0;
        ids.push(sim.spawn(Box::new(FnProcess::new(name, move |ctx| {
            step += 1;
            Ok(match step {
                1 => Action::Seize(printer),
                2 => {
                    grants.borrow_mut().push((name, ctx.now()));
                    Action::Wait(hold)
                }
                3 => Action::Release(printer),
                _ => Action::Finish,
            })
        }))));
    }

    sim.step().unwrap();
    sim.step().unwrap();
    assert_eq!(sim.facility(printer).unwrap().holder(), Some(ids[0]));
    assert_eq!(sim.facility(printer).unwrap().queue_len(), 1);

    let summary = sim.run().unwrap();
    assert_eq!(*grants.borrow(), vec![("first", 0.0), ("second", 7.0)]);
    assert_eq!(sim.now(), 10.0);
    assert_eq!(summary.processes_finished, 2);
    assert!(!sim.facility(printer).unwrap().is_busy());
}

#[test]
fn test_store_admits_third_request_after_leave() {
    let mut sim = engine(100.0, 1);
    let staff = sim.add_store("Designer", 2).unwrap();
    let admissions = Rc::new(RefCell::new(Vec::new()));

    for (name, at, hold) in [("one", 0.0, 5.0), ("two", 0.0, 8.0), ("three", 1.0, 2.0)] {
        let admissions = Rc::clone(&admissions);
        let mut step = 0;
        let process = FnProcess::new(name, move |ctx| {
            step += 1;
            Ok(match step {
                1 => Action::Enter(staff, 1),
                2 => {
                    admissions.borrow_mut().push((name, ctx.now()));
                    Action::Wait(hold)
                }
                3 => Action::Leave(staff, 1),
                _ => Action::Finish,
            })
        });
        sim.spawn_at(Box::new(process), at).unwrap();
    }

    loop {
        sim.step().unwrap();
        let store = sim.store(staff).unwrap();
        assert!(store.used() <= 2);
        if store.queue_len() == 1 {
            break;
        }
    }
    assert_eq!(sim.now(), 1.0);
    assert_eq!(sim.store(staff).unwrap().used(), 2);

    sim.run().unwrap();
    assert_eq!(
        *admissions.borrow(),
        vec![("one", 0.0), ("two", 0.0), ("three", 5.0)]
    );
    assert_eq!(sim.store(staff).unwrap().used(), 0);
}

fn arrivals(seed: u64) -> Vec<SimTime> {
    let mut sim = engine(500.0, seed);
    let times = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&times);
    sim.spawn(Box::new(FnProcess::new("generator", move |ctx| {
        let sink = Rc::clone(&sink);
        ctx.activate(Box::new(FnProcess::new("customer", move |ctx| {
            sink.borrow_mut().push(ctx.now());
            Ok(Action::Finish)
        })));
        Ok(Action::Wait(ctx.exponential(20.0)?))
    })));
    let summary = sim.run().unwrap();
    assert!(summary.stopped_at_horizon);
    assert_eq!(summary.processes_abandoned, 1);
    let result = times.borrow().clone();
    result
}

#[test]
fn test_seeded_generator_is_reproducible() {
    let first = arrivals(2024);
    let second = arrivals(2024);
    assert!(first.len() > 5);
    assert_eq!(first, second);
    assert!(first.windows(2).all(|w| w[0] <= w[1]));
    assert!(first.iter().all(|&t| t <= 500.0));
    assert_ne!(first, arrivals(2025));
}

#[test]
fn test_mutual_exclusion_under_contention() {
    let mut sim = engine(1000.0, 9);
    let plotter = sim.add_facility("Plotter 1");
    let spans = Rc::new(RefCell::new(Vec::new()));

    for i in 0..6 {
        let spans = Rc::clone(&spans);
        let mut step = 0;
        let mut granted = 0.0;
        sim.spawn(Box::new(FnProcess::new(format!("job {}", i), move |ctx| {
            step += 1;
            Ok(match step {
                1 => Action::Seize(plotter),
                2 => {
                    granted = ctx.now();
                    Action::Wait(ctx.uniform(1.0, 4.0)?)
                }
                3 => {
                    spans.borrow_mut().push((i, granted, ctx.now()));
                    Action::Release(plotter)
                }
                _ => Action::Finish,
            })
        })));
    }
    sim.run().unwrap();

    let spans = spans.borrow();
    let order: Vec<_> = spans.iter().map(|s| s.0).collect();
    assert_eq!(order, vec![0, 1, 2, 3, 4, 5]);
    for pair in spans.windows(2) {
        assert_eq!(pair[1].1, pair[0].2);
    }
    let report = sim.facility(plotter).unwrap().report(sim.now());
    assert_eq!(report.requests, 6);
    assert!((report.utilization - 1.0).abs() < 1e-9);
}

#[test]
fn test_higher_priority_waiter_served_first() {
    let mut sim = engine(100.0, 1);
    let printer = sim.add_facility("Printer 1");
    let served = Rc::new(RefCell::new(Vec::new()));

    for (name, priority, at) in [("holder", 0, 0.0), ("low", 0, 1.0), ("high", 5, 2.0)] {
        let served = Rc::clone(&served);
        let mut step = 0;
        let process = FnProcess::new(name, move |_ctx| {
            step += 1;
            Ok(match step {
                1 => Action::Seize(printer),
                2 => {
                    served.borrow_mut().push(name);
                    Action::Wait(10.0)
                }
                3 => Action::Release(printer),
                _ => Action::Finish,
            })
        })
        .with_priority(priority);
        sim.spawn_at(Box::new(process), at).unwrap();
    }
    sim.run().unwrap();
    assert_eq!(*served.borrow(), vec!["holder", "high", "low"]);
}

#[test]
fn test_protocol_violations_abort_the_run() {
    let mut sim = engine(10.0, 1);
    let printer = sim.add_facility("Printer 1");
    sim.spawn(Box::new(FnProcess::new("thief", move |_ctx| Ok(Action::Release(printer)))));
    assert!(matches!(sim.run(), Err(SimError::ReleaseByNonHolder { .. })));

    let mut sim = engine(10.0, 1);
    let staff = sim.add_store("Supervisor", 1).unwrap();
    sim.spawn(Box::new(FnProcess::new("leaver", move |_ctx| Ok(Action::Leave(staff, 1)))));
    assert!(matches!(sim.run(), Err(SimError::LeaveWithoutHolding { .. })));

    let mut sim = engine(10.0, 1);
    let printer = sim.add_facility("Printer 1");
    sim.spawn(Box::new(FnProcess::new("greedy", move |_ctx| Ok(Action::Seize(printer)))));
    assert!(matches!(sim.run(), Err(SimError::DoubleSeize { .. })));

    assert!(matches!(
        SimulationEngine::new(SimulationConfig::new(0.0, 10.0)).unwrap().add_store("empty", 0),
        Err(SimError::InvalidCapacity { .. })
    ));
}

#[test]
fn test_report_is_idempotent() {
    let mut sim = engine(50.0, 3);
    let printer = sim.add_facility("Printer 1");
    let histogram = sim.add_histogram("Duration", 0.0, 5.0, 10).unwrap();
    let mut step = 0;
    sim.spawn(Box::new(FnProcess::new("job", move |ctx| {
        step += 1;
        Ok(match step {
            1 => Action::Seize(printer),
            2 => Action::Wait(12.0),
            3 => {
                ctx.record(histogram, ctx.now())?;
                Action::Release(printer)
            }
            _ => Action::Finish,
        })
    })));
    sim.run().unwrap();

    let first = sim.report();
    let second = sim.report();
    assert_eq!(first, second);
    assert_eq!(first.histograms[0].buckets[2].count, 1);
    assert!((first.facilities[0].utilization - 1.0).abs() < 1e-9);
}

#[test]
fn test_equal_time_resumptions_follow_insertion_order() {
    let mut sim = engine(10.0, 1);
    let log = Rc::new(RefCell::new(Vec::new()));
    sim.add_observer(Box::new(ResumeLog(Rc::clone(&log))));

    let ids: Vec<_> = (0..4)
        .map(|i| {
            sim.spawn_at(Box::new(FnProcess::new(format!("p{}", i), |_ctx| Ok(Action::Finish))), 3.0)
                .unwrap()
        })
        .collect();
    sim.run().unwrap();

    let resumed: Vec<_> = log.borrow().iter().map(|&(_, id)| id).collect();
    assert_eq!(resumed, ids);
}

fn resumptions_at(log: &Rc<RefCell<Vec<(SimTime, ProcessId)>>>, time: SimTime) -> Vec<ProcessId> {
    log.borrow()
        .iter()
        .filter(|&&(t, _)| t == time)
        .map(|&(_, id)| id)
        .collect()
}

#[test]
fn test_immediate_seize_yields_to_processes_due_now() {
    let mut sim = engine(10.0, 1);
    let printer = sim.add_facility("Printer 1");
    let log = Rc::new(RefCell::new(Vec::new()));
    sim.add_observer(Box::new(ResumeLog(Rc::clone(&log))));

    let mut step = 0;
    let holder = sim.spawn(Box::new(FnProcess::new("holder", move |_ctx| {
        step += 1;
        Ok(match step {
            1 => Action::Seize(printer),
            2 => Action::Wait(1.0),
            3 => Action::Release(printer),
            _ => Action::Finish,
        })
    })));
    let bystander = sim.spawn(Box::new(FnProcess::new("bystander", |_ctx| Ok(Action::Finish))));
    sim.run().unwrap();

    assert_eq!(resumptions_at(&log, 0.0), vec![holder, bystander, holder]);
    assert_eq!(resumptions_at(&log, 1.0), vec![holder]);
}

#[test]
fn test_immediate_enter_yields_to_processes_due_now() {
    let mut sim = engine(10.0, 1);
    let crew = sim.add_store("Designer", 2).unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));
    sim.add_observer(Box::new(ResumeLog(Rc::clone(&log))));

    let mut step = 0;
    let member = sim.spawn(Box::new(FnProcess::new("member", move |_ctx| {
        step += 1;
        Ok(match step {
            1 => Action::Enter(crew, 1),
            2 => Action::Wait(1.0),
            3 => Action::Leave(crew, 1),
            _ => Action::Finish,
        })
    })));
    let bystander = sim.spawn(Box::new(FnProcess::new("bystander", |_ctx| Ok(Action::Finish))));
    sim.run().unwrap();

    assert_eq!(resumptions_at(&log, 0.0), vec![member, bystander, member]);
}

#[test]
fn test_release_grant_runs_after_events_already_due() {
    let mut sim = engine(100.0, 1);
    let printer = sim.add_facility("Printer 1");
    let log = Rc::new(RefCell::new(Vec::new()));
    sim.add_observer(Box::new(ResumeLog(Rc::clone(&log))));

    let mut holder_step = 0;
    let holder = sim.spawn(Box::new(FnProcess::new("holder", move |_ctx| {
        holder_step += 1;
        Ok(match holder_step {
            1 => Action::Seize(printer),
            2 => Action::Wait(5.0),
            3 => Action::Release(printer),
            _ => Action::Finish,
        })
    })));
    let mut waiter_step = 0;
    let waiter = sim.spawn(Box::new(FnProcess::new("waiter", move |_ctx| {
        waiter_step += 1;
        Ok(match waiter_step {
            1 => Action::Seize(printer),
            2 => Action::Release(printer),
            _ => Action::Finish,
        })
    })));
    let mut slept = false;
    let sleeper = sim.spawn(Box::new(FnProcess::new("sleeper", move |_ctx| {
        if slept {
            Ok(Action::Finish)
        } else {
            slept = true;
            Ok(Action::Wait(5.0))
        }
    })));
    let early = sim
        .spawn_at(Box::new(FnProcess::new("early", |_ctx| Ok(Action::Finish))), 5.0)
        .unwrap();
    sim.run().unwrap();

    assert_eq!(resumptions_at(&log, 5.0), vec![early, sleeper, holder, waiter]);
    assert!(!sim.facility(printer).unwrap().is_busy());
}

proptest! {
    #[test]
    fn prop_resumptions_are_time_then_insertion_ordered(
        times in prop::collection::vec(0u32..20, 1..40)
    ) {
        let mut sim = engine(100.0, 1);
        let log = Rc::new(RefCell::new(Vec::new()));
        sim.add_observer(Box::new(ResumeLog(Rc::clone(&log))));

        let mut expected = Vec::new();
        for (i, &t) in times.iter().enumerate() {
            let id = sim
                .spawn_at(Box::new(FnProcess::new("p", |_ctx| Ok(Action::Finish))), t as f64)
                .unwrap();
            expected.push((t as f64, i, id));
        }
        sim.run().unwrap();

        expected.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap().then(a.1.cmp(&b.1)));
        let expected: Vec<_> = expected.into_iter().map(|(t, _, id)| (t, id)).collect();
        prop_assert_eq!(log.borrow().clone(), expected);
    }

    #[test]
    fn prop_histogram_buckets_account_for_every_value(
        values in prop::collection::vec(0.0f64..100.0, 0..200)
    ) {
        let mut sim = engine(1.0, 1);
        let id = sim.add_histogram("h", 0.0, 10.0, 10).unwrap();
        for &v in &values {
            sim.record(id, v).unwrap();
        }
        let histogram = sim.histogram(id).unwrap();
        prop_assert_eq!(histogram.bucket_counts().iter().sum::<u64>(), values.len() as u64);
        prop_assert_eq!(histogram.underflow(), 0);
        prop_assert_eq!(histogram.overflow(), 0);
    }

    #[test]
    fn prop_store_usage_matches_holdings(
        requests in prop::collection::vec((1usize..4, 0u32..10, 1u32..10), 1..15)
    ) {
        let mut sim = engine(1000.0, 1);
        let pool = sim.add_store("pool", 4).unwrap();
        for &(units, at, hold) in &requests {
            let mut step = 0;
            let process = FnProcess::new("user", move |_ctx| {
                step += 1;
                Ok(match step {
                    1 => Action::Enter(pool, units),
                    2 => Action::Wait(hold as f64),
                    3 => Action::Leave(pool, units),
                    _ => Action::Finish,
                })
            });
            sim.spawn_at(Box::new(process), at as f64).unwrap();
        }

        loop {
            let store = sim.store(pool).unwrap();
            prop_assert!(store.used() <= store.capacity());
            prop_assert_eq!(store.used(), store.held_total());
            match sim.step() {
                Ok(_) => {}
                Err(SimError::EmptyCalendar) => break,
                Err(other) => return Err(TestCaseError::fail(other.to_string())),
            }
        }
        prop_assert_eq!(sim.store(pool).unwrap().used(), 0);
        prop_assert_eq!(sim.active_processes(), 0);
    }
}
