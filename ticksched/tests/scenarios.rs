//! End-to-end scheduling scenarios driven through the public `Scheduler` API.

use ticksched::hyperperiod::{self, DEFAULT_HYPERPERIOD_LIMIT};
use ticksched::scheduler::feasibility::total_utilization;
use ticksched::scheduler::{Algorithm, Scheduler, IDLE_LABEL};
use ticksched::task::MissSnapshot;

/// T1(4, 1), T2(5, 2): U = 0.65, schedulable under RM.
fn scenario_a(algorithm: Algorithm) -> Scheduler {
    let mut s = Scheduler::new(algorithm);
    s.add_task("T1", 4, 1, None).unwrap();
    s.add_task("T2", 5, 2, None).unwrap();
    s
}

/// T1(4, 2), T2(5, 3): U = 1.1, overloaded.
fn scenario_b(algorithm: Algorithm) -> Scheduler {
    let mut s = Scheduler::new(algorithm);
    s.add_task("T1", 4, 2, None).unwrap();
    s.add_task("T2", 5, 3, None).unwrap();
    s
}

#[test]
fn scenario_a_rm_timeline_is_exact() {
    let mut s = scenario_a(Algorithm::RateMonotonic);
    s.run_for(20);

    let expected = [
        "T1", "T2", "T2", "idle", "T1", "T2", "T2", "idle", "T1", "idle", //
        "T2", "T2", "T1", "idle", "idle", "T2", "T1", "T2", "idle", "idle",
    ];
    assert_eq!(s.timeline(), expected);
    assert!(s.get_deadline_misses().is_empty());
    assert!((total_utilization(s.tasks()) - 0.65).abs() < 1e-9);

    let info = hyperperiod::calculate(&s.periods(), DEFAULT_HYPERPERIOD_LIMIT).unwrap();
    assert_eq!(info.hyperperiod, 20);
}

#[test]
fn scenario_a_edf_has_no_misses_either() {
    let mut s = scenario_a(Algorithm::EarliestDeadlineFirst);
    s.run_for(20);
    assert!(s.get_deadline_misses().is_empty());
    assert_eq!(
        s.timeline().iter().filter(|slot| *slot == IDLE_LABEL).count(),
        7
    );
}

#[test]
fn scenario_b_rm_misses_t2() {
    let mut s = scenario_b(Algorithm::RateMonotonic);
    s.run_for(20);

    let misses = s.get_deadline_misses();
    assert!(!misses.is_empty());
    assert_eq!(
        misses[0],
        MissSnapshot {
            task_name: "T2".into(),
            instance: 1,
            scheduled_deadline_tick: 5,
        }
    );
    // T1 has the shorter period and always meets its deadline.
    assert!(misses.iter().all(|m| m.task_name == "T2"));
}

#[test]
fn scenario_b_edf_misses_by_tick_20() {
    let mut s = scenario_b(Algorithm::EarliestDeadlineFirst);
    s.run_for(20);

    let misses = s.get_deadline_misses();
    assert_eq!(
        misses,
        vec![MissSnapshot {
            task_name: "T1".into(),
            instance: 4,
            scheduled_deadline_tick: 16,
        }]
    );
}

#[test]
fn misses_are_recorded_once_per_instance() {
    for algorithm in [Algorithm::RateMonotonic, Algorithm::EarliestDeadlineFirst] {
        let mut s = scenario_b(algorithm);
        s.run_for(200);
        for task in s.tasks() {
            let mut instances: Vec<u64> = task.deadline_misses.iter().map(|m| m.instance).collect();
            let before = instances.len();
            instances.dedup();
            assert_eq!(instances.len(), before, "{} ({algorithm})", task.name);
        }
    }
}

#[test]
fn runs_are_deterministic() {
    for algorithm in [Algorithm::RateMonotonic, Algorithm::EarliestDeadlineFirst] {
        let mut a = scenario_b(algorithm);
        let mut b = scenario_b(algorithm);
        a.run_for(60);
        b.run_for(60);
        assert_eq!(a.timeline(), b.timeline());
        assert_eq!(a.get_deadline_misses(), b.get_deadline_misses());
        assert_eq!(a.recent_events(100), b.recent_events(100));
    }
}

#[test]
fn per_tick_invariants_hold() {
    for algorithm in [Algorithm::RateMonotonic, Algorithm::EarliestDeadlineFirst] {
        let mut s = Scheduler::new(algorithm);
        s.add_task("A", 3, 1, None).unwrap();
        s.add_task("B", 7, 3, Some(5)).unwrap();
        s.add_task("C", 10, 4, None).unwrap();

        for _ in 0..140 {
            let before: Vec<u64> = s.tasks().iter().map(|t| t.remaining_time).collect();
            let instances: Vec<u64> = s.tasks().iter().map(|t| t.instance).collect();
            let ran = s.tick();

            for (i, t) in s.tasks().iter().enumerate() {
                assert!(t.remaining_time <= t.execution_time);
                if t.instance > instances[i] {
                    assert_eq!(t.instance, instances[i] + 1);
                    assert_eq!(t.next_release, t.release_time + t.period);
                } else if ran.map(|id| id.index()) == Some(i) {
                    assert_eq!(t.remaining_time, before[i] - 1);
                } else {
                    assert_eq!(t.remaining_time, before[i]);
                }
            }
            if let Some(running) = s.running_task() {
                assert!(s.is_ready(running));
            }
        }
    }
}

#[test]
fn report_summarises_the_run() {
    let mut s = scenario_b(Algorithm::RateMonotonic);
    s.run_for(20);
    let report = s.report();
    assert_eq!(report.ticks, 20);
    assert_eq!(report.idle_ticks(), 0);
    assert_eq!(report.misses, s.get_deadline_misses());
    assert!(report.utilization > report.bound);
    assert!(report.to_string().contains("T2[1] missed deadline at t=5"));
}
