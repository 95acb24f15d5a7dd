/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Plain-text Gantt chart of the most recent ticks.
//!
//! ```text
//! t=0..19     0    5    10   15
//!             |....|....|....|....
//! T1          █↑░·█··░█···█···█···
//! T2          ↑██·░██··↑·██··↑█···
//! cpu         ████·███·█·███··██··
//! ```
//!
//! | Symbol | Meaning                         |
//! |--------|---------------------------------|
//! | `█`    | running                         |
//! | `░`    | ready, waiting                  |
//! | `↑`    | released this tick              |
//! | `✗`    | deadline miss detected          |
//! | `·`    | idle (nothing pending)          |

use std::fmt::Write as _;

use crate::scheduler::{SchedEvent, TickMark, TickRecord};
use crate::task::{TaskId, TaskSnapshot};

/// Narrowest label column, so short names still line up with the ruler.
const MIN_LABEL_WIDTH: usize = 8;

/// Render the chart for `trace` (oldest first).  Tasks are listed in
/// insertion order, matching the indices in each [`TickRecord`].
pub fn render(tasks: &[TaskSnapshot], trace: &[TickRecord]) -> String {
    let mut out = String::new();

    let (Some(first), Some(last)) = (trace.first(), trace.last()) else {
        out.push_str("(no ticks executed yet)\n");
        return out;
    };

    let width = tasks
        .iter()
        .map(|t| t.name.chars().count() + 2)
        .max()
        .unwrap_or(0)
        .max(MIN_LABEL_WIDTH);

    // Ruler: tick numbers every 5 ticks, then tick marks.
    let mut numbers = String::new();
    let mut marks = String::new();
    let mut pending = 0usize;
    for rec in trace {
        if rec.tick % 5 == 0 {
            let label = rec.tick.to_string();
            pending = label.len();
            numbers.push_str(&label);
            marks.push('|');
        } else {
            if pending > 1 {
                pending -= 1;
            } else {
                numbers.push(' ');
            }
            marks.push('.');
        }
    }
    let _ = writeln!(
        out,
        "{:<width$}{}",
        format!("t={}..{}", first.tick, last.tick),
        numbers.trim_end()
    );
    let _ = writeln!(out, "{:<width$}{}", "", marks);

    for (i, task) in tasks.iter().enumerate() {
        let row: String = trace
            .iter()
            .map(|rec| rec.mark(TaskId(i)).symbol())
            .collect();
        let _ = writeln!(out, "{:<width$}{}", task.name, row);
    }

    let cpu: String = trace
        .iter()
        .map(|rec| match rec.executed {
            Some(_) => TickMark::Running.symbol(),
            None => TickMark::Idle.symbol(),
        })
        .collect();
    let _ = writeln!(out, "{:<width$}{}", "cpu", cpu);

    out
}

/// Event log section printed under the chart.
pub fn render_events(events: &[SchedEvent]) -> String {
    let mut out = String::from("Recent events:\n");
    if events.is_empty() {
        out.push_str("  (none)\n");
    }
    for e in events {
        let _ = writeln!(out, "  {e}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{Algorithm, Scheduler};

    fn scenario_a(ticks: u64) -> Scheduler {
        let mut s = Scheduler::new(Algorithm::RateMonotonic);
        s.add_task("T1", 4, 1, None).unwrap();
        s.add_task("T2", 5, 2, None).unwrap();
        s.run_for(ticks);
        s
    }

    #[test]
    fn one_row_per_task_plus_ruler_and_cpu() {
        let s = scenario_a(20);
        let chart = render(&s.list_tasks(), &s.recent_trace(20));
        let lines: Vec<&str> = chart.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("t=0..19"));
        assert!(lines[2].starts_with("T1"));
        assert!(lines[3].starts_with("T2"));
        assert!(lines[4].starts_with("cpu"));
    }

    #[test]
    fn rows_match_the_execution_history() {
        let s = scenario_a(4);
        let chart = render(&s.list_tasks(), &s.recent_trace(4));
        let rows: Vec<String> = chart
            .lines()
            .skip(2)
            .map(|l| l.chars().skip(MIN_LABEL_WIDTH).collect())
            .collect();
        // t0: T1 runs, T2 released; t1-2: T2 runs; t3 idle
        assert_eq!(rows[0], "█···");
        assert_eq!(rows[1], "↑██·");
        assert_eq!(rows[2], "███·");
    }

    #[test]
    fn missed_deadline_is_marked() {
        let mut s = Scheduler::new(Algorithm::RateMonotonic);
        s.add_task("T1", 4, 2, None).unwrap();
        s.add_task("T2", 5, 3, None).unwrap();
        s.run_for(6);
        let chart = render(&s.list_tasks(), &s.recent_trace(6));
        assert!(chart.contains(TickMark::DeadlineHit.symbol()));
    }

    #[test]
    fn empty_trace_renders_placeholder() {
        assert_eq!(render(&[], &[]), "(no ticks executed yet)\n");
    }

    #[test]
    fn events_section_lists_each_event() {
        let s = scenario_a(2);
        let text = render_events(&s.recent_events(3));
        assert!(text.starts_with("Recent events:\n"));
        assert_eq!(text.lines().count(), 4);
        assert!(render_events(&[]).contains("(none)"));
    }
}
