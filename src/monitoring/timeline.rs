//! Execution Timeline
//!
//! Rebuilds step start/end times from the records of an execution for
//! timing reports and Gantt charts.

use chrono::{DateTime, Utc};

use crate::execution::StepRecord;

/// Type of timeline event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    /// Step started executing
    Started,
    /// Step completed successfully
    Completed,
    /// Step failed
    Failed,
}

/// A single event in the execution timeline.
#[derive(Debug, Clone)]
pub struct TimelineEvent {
    /// Position of the step in the plan
    pub step_index: usize,
    /// Label shown in the chart
    pub label: String,
    /// Type of event
    pub event_type: EventType,
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
}

/// Timeline of one execution, ordered by timestamp.
#[derive(Debug, Clone, Default)]
pub struct ExecutionTimeline {
    events: Vec<TimelineEvent>,
}

impl ExecutionTimeline {
    /// Builds the timeline from step records.
    pub fn from_records(records: &[StepRecord]) -> Self {
        let mut events = Vec::with_capacity(records.len() * 2);

        for (index, record) in records.iter().enumerate() {
            let label = format!("{}:{}", index + 1, record.action);
            let finished = if record.is_success() {
                EventType::Completed
            } else {
                EventType::Failed
            };

            events.push(TimelineEvent {
                step_index: index,
                label: label.clone(),
                event_type: EventType::Started,
                timestamp: record.start_time,
            });
            events.push(TimelineEvent {
                step_index: index,
                label,
                event_type: finished,
                timestamp: record.end_time,
            });
        }

        // Stable sort keeps a zero-length step's start before its end.
        events.sort_by_key(|e| e.timestamp);

        Self { events }
    }

    /// Returns all events.
    pub fn get_events(&self) -> &[TimelineEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Wall-clock span from the earliest start to the latest end.
    pub fn elapsed(&self) -> std::time::Duration {
        match (self.events.first(), self.events.last()) {
            (Some(first), Some(last)) => (last.timestamp - first.timestamp)
                .to_std()
                .unwrap_or_default(),
            _ => std::time::Duration::ZERO,
        }
    }

    /// Returns `(label, start offset ms, end offset ms, failed)` per step, in plan order.
    fn spans(&self) -> Vec<(String, i64, i64, bool)> {
        let Some(origin) = self.events.first().map(|e| e.timestamp) else {
            return Vec::new();
        };

        let steps = self.events.iter().map(|e| e.step_index).max().map_or(0, |m| m + 1);
        let mut spans = vec![(String::new(), 0, 0, false); steps];

        for event in &self.events {
            let offset = (event.timestamp - origin).num_milliseconds();
            let span = &mut spans[event.step_index];

            match event.event_type {
                EventType::Started => {
                    span.0 = event.label.clone();
                    span.1 = offset;
                }
                EventType::Completed => span.2 = offset,
                EventType::Failed => {
                    span.2 = offset;
                    span.3 = true;
                }
            }
        }

        spans
    }

    /// Generates an ASCII Gantt chart representation.
    ///
    /// Each step is shown as a bar indicating when it ran relative to the
    /// whole execution. Failed steps are drawn with `x`.
    pub fn gantt_chart(&self) -> String {
        let mut output = String::from("\nExecution Timeline:\n\n");

        let total_time = self.elapsed().as_millis();
        let spans = self.spans();

        if spans.is_empty() {
            return output;
        }

        // Scale to 50 characters width
        let scale = 50.0 / total_time.max(1) as f64;

        for (label, start, end, failed) in spans {
            let start_pos = (start as f64 * scale) as usize;
            let width = ((end - start) as f64 * scale).max(1.0) as usize;
            let fill = if failed { "x" } else { "#" };

            let mut bar = " ".repeat(start_pos);
            bar.push_str(&fill.repeat(width));

            output.push_str(&format!(
                "{:16} |{:<51}| ({} ms)\n",
                truncate(&label, 16),
                bar,
                end - start
            ));
        }

        output.push_str(&format!("\nTotal: {} ms\n", total_time));
        output
    }
}

/// Truncates a string to a maximum length.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
