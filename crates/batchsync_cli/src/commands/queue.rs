//! Priority-queued execution of several configurations.
//!
//! The queue lives in the engine process, so the command enqueues every
//! entry and then waits for the dispatcher to drain it.

use console::style;
use uuid::Uuid;

use batchsync::Priority;
use batchsync::sync::RunStatus;

use super::OutputFormat;
use super::history::print_runs;
use super::run::cancel_quietly;
use super::shared::EngineSession;
use crate::shutdown::shutdown_requested;

/// A queue request parsed from `ID[:PRIORITY]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct QueueRequest {
    pub(crate) id: Uuid,
    /// Falls back to the configuration's own priority.
    pub(crate) priority: Option<Priority>,
}

impl std::str::FromStr for QueueRequest {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, priority) = match s.split_once(':') {
            Some((id, priority)) => (id, Some(priority.parse::<Priority>()?)),
            None => (s, None),
        };
        let id = id
            .parse::<Uuid>()
            .map_err(|e| format!("Invalid configuration id '{}': {}", id, e))?;
        Ok(Self { id, priority })
    }
}

/// Handle the queue command.
pub(crate) async fn handle_queue(
    session: EngineSession,
    requests: Vec<QueueRequest>,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let EngineSession { engine, reporter } = session;

    let mut queued = Vec::with_capacity(requests.len());
    for request in requests {
        let priority = match request.priority {
            Some(priority) => priority,
            None => engine
                .get_config(request.id)
                .map(|c| c.policy.priority)
                .unwrap_or_default(),
        };
        let position = engine.enqueue(request.id, priority)?;
        tracing::debug!(config_id = %request.id, %priority, position, "Enqueued");
        queued.push(request.id);
    }

    let snapshot = engine.get_queue_snapshot();
    let line = format!(
        "Queued {} configuration{}: {}",
        snapshot.len(),
        if snapshot.len() == 1 { "" } else { "s" },
        snapshot
            .iter()
            .map(|q| format!("#{} {} ({})", q.position, short(q.config_id), q.priority))
            .collect::<Vec<_>>()
            .join(", ")
    );
    match &reporter {
        Some(reporter) => reporter.println(line),
        None => println!("{}", line),
    }

    let mut interrupted = false;
    tokio::select! {
        () = engine.wait_until_idle() => {}
        () = shutdown_requested() => {
            interrupted = true;
            for running in engine.get_running_results() {
                cancel_quietly(&engine, running.batch_config_id).await;
            }
        }
    }

    if let Some(reporter) = &reporter {
        reporter.finish();
    }

    // Latest run per queued configuration, in queue order.
    let mut results = Vec::new();
    for id in &queued {
        if let Some(last) = engine.get_config(*id).and_then(|c| c.last_result().cloned())
            && !results.iter().any(|r: &batchsync::sync::BatchSyncResult| r.id == last.id)
        {
            results.push(last);
        }
    }
    if !results.is_empty() {
        print_runs(results.iter().rev(), output)?;
    }

    if interrupted {
        return Err("Interrupted; remaining queued syncs were not run".into());
    }
    if results.iter().any(|r| r.status == RunStatus::Failed) {
        println!("{} Some queued syncs failed", style("⚠").yellow().bold());
    }
    Ok(())
}

fn short(id: Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_only() {
        let id = Uuid::new_v4();
        let request: QueueRequest = id.to_string().parse().unwrap();
        assert_eq!(request, QueueRequest { id, priority: None });
    }

    #[test]
    fn test_parse_with_priority() {
        let id = Uuid::new_v4();
        let request: QueueRequest = format!("{}:high", id).parse().unwrap();
        assert_eq!(request.priority, Some(Priority::High));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!("not-a-uuid".parse::<QueueRequest>().is_err());
        let id = Uuid::new_v4();
        assert!(format!("{}:urgent", id).parse::<QueueRequest>().is_err());
    }
}
