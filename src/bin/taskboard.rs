//! Task-runner dashboard.
//!
//! Exposes the repository's build tasks over HTTP so they can be launched
//! from a browser. Only the tasks in the fixed allow-list can run, one at a
//! time, each spawned as `task <name>` without a shell.
//!
//! Standalone tool, not part of the authenticated API surface.

use anyhow::{Context, Result};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};
use tokio::{net::TcpListener, process::Command};
use tracing::info;

const DEFAULT_PORT: u16 = 5050;

#[derive(Serialize)]
struct TaskEntry {
    name: &'static str,
    label: &'static str,
    description: &'static str,
}

const TASKS: &[TaskEntry] = &[
    TaskEntry {
        name: "fmt",
        label: "Format (rustfmt)",
        description: "Checks source formatting",
    },
    TaskEntry {
        name: "lint",
        label: "Lint (clippy)",
        description: "Lints with warnings denied",
    },
    TaskEntry {
        name: "test",
        label: "Tests",
        description: "Unit and integration tests",
    },
    TaskEntry {
        name: "audit",
        label: "Audit (cargo-audit)",
        description: "Scans dependencies for advisories",
    },
    TaskEntry {
        name: "build",
        label: "Build (release)",
        description: "Release build of all binaries",
    },
];

fn find_task(name: &str) -> Option<&'static TaskEntry> {
    TASKS.iter().find(|entry| entry.name == name)
}

/// One run at a time. The slot is released when the guard drops, on every
/// exit path.
#[derive(Clone, Default)]
struct Taskboard {
    running: Arc<AtomicBool>,
}

struct RunSlot(Arc<AtomicBool>);

impl Taskboard {
    fn try_claim(&self) -> Option<RunSlot> {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| RunSlot(Arc::clone(&self.running)))
    }
}

impl Drop for RunSlot {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Deserialize)]
struct RunRequest {
    task: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunResponse {
    task: &'static str,
    exit_code: Option<i32>,
    duration_ms: u64,
    stdout: String,
    stderr: String,
}

async fn list_tasks() -> Json<serde_json::Value> {
    Json(json!({ "tasks": TASKS }))
}

async fn run_task(
    Extension(board): Extension<Taskboard>,
    payload: Option<Json<RunRequest>>,
) -> Response {
    let Some(Json(payload)) = payload else {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "Missing payload"}))).into_response();
    };

    let Some(entry) = find_task(&payload.task) else {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "unknown task"}))).into_response();
    };

    let Some(_slot) = board.try_claim() else {
        return (StatusCode::CONFLICT, Json(json!({"error": "busy"}))).into_response();
    };

    info!("Running task {}", entry.name);

    let started = Instant::now();

    let output = match Command::new("task")
        .arg(entry.name)
        .kill_on_drop(true)
        .output()
        .await
    {
        Ok(output) => output,
        Err(err) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": format!("Failed to spawn task runner: {err}")})),
            )
                .into_response();
        }
    };

    let response = RunResponse {
        task: entry.name,
        exit_code: output.status.code(),
        duration_ms: started.elapsed().as_millis().try_into().unwrap_or(u64::MAX),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    Json(response).into_response()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let port = std::env::var("TASKBOARD_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);

    let app = Router::new()
        .route("/api/tasks", get(list_tasks))
        .route("/api/run", post(run_task))
        .layer(Extension(Taskboard::default()));

    let listener = TcpListener::bind(format!("::0:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Taskboard listening on [::]:{}", port);

    axum::serve(listener, app)
        .await
        .context("Failed to start taskboard")?;

    Ok(())
}
