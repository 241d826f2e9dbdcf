//! Parallel compiler execution
//!
//! Workers drain one shared queue. The first failing compile sets the shared
//! cancel flag, after which no worker starts a new process; processes that
//! are already running finish normally.

use std::collections::VecDeque;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::command::CompilerInvocation;

/// A queued permutation and the commands that build it
#[derive(Debug, Clone)]
pub struct CompileTask {
    pub file_name: String,
    /// Empty for shader libraries
    pub entry_point: String,
    /// Defines as passed to the compiler, joined by spaces
    pub defines: String,
    pub commands: Vec<CompilerInvocation>,
}

/// A task whose compiler exited with an error (or never started)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileFailure {
    pub file_name: String,
    pub entry_point: String,
    pub defines: String,
    /// Compiler stdout followed by stderr
    pub output: String,
}

/// Outcome of an [`Executor::run`]
#[derive(Debug, Default)]
pub struct ExecutionReport {
    /// Tasks a worker picked up
    pub started: usize,
    pub failures: Vec<CompileFailure>,
    /// Set when the run was cut short by a failure or an interrupt
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl ExecutionReport {
    pub fn succeeded(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }
}

/// State shared between workers
struct Shared {
    queue: Mutex<VecDeque<CompileTask>>,
    failures: Mutex<Vec<CompileFailure>>,
    /// Serializes progress lines so a line and its output stay together
    report: Mutex<()>,
    /// Held only around process creation
    spawn: Mutex<()>,
    started: Mutex<usize>,
    initial: usize,
    cancel: Arc<AtomicBool>,
    verbose: bool,
}

/// Runs compile tasks on a fixed number of workers
pub struct Executor {
    workers: usize,
    verbose: bool,
    cancel: Arc<AtomicBool>,
}

impl Executor {
    /// `cancel` is shared with the interrupt handler.
    pub fn new(workers: usize, verbose: bool, cancel: Arc<AtomicBool>) -> Self {
        Self {
            workers: workers.max(1),
            verbose,
            cancel,
        }
    }

    /// Run every task, stopping early on the first failure.
    pub fn run(&self, tasks: Vec<CompileTask>) -> Result<ExecutionReport> {
        let start = Instant::now();
        let initial = tasks.len();
        let workers = self.workers.min(initial.max(1));

        println!("{}", format_banner(initial, self.workers));

        let shared = Shared {
            queue: Mutex::new(tasks.into()),
            failures: Mutex::new(Vec::new()),
            report: Mutex::new(()),
            spawn: Mutex::new(()),
            started: Mutex::new(0),
            initial,
            cancel: Arc::clone(&self.cancel),
            verbose: self.verbose,
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("shader-make-worker-{}", i))
            .build()
            .context("Failed to create compiler worker pool")?;

        pool.scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|_| worker(&shared));
            }
        });

        let elapsed = start.elapsed();
        let failures = shared.failures.into_inner().unwrap_or_else(PoisonError::into_inner);
        let started = shared.started.into_inner().unwrap_or_else(PoisonError::into_inner);
        let cancelled = self.cancel.load(Ordering::SeqCst);

        println!("{}", format_summary(elapsed, initial, failures.len()));

        Ok(ExecutionReport {
            started,
            failures,
            cancelled,
            elapsed,
        })
    }
}

/// Lock, ignoring poison left by a panicked worker.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Reports the configured pool size, which may exceed the number of tasks.
pub fn format_banner(initial: usize, workers: usize) -> String {
    format!("Compiling {} shaders in {} threads...", initial, workers)
}

/// Timing line followed by the error count, printed even when it is zero
pub fn format_summary(elapsed: Duration, initial: usize, errors: usize) -> String {
    let seconds = elapsed.as_secs_f64();
    format!(
        "Processing time: {:.1} seconds, {:.2} seconds per shader\nErrors: {}",
        seconds,
        seconds / initial.max(1) as f64,
        errors
    )
}

/// `[ 42.5%]`
pub fn format_progress(initial: usize, remaining: usize) -> String {
    let percent = if initial == 0 {
        100.0
    } else {
        (initial - remaining) as f64 * 100.0 / initial as f64
    };
    format!("[{:5.1}%]", percent)
}

/// `[ 42.5%]    dxc : OK   a.hlsl:main A=1`
pub fn format_report_line(progress: &str, compiler: &str, ok: bool, task: &CompileTask) -> String {
    format!(
        "{} {:>6} : {} {}:{} {}",
        progress,
        compiler,
        if ok { " OK  " } else { "FAIL " },
        task.file_name,
        task.entry_point,
        task.defines
    )
}

fn worker(shared: &Shared) {
    loop {
        if shared.cancel.load(Ordering::SeqCst) {
            return;
        }

        let (task, remaining) = {
            let mut queue = lock(&shared.queue);
            let remaining = queue.len();
            match queue.pop_front() {
                Some(task) => (task, remaining),
                None => return,
            }
        };
        *lock(&shared.started) += 1;

        let progress = format_progress(shared.initial, remaining);
        for invocation in &task.commands {
            if shared.cancel.load(Ordering::SeqCst) {
                return;
            }
            let (ok, output) = execute(shared, invocation);

            {
                let _report = lock(&shared.report);
                println!(
                    "{}",
                    format_report_line(&progress, &invocation.display_name(), ok, &task)
                );
            }

            if !ok {
                lock(&shared.failures).push(CompileFailure {
                    file_name: task.file_name.clone(),
                    entry_point: task.entry_point.clone(),
                    defines: task.defines.clone(),
                    output,
                });
                shared.cancel.store(true, Ordering::SeqCst);
                return;
            }
        }
    }
}

/// Run one compiler process; returns success and combined output.
fn execute(shared: &Shared, invocation: &CompilerInvocation) -> (bool, String) {
    let child = {
        let _spawn = lock(&shared.spawn);
        if shared.verbose {
            println!("{}", invocation.command_line());
        }
        Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
    };

    let child = match child {
        Ok(child) => child,
        Err(e) => {
            return (
                false,
                format!("failed to start {}: {}", invocation.program.display(), e),
            );
        }
    };

    match child.wait_with_output() {
        Ok(output) => {
            let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
            text.push_str(&String::from_utf8_lossy(&output.stderr));
            (output.status.success(), text)
        }
        Err(e) => (
            false,
            format!("failed to wait for {}: {}", invocation.program.display(), e),
        ),
    }
}
