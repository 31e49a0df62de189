//! Stub [`CommandExecutor`]s that never spawn a shell.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use filedag::dag::ScheduledProcess;
use filedag::exec::{CommandExecutor, ExecFuture};
use filedag::fs::FileSystem;

/// What a [`ScriptedExecutor`] does for one process.
#[derive(Debug, Clone)]
pub struct Script {
    pub exit_code: i32,
    /// Write every declared output before returning.
    pub write_outputs: bool,
    /// Contents written to each output; defaults to `<name>\n`.
    pub content: Option<String>,
    pub delay: Duration,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            exit_code: 0,
            write_outputs: true,
            content: None,
            delay: Duration::ZERO,
        }
    }
}

impl Script {
    pub fn fail(exit_code: i32) -> Self {
        Self {
            exit_code,
            write_outputs: false,
            ..Self::default()
        }
    }

    /// Exit 0 without producing any output.
    pub fn silent() -> Self {
        Self {
            write_outputs: false,
            ..Self::default()
        }
    }

    pub fn writing(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Executor with per-process behaviour.
///
/// - records the name of every process it was asked to run, in call order
/// - writes declared outputs through the given [`FileSystem`] (mock or real)
/// - processes without a script succeed and write their outputs
pub struct ScriptedExecutor {
    fs: Arc<dyn FileSystem>,
    scripts: HashMap<String, Script>,
    executed: Arc<Mutex<Vec<String>>>,
}

impl ScriptedExecutor {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            scripts: HashMap::new(),
            executed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_script(mut self, process: &str, script: Script) -> Self {
        self.scripts.insert(process.to_string(), script);
        self
    }

    /// Shared log of executed process names.
    pub fn executed(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.executed)
    }
}

impl CommandExecutor for ScriptedExecutor {
    fn execute<'a>(&'a self, process: &'a ScheduledProcess) -> ExecFuture<'a> {
        Box::pin(async move {
            self.executed.lock().unwrap().push(process.name.clone());

            let script = self.scripts.get(&process.name).cloned().unwrap_or_default();
            if !script.delay.is_zero() {
                tokio::time::sleep(script.delay).await;
            }

            if script.write_outputs {
                let content = script
                    .content
                    .clone()
                    .unwrap_or_else(|| format!("{}\n", process.name));
                for path in &process.outputs {
                    self.fs.write(path, content.as_bytes())?;
                }
            }

            Ok(script.exit_code)
        })
    }
}

/// Entry in a [`RecordingExecutor`]'s log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Start(String),
    Finish(String),
}

/// Succeeds after a short sleep, writing outputs, while tracking how many
/// processes are inside `execute` at once.
///
/// Starts and finishes share one log, so positions are comparable across
/// processes.
pub struct RecordingExecutor {
    fs: Arc<dyn FileSystem>,
    delay: Duration,
    current: AtomicUsize,
    peak: AtomicUsize,
    log: Mutex<Vec<Event>>,
}

impl RecordingExecutor {
    pub fn new(fs: Arc<dyn FileSystem>, delay: Duration) -> Self {
        Self {
            fs,
            delay,
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<Event> {
        self.log.lock().unwrap().clone()
    }

    pub fn started(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Start(n) => Some(n),
                Event::Finish(_) => None,
            })
            .collect()
    }

    pub fn finished(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Finish(n) => Some(n),
                Event::Start(_) => None,
            })
            .collect()
    }

    /// Position of `name`'s start in the combined log.
    pub fn start_index(&self, name: &str) -> Option<usize> {
        self.position(|e| matches!(e, Event::Start(n) if n == name))
    }

    /// Position of `name`'s finish in the combined log.
    pub fn finish_index(&self, name: &str) -> Option<usize> {
        self.position(|e| matches!(e, Event::Finish(n) if n == name))
    }

    fn position(&self, pred: impl Fn(&Event) -> bool) -> Option<usize> {
        self.log.lock().unwrap().iter().position(pred)
    }
}

impl CommandExecutor for RecordingExecutor {
    fn execute<'a>(&'a self, process: &'a ScheduledProcess) -> ExecFuture<'a> {
        Box::pin(async move {
            self.log.lock().unwrap().push(Event::Start(process.name.clone()));
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            tokio::time::sleep(self.delay).await;

            for path in &process.outputs {
                self.fs.write(path, process.name.as_bytes())?;
            }

            self.current.fetch_sub(1, Ordering::SeqCst);
            self.log.lock().unwrap().push(Event::Finish(process.name.clone()));
            Ok(0)
        })
    }
}

/// Always exits 0 and writes nothing.
#[derive(Debug, Default)]
pub struct NoOpExecutor;

impl CommandExecutor for NoOpExecutor {
    fn execute<'a>(&'a self, _process: &'a ScheduledProcess) -> ExecFuture<'a> {
        Box::pin(async { Ok(0) })
    }
}
