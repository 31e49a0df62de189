// src/pipelines/gc.rs

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use rand::Rng;
use tracing::info;

use crate::components::{Concatenator, ratio, summation};
use crate::dag::{ProcessId, Workflow};
use crate::errors::{FlowError, Result};

/// Segment files expected under the base directory.
pub const SEGMENT_FILES: [&str; 2] = ["dna_segment_1", "dna_segment_2"];

const DEFAULT_CONCURRENCY: usize = 4;

/// Parameter ranges for the window variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum WindowMode {
    /// start 90..=110, count 50..=100
    #[default]
    Normal,
    /// count 10..=20: too few lines, so the ratio varies a lot between runs
    BreakCount,
    /// start 180..=185: leaves only a handful of non-empty lines
    BreakStart,
}

/// Parameter ranges for the prefix variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PrefixMode {
    /// both counts 1..=100
    #[default]
    Normal,
    /// count1 1..=10
    BreakCount1,
    /// count2 1..=10
    BreakCount2,
}

/// Read lines `start..=start+count` of each segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowParams {
    pub start: u32,
    pub count: u32,
}

impl WindowParams {
    pub fn draw<R: Rng + ?Sized>(mode: WindowMode, rng: &mut R) -> Self {
        let count = match mode {
            WindowMode::BreakCount => rng.gen_range(10..=20),
            _ => rng.gen_range(50..=100),
        };
        let start = match mode {
            WindowMode::BreakStart => rng.gen_range(180..=185),
            _ => rng.gen_range(90..=110),
        };
        Self { start, count }
    }
}

/// Read the first `count1` lines of segment 1 and `count2` lines of segment 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefixParams {
    pub count1: u32,
    pub count2: u32,
}

impl PrefixParams {
    pub fn draw<R: Rng + ?Sized>(mode: PrefixMode, rng: &mut R) -> Self {
        let count1 = match mode {
            PrefixMode::BreakCount1 => rng.gen_range(1..=10),
            _ => rng.gen_range(1..=100),
        };
        let count2 = match mode {
            PrefixMode::BreakCount2 => rng.gen_range(1..=10),
            _ => rng.gen_range(1..=100),
        };
        Self { count1, count2 }
    }
}

/// GC ratio over a window of lines shared by both segments.
///
/// Producers: `count` and `start`; every counter reads both.
pub fn gc_ratio_window(base_dir: &Path, params: WindowParams) -> Result<Workflow> {
    let dir = segment_dir(base_dir)?;
    info!(?params, base_dir = ?dir, "building window gc-ratio pipeline");
    let mut wf = Workflow::new("gc_ratio_wf", DEFAULT_CONCURRENCY)?;

    let count = number_producer(&mut wf, "count", params.count, "count.txt")?;
    let start = number_producer(&mut wf, "start", params.start, "start.txt")?;

    let lines = "sed -n $(cat {i:start}),$(($(cat {i:start}) + $(cat {i:count})))p";
    let counter = |wf: &mut Workflow, name: &str, segment: usize, chars: &str, out: &str| {
        let id = char_counter(wf, name, lines, &dir, segment, chars, out)?;
        wf.bind_input(id, "start", start, "start")?;
        wf.bind_input(id, "count", count, "count")?;
        Ok::<ProcessId, crate::errors::FlowError>(id)
    };

    let gc1 = counter(&mut wf, "gccount1", 0, "GC", "chry.fa.gccnt1")?;
    let gc2 = counter(&mut wf, "gccount2", 1, "GC", "chry.fa.gccnt2")?;
    let at1 = counter(&mut wf, "atcount1", 0, "AT", "chry.fa.atcnt1")?;
    let at2 = counter(&mut wf, "atcount2", 1, "AT", "chry.fa.atcnt2")?;

    fan_in_tail(&mut wf, [gc1, gc2], [at1, at2])?;
    Ok(wf)
}

/// GC ratio over a prefix of each segment, with independent lengths.
///
/// Producers: `count1` feeds the segment-1 counters, `count2` the segment-2
/// counters.
pub fn gc_ratio_prefix(base_dir: &Path, params: PrefixParams) -> Result<Workflow> {
    let dir = segment_dir(base_dir)?;
    info!(?params, base_dir = ?dir, "building prefix gc-ratio pipeline");
    let mut wf = Workflow::new("gc_ratio_wf", DEFAULT_CONCURRENCY)?;

    let count1 = number_producer(&mut wf, "count1", params.count1, "count1.txt")?;
    let count2 = number_producer(&mut wf, "count2", params.count2, "count2.txt")?;

    let lines = "sed -n 1,$(cat {i:count})p";
    let counter = |wf: &mut Workflow, name: &str, segment: usize, chars: &str, out: &str| {
        let id = char_counter(wf, name, lines, &dir, segment, chars, out)?;
        let producer = if segment == 0 { count1 } else { count2 };
        wf.bind_input(id, "count", producer, "count")?;
        Ok::<ProcessId, crate::errors::FlowError>(id)
    };

    let gc1 = counter(&mut wf, "gccount1", 0, "GC", "chry.fa.gccnt1")?;
    let gc2 = counter(&mut wf, "gccount2", 1, "GC", "chry.fa.gccnt2")?;
    let at1 = counter(&mut wf, "atcount1", 0, "AT", "chry.fa.atcnt1")?;
    let at2 = counter(&mut wf, "atcount2", 1, "AT", "chry.fa.atcnt2")?;

    fan_in_tail(&mut wf, [gc1, gc2], [at1, at2])?;
    Ok(wf)
}

/// Process writing a single integer to output `port` (named like the process
/// for `count`/`start`, `count` for the numbered producers).
fn number_producer(wf: &mut Workflow, name: &str, value: u32, path: &str) -> Result<ProcessId> {
    let port = if name.ends_with(char::is_numeric) { "count" } else { name };
    let id = wf.new_process(name, format!("echo {value} > {{o:{port}}}"))?;
    wf.declare_output(id, port, path)?;
    Ok(id)
}

/// Count `chars` in the selected lines of one segment file into output
/// `gccount` / `atcount`.
fn char_counter(
    wf: &mut Workflow,
    name: &str,
    select_lines: &str,
    base_dir: &Path,
    segment: usize,
    chars: &str,
    out_path: &str,
) -> Result<ProcessId> {
    let port = format!("{}count", chars.to_lowercase());
    let file = base_dir.join(SEGMENT_FILES[segment]);
    let cmd = format!(
        "{select_lines} {} | fold -w 1 | grep '[{chars}]' | wc -l | awk '{{ print $1 }}' > {{o:{port}}}",
        sh_quote(&file)
    );
    let id = wf.new_process(name, cmd)?;
    wf.declare_output(id, port, out_path)?;
    Ok(id)
}

/// Absolute form of `base_dir`, once both segment files are confirmed there.
///
/// Commands run inside the workflow's workdir, so a relative segment path
/// would silently point somewhere else, and a missing file only shows up as
/// a zero count.
fn segment_dir(base_dir: &Path) -> Result<PathBuf> {
    let dir = std::path::absolute(base_dir)?;
    for file in SEGMENT_FILES {
        let path = dir.join(file);
        if !path.is_file() {
            return Err(FlowError::Config(format!(
                "segment file {} not found",
                path.display()
            )));
        }
    }
    Ok(dir)
}

/// Single-quote `path` for `sh -c`.
fn sh_quote(path: &Path) -> String {
    format!("'{}'", path.display().to_string().replace('\'', r"'\''"))
}

/// Concatenate, sum and combine the counters into `gcratio.txt`.
fn fan_in_tail(wf: &mut Workflow, gc: [ProcessId; 2], at: [ProcessId; 2]) -> Result<ProcessId> {
    let gccat = Concatenator::new(wf, "gccat", "gccounts.txt")?;
    for id in gc {
        gccat.bind(wf, id, "gccount")?;
    }
    let atcat = Concatenator::new(wf, "atcat", "atcounts.txt")?;
    for id in at {
        atcat.bind(wf, id, "atcount")?;
    }

    let gcsum = summation(wf, "gcsum", gccat.id(), gccat.output_port(), "{i:in}.sum")?;
    let atsum = summation(wf, "atsum", atcat.id(), atcat.output_port(), "{i:in}.sum")?;

    ratio(wf, "gcratio", (gcsum, "sum"), (atsum, "sum"), "gcratio.txt")
}
