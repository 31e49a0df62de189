mod common;

use filedag::components::{Concatenator, ratio, summation};
use filedag::dag::Workflow;
use filedag::pipelines::{PrefixParams, WindowParams, gc_ratio_prefix, gc_ratio_window};
use filedag::types::{PortState, ProcessState, WorkflowState};
use tempfile::tempdir;

use common::{count_chars, init_tracing, read_trimmed, synthetic_segment, with_timeout, write_segments};

/// Two producers feed four counters, which fan in through two concatenators
/// and two summations to a final ratio, run through a real shell.
#[tokio::test]
async fn fan_in_scenario_produces_expected_ratio() {
    init_tracing();
    let dir = tempdir().unwrap();

    let mut wf = Workflow::new("scenario", 4).unwrap().with_workdir(dir.path());

    let mut producer = |name: &str, value: u32| {
        let id = wf
            .new_process(name, format!("echo {value} > {{o:n}}"))
            .unwrap();
        wf.declare_output(id, "n", format!("{name}.txt")).unwrap();
        id
    };
    let pa = producer("pa", 60);
    let pb = producer("pb", 100);

    // Each counter checks that its producer's file is there before writing.
    let mut counter = |name: &str, upstream, value: u32| {
        let id = wf
            .new_process(name, format!("test -s {{i:seed}} && echo {value} > {{o:n}}"))
            .unwrap();
        wf.declare_output(id, "n", format!("{name}.txt")).unwrap();
        wf.bind_input(id, "seed", upstream, "n").unwrap();
        id
    };
    let c1 = counter("c1", pa, 10);
    let c2 = counter("c2", pa, 15);
    let c3 = counter("c3", pb, 20);
    let c4 = counter("c4", pb, 25);

    let cat1 = Concatenator::new(&mut wf, "cat1", "cat1.txt").unwrap();
    cat1.bind(&mut wf, c1, "n").unwrap();
    cat1.bind(&mut wf, c3, "n").unwrap();
    let cat2 = Concatenator::new(&mut wf, "cat2", "cat2.txt").unwrap();
    cat2.bind(&mut wf, c2, "n").unwrap();
    cat2.bind(&mut wf, c4, "n").unwrap();

    let s1 = summation(&mut wf, "sum1", cat1.id(), "out", "{i:in}.sum").unwrap();
    let s2 = summation(&mut wf, "sum2", cat2.id(), "out", "{i:in}.sum").unwrap();
    ratio(&mut wf, "final", (s1, "sum"), (s2, "sum"), "final.txt").unwrap();

    let report = with_timeout(wf.run()).await.unwrap();

    assert_eq!(wf.state(), WorkflowState::Completed);
    assert_eq!(std::fs::read_to_string(dir.path().join("cat1.txt")).unwrap(), "10\n20\n");
    assert_eq!(std::fs::read_to_string(dir.path().join("cat2.txt")).unwrap(), "15\n25\n");
    assert_eq!(read_trimmed(&dir.path().join("cat1.txt.sum")), "30");
    assert_eq!(read_trimmed(&dir.path().join("cat2.txt.sum")), "40");
    assert_eq!(read_trimmed(&dir.path().join("final.txt")), "0.4285714286");

    for p in wf.processes() {
        assert_eq!(p.state(), ProcessState::Succeeded, "{}", p.name());
        for value in p.outputs() {
            assert_eq!(value.state(), PortState::Ready);
            assert_eq!(value.digest().map(str::len), Some(64));
        }
    }

    let sum = wf.port_value("sum1", "sum").unwrap();
    assert_eq!(sum.path().to_str(), Some("cat1.txt.sum"));

    // Producers are the only roots and dispatch first, in registration order.
    assert_eq!(&report.dispatch_order()[..2], &["pa", "pb"]);
    assert_eq!(report.succeeded().len(), 11);
    assert!(report.peak_concurrency() <= 4);
}

fn assert_ratio(path: &std::path::Path, gc: usize, at: usize) {
    let got: f64 = read_trimmed(path).parse().unwrap();
    let expected = gc as f64 / (gc + at) as f64;
    assert!((got - expected).abs() < 1e-9, "got {got}, expected {expected}");

    let text = read_trimmed(path);
    let decimals = text.split('.').nth(1).map(str::len);
    assert_eq!(decimals, Some(10));
}

#[tokio::test]
async fn window_pipeline_matches_direct_count() {
    init_tracing();
    let dir = tempdir().unwrap();
    let seg1 = synthetic_segment(1, 60, 40);
    let seg2 = synthetic_segment(2, 60, 40);
    write_segments(dir.path(), &seg1, &seg2);

    let params = WindowParams { start: 12, count: 20 };
    let mut wf = gc_ratio_window(dir.path(), params)
        .unwrap()
        .with_workdir(dir.path());
    with_timeout(wf.run()).await.unwrap();

    let (first, last) = (12, 32);
    let gc = count_chars(&seg1, first, last, &['G', 'C']) + count_chars(&seg2, first, last, &['G', 'C']);
    let at = count_chars(&seg1, first, last, &['A', 'T']) + count_chars(&seg2, first, last, &['A', 'T']);

    assert_eq!(read_trimmed(&dir.path().join("gccounts.txt.sum")), gc.to_string());
    assert_eq!(read_trimmed(&dir.path().join("atcounts.txt.sum")), at.to_string());
    assert_ratio(&dir.path().join("gcratio.txt"), gc, at);
}

#[tokio::test]
async fn prefix_pipeline_counts_each_segment_independently() {
    init_tracing();
    let dir = tempdir().unwrap();
    let seg1 = synthetic_segment(3, 30, 25);
    let seg2 = synthetic_segment(4, 30, 25);
    write_segments(dir.path(), &seg1, &seg2);

    let mut wf = gc_ratio_prefix(dir.path(), PrefixParams { count1: 5, count2: 17 })
        .unwrap()
        .with_workdir(dir.path());
    with_timeout(wf.run()).await.unwrap();

    let gc1 = count_chars(&seg1, 1, 5, &['G', 'C']);
    let gc2 = count_chars(&seg2, 1, 17, &['G', 'C']);
    assert_eq!(read_trimmed(&dir.path().join("chry.fa.gccnt1")), gc1.to_string());
    assert_eq!(read_trimmed(&dir.path().join("chry.fa.gccnt2")), gc2.to_string());

    let at = count_chars(&seg1, 1, 5, &['A', 'T']) + count_chars(&seg2, 1, 17, &['A', 'T']);
    assert_ratio(&dir.path().join("gcratio.txt"), gc1 + gc2, at);
}

#[tokio::test]
async fn concatenation_is_byte_exact_and_ordered() {
    init_tracing();
    let dir = tempdir().unwrap();
    let mut wf = Workflow::new("concat", 2).unwrap().with_workdir(dir.path());

    let a = wf.new_process("a", "printf 'no newline' > {o:out}").unwrap();
    wf.declare_output(a, "out", "a.bin").unwrap();
    let b = wf.new_process("b", "printf 'two\\nlines\\n' > {o:out}").unwrap();
    wf.declare_output(b, "out", "b.bin").unwrap();

    let cat = Concatenator::new(&mut wf, "cat", "ab.bin").unwrap();
    cat.bind(&mut wf, a, "out").unwrap();
    cat.bind(&mut wf, b, "out").unwrap();

    with_timeout(wf.run()).await.unwrap();
    assert_eq!(
        std::fs::read(dir.path().join("ab.bin")).unwrap(),
        b"no newlinetwo\nlines\n"
    );
}

#[tokio::test]
async fn concatenation_handles_spaces_in_paths() {
    init_tracing();
    let root = tempdir().unwrap();
    let workdir = root.path().join("work dir");
    let mut wf = Workflow::new("spaces", 2).unwrap().with_workdir(&workdir);

    let a = wf.new_process("a", "echo one > \"{o:out}\"").unwrap();
    wf.declare_output(a, "out", "part a.txt").unwrap();
    let b = wf.new_process("b", "echo two > \"{o:out}\"").unwrap();
    wf.declare_output(b, "out", "part b.txt").unwrap();

    let cat = Concatenator::new(&mut wf, "cat", "all parts.txt").unwrap();
    cat.bind(&mut wf, a, "out").unwrap();
    cat.bind(&mut wf, b, "out").unwrap();

    with_timeout(wf.run()).await.unwrap();
    assert_eq!(
        std::fs::read_to_string(workdir.join("all parts.txt")).unwrap(),
        "one\ntwo\n"
    );
}

#[tokio::test]
async fn window_pipeline_reads_segments_from_a_directory_with_spaces() {
    init_tracing();
    let root = tempdir().unwrap();
    let data = root.path().join("dna data");
    std::fs::create_dir(&data).unwrap();
    let seg1 = synthetic_segment(5, 20, 10);
    let seg2 = synthetic_segment(6, 20, 10);
    write_segments(&data, &seg1, &seg2);

    let mut wf = gc_ratio_window(&data, WindowParams { start: 2, count: 5 })
        .unwrap()
        .with_workdir(root.path().join("out"));
    with_timeout(wf.run()).await.unwrap();

    let gc1 = count_chars(&seg1, 2, 7, &['G', 'C']);
    assert_eq!(
        read_trimmed(&root.path().join("out").join("chry.fa.gccnt1")),
        gc1.to_string()
    );
}
