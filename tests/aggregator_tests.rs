use pretty_assertions::assert_eq;
use rtrace_timeline::aggregator::{
    compute_activity, compute_lifetimes, compute_totals, ActivityOptions, Aggregator, FreeOutcome,
    Lifetime, LifetimeOptions, ReportOutcome, ResourceIndex,
};
use rtrace_timeline::filter::{Filter, FilterChain};
use rtrace_timeline::report::{Point, ReportDocument};
use rtrace_timeline::trace::{Event, Timestamp, TraceData};

fn ts(ms: u64) -> Timestamp {
    Timestamp::from_millis(ms)
}

/// Contexts a=0x1 and b=0x2, X opened in a and freed, Y opened in b
fn two_context_trace() -> TraceData {
    let mut trace = TraceData::new();
    trace.register_resource("memory");
    trace.register_context(0x1, "a");
    trace.register_context(0x2, "b");
    trace.register_free(3, 0x1, ts(10), None, "X").unwrap();
    trace.register_alloc(2, 0x2, ts(5), None, "Y", 50).unwrap();
    trace.register_alloc(1, 0x1, ts(0), None, "X", 100).unwrap();
    trace.sort();
    trace
}

#[test]
fn test_totals_context_scenario() {
    let trace = two_context_trace();
    let report = compute_totals(&trace, &mut FilterChain::new()).unwrap();
    let memory = &report.resources[0];

    let a = memory.series_for("a").unwrap();
    assert_eq!(a.points, vec![Point::new(0, 100), Point::new(10, 0)]);
    assert_eq!(a.points.last().unwrap().y, 0);

    assert_eq!(memory.stats.peak_leaks.size, 150);
    assert_eq!(memory.stats.peak_timestamp, ts(5));
}

#[test]
fn test_totals_idempotent() {
    let trace = two_context_trace();
    let first = compute_totals(&trace, &mut FilterChain::new()).unwrap();
    let second = compute_totals(&trace, &mut FilterChain::new()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_index_open_entries() {
    // N allocations and M frees of one id leave N - M references
    for (allocs, frees) in [(1, 0), (3, 1), (3, 3), (2, 5)] {
        let events: Vec<Event> = (0..allocs)
            .map(|i| Event::alloc(i, 0, ts(i), "Z", 8))
            .chain((0..frees).map(|i| Event::free(100 + i, 0, ts(100 + i), "Z")))
            .collect();

        let mut index = ResourceIndex::new();
        for event in &events {
            if event.is_alloc() {
                index.on_alloc(event);
            } else {
                index.on_free(event);
            }
        }
        let expected = allocs.saturating_sub(frees) as u32;
        assert_eq!(index.ref_count("Z").unwrap_or(0), expected, "{} allocs, {} frees", allocs, frees);
    }
}

#[test]
fn test_index_refcount_scenario() {
    let first = Event::alloc(1, 0, ts(0), "Z", 16);
    let second = Event::alloc(2, 0, ts(1), "Z", 32);
    let free = Event::free(3, 0, ts(2), "Z");

    let mut index = ResourceIndex::new();
    index.on_alloc(&first);
    index.on_alloc(&second);
    assert_eq!(index.ref_count("Z"), Some(2));
    assert!(matches!(index.on_free(&free), FreeOutcome::Absorbed));
    assert_eq!(index.ref_count("Z"), Some(1));
}

#[test]
fn test_lifetime_open_interval_scenario() {
    let mut trace = TraceData::new();
    trace.register_resource("memory");
    trace.register_alloc(1, 0, ts(0), None, "Z", 16).unwrap();
    trace.register_alloc(2, 0, ts(1), None, "Z", 32).unwrap();
    trace.register_free(3, 0, ts(2), None, "Z").unwrap();
    trace.sort();

    let report = compute_lifetimes(&trace, &mut FilterChain::new(), &LifetimeOptions::default())
        .unwrap();
    let lifetimes: Vec<Lifetime> = report.resources[0].lifetimes().copied().collect();
    assert_eq!(
        lifetimes,
        vec![Lifetime {
            start: ts(0),
            end: ts(2),
            size: 16
        }]
    );
}

#[test]
fn test_lifetime_pagination_order() {
    let mut trace = TraceData::new();
    trace.register_resource("memory");
    for i in 0..7u64 {
        let id = format!("0x{:x}", i);
        trace.register_alloc(i * 2, 0, ts(i * 10), None, id.as_str(), i).unwrap();
        trace.register_free(i * 2 + 1, 0, ts(i * 10 + 5), None, id.as_str()).unwrap();
    }
    trace.sort();

    let options = LifetimeOptions::default().with_page_capacity(3);
    let report = compute_lifetimes(&trace, &mut FilterChain::new(), &options).unwrap();
    let pager = &report.resources[0].pager;
    assert_eq!(pager.page_count(), 3);

    let sizes: Vec<u64> = pager.pages().iter().flatten().map(|l| l.size).collect();
    assert_eq!(sizes, (0..7).collect::<Vec<_>>());
}

#[test]
fn test_size_filter_passes_frees() {
    let free = Event::free(1, 0, ts(0), "X");
    let mut filter = Filter::MinSize(100);
    assert!(filter.matches(&free));

    // the free of a small block still passes and stays unmatched
    let mut trace = TraceData::new();
    trace.register_resource("memory");
    trace.register_alloc(1, 0, ts(0), None, "small", 10).unwrap();
    trace.register_alloc(2, 0, ts(1), None, "big", 200).unwrap();
    trace.register_free(3, 0, ts(2), None, "small").unwrap();
    trace.sort();

    let mut filters = FilterChain::new().with(Filter::MinSize(100));
    let report = compute_totals(&trace, &mut filters).unwrap();
    assert_eq!(report.resources[0].stats.end_leaks.size, 200);
}

#[test]
fn test_activity_points_cover_range() {
    let mut trace = TraceData::new();
    trace.register_resource("memory");
    for i in 0..=20u64 {
        trace.register_alloc(i, 0, ts(i * 50), None, format!("{}", i).as_str(), 10).unwrap();
    }
    trace.sort();

    let options = ActivityOptions { slice: Some(100) };
    let report = compute_activity(&trace, &mut FilterChain::new(), &options).unwrap();
    let points = &report.resources[0].contexts[0].points;

    // range 1000, step 50
    let covered = points.iter().filter(|p| p.timestamp <= ts(1000)).count();
    assert_eq!(covered, 1000 / 50 + 1);
    let last = points.last().unwrap();
    assert_eq!((last.total, last.allocs, last.frees), (0, 0, 0));
}

#[test]
fn test_offset_filter_anchors_on_first_event() {
    let mut trace = TraceData::new();
    trace.register_resource("memory");
    trace.register_alloc(1, 0, ts(1000), None, "A", 10).unwrap();
    trace.register_alloc(2, 0, ts(1200), None, "B", 20).unwrap();
    trace.register_alloc(3, 0, ts(1600), None, "C", 40).unwrap();
    trace.sort();

    let mut filters = FilterChain::new().with(Filter::max_time_offset(300));
    let report = compute_totals(&trace, &mut filters).unwrap();
    assert_eq!(report.resources[0].stats.end_leaks.size, 30);
    assert_eq!(report.x_range, (ts(1000), ts(1200)));
}

#[test]
fn test_aggregator_no_matching_events() {
    let trace = two_context_trace();
    for aggregator in [
        Aggregator::Totals,
        Aggregator::Lifetime(LifetimeOptions::default()),
        Aggregator::Activity(ActivityOptions::default()),
    ] {
        let mut doc = ReportDocument::new(aggregator.kind().as_str());
        let mut filters = FilterChain::new().with(Filter::MaxTime(ts(0))).with(Filter::MinTime(ts(1)));
        let outcome = aggregator.write_report(&trace, &mut filters, &mut doc).unwrap();
        assert_eq!(outcome, ReportOutcome::NoMatchingEvents);
        assert!(doc.is_empty());
    }
}
