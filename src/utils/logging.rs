use lazy_static::lazy_static;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::Level;
use tracing_subscriber::{EnvFilter, prelude::*};
use tracing_timing::{Builder, Histogram};
use std::collections::HashMap;
use std::sync::Arc;
use parking_lot::RwLock;
use std::time::{Duration, Instant};
use std::cell::RefCell;

// Categories for the operations worth timing
#[derive(Hash, Eq, PartialEq, Clone, Debug)]
pub enum OperationCategory {
    FeedIngest {
        subcategory: FeedIngestType,
    },
    Geolocation,
    NearestSearch,
    Viewport,
    Export,
    Other,
}

#[derive(Hash, Eq, PartialEq, Clone, Debug)]
pub enum FeedIngestType {
    Fetch,
    Parse,
    Other,
}

impl OperationCategory {
    pub fn as_str(&self) -> String {
        match self {
            OperationCategory::FeedIngest { subcategory } => {
                format!("Feed Ingest - {}", match subcategory {
                    FeedIngestType::Fetch => "Fetch",
                    FeedIngestType::Parse => "Parse",
                    FeedIngestType::Other => "Other",
                })
            },
            OperationCategory::Geolocation => "Geolocation".to_string(),
            OperationCategory::NearestSearch => "Nearest Search".to_string(),
            OperationCategory::Viewport => "Viewport".to_string(),
            OperationCategory::Export => "Export".to_string(),
            OperationCategory::Other => "Other Operations".to_string(),
        }
    }
}

// Only synchronous guards live on this stack. A guard held across an await would
// interleave with other tasks on the same thread and pop their entries.
thread_local! {
    static TIMING_STACK: RefCell<Vec<String>> = RefCell::new(Vec::new());
}

lazy_static! {
    static ref TIMING_ENABLED: AtomicBool = AtomicBool::new(false);
    static ref FUNCTION_TIMINGS: Arc<RwLock<HashMap<String, Histogram<u64>>>> = Arc::new(RwLock::new(HashMap::new()));
    static ref CATEGORY_TIMINGS: Arc<RwLock<HashMap<OperationCategory, Histogram<u64>>>> = Arc::new(RwLock::new(HashMap::new()));
    static ref HIERARCHICAL_TIMINGS: Arc<RwLock<HashMap<String, (Duration, usize, Vec<String>)>>> = Arc::new(RwLock::new(HashMap::new()));
}

// One hour in nanoseconds, the longest duration a histogram accepts
const HISTOGRAM_MAX_NS: u64 = 3_600_000_000_000;

pub struct TimingGuard {
    function_name: String,
    category: OperationCategory,
    start: Instant,
    parent: Option<String>,
    on_stack: bool,
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        if self.on_stack {
            TIMING_STACK.with(|stack| {
                stack.borrow_mut().pop();
            });
        }
        let duration = self.start.elapsed();
        record_timing_end(&self.function_name, duration, &self.category, self.parent.take());
    }
}

/// Times a synchronous scope. The innermost enclosing synchronous scope is
/// recorded as its caller.
pub fn start_timing(function_name: &str, category: OperationCategory) -> TimingGuard {
    let parent = TIMING_STACK.with(|stack| {
        let mut stack = stack.borrow_mut();
        let parent = stack.last().cloned();
        stack.push(function_name.to_string());
        parent
    });

    TimingGuard {
        function_name: function_name.to_string(),
        category,
        start: Instant::now(),
        parent,
        on_stack: true,
    }
}

/// Times a scope that spans `.await` points. It is kept off the caller stack and
/// records no caller.
pub fn start_async_timing(function_name: &str, category: OperationCategory) -> TimingGuard {
    TimingGuard {
        function_name: function_name.to_string(),
        category,
        start: Instant::now(),
        parent: None,
        on_stack: false,
    }
}

fn new_histogram() -> Option<Histogram<u64>> {
    Histogram::<u64>::new_with_bounds(1, HISTOGRAM_MAX_NS, 3).ok()
}

fn record_timing_end(function_name: &str, duration: Duration, category: &OperationCategory, parent: Option<String>) {
    if !is_timing_enabled() {
        return;
    }

    let duration_ns = (duration.as_nanos() as u64).clamp(1, HISTOGRAM_MAX_NS);

    {
        let mut hierarchical = HIERARCHICAL_TIMINGS.write();
        let entry = hierarchical
            .entry(function_name.to_string())
            .or_insert((Duration::from_nanos(0), 0, Vec::new()));

        entry.0 += duration;
        entry.1 += 1;

        if let Some(parent_name) = parent {
            if !entry.2.contains(&parent_name) {
                entry.2.push(parent_name);
            }
        }
    }

    {
        let mut timings = FUNCTION_TIMINGS.write();
        if !timings.contains_key(function_name) {
            if let Some(histogram) = new_histogram() {
                timings.insert(function_name.to_string(), histogram);
            }
        }
        if let Some(histogram) = timings.get_mut(function_name) {
            let _ = histogram.record(duration_ns);
        }
    }

    {
        let mut category_timings = CATEGORY_TIMINGS.write();
        if !category_timings.contains_key(category) {
            if let Some(histogram) = new_histogram() {
                category_timings.insert(category.clone(), histogram);
            }
        }
        if let Some(histogram) = category_timings.get_mut(category) {
            let _ = histogram.record(duration_ns);
        }
    }
}

pub fn init_logging(enable_timing: bool) {
    TIMING_ENABLED.store(enable_timing, Ordering::SeqCst);

    let env_filter = EnvFilter::from_default_env()
        .add_directive(Level::INFO.into())
        .add_directive("masjidmap=debug".parse().expect("static directive"));

    if enable_timing {
        let histogram = || {
            Histogram::<u64>::new_with_bounds(1, HISTOGRAM_MAX_NS, 3).expect("static histogram bounds")
        };

        let timing_layer = Builder::default().layer(histogram);

        let subscriber = tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .with(timing_layer.boxed());

        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set up tracing subscriber");
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set up tracing subscriber");
    }
}

pub fn set_timing_enabled(enabled: bool) {
    TIMING_ENABLED.store(enabled, Ordering::SeqCst);
}

pub fn is_timing_enabled() -> bool {
    TIMING_ENABLED.load(Ordering::SeqCst)
}

/// Number of recorded calls for a timed function.
pub fn recorded_calls(function_name: &str) -> usize {
    HIERARCHICAL_TIMINGS
        .read()
        .get(function_name)
        .map(|(_, count, _)| *count)
        .unwrap_or(0)
}

/// Callers recorded for a timed function, in first-seen order.
pub fn recorded_parents(function_name: &str) -> Vec<String> {
    HIERARCHICAL_TIMINGS
        .read()
        .get(function_name)
        .map(|(_, _, parents)| parents.clone())
        .unwrap_or_default()
}

pub fn print_timing_report() {
    if !is_timing_enabled() {
        return;
    }

    println!("\nPerformance Report");
    println!("==================");

    println!("\nHierarchical Timing Analysis:");
    println!("-----------------------------");
    let hierarchical = HIERARCHICAL_TIMINGS.read();
    let mut entries: Vec<_> = hierarchical.iter().collect();
    entries.sort_by(|a, b| b.1.0.cmp(&a.1.0));

    for (function_name, (total_duration, count, parents)) in entries {
        let avg_duration = total_duration.div_f64(*count as f64);
        println!(
            "{}: total={:.3}s, count={}, avg={:.3}ms{}",
            function_name,
            total_duration.as_secs_f64(),
            count,
            avg_duration.as_secs_f64() * 1000.0,
            if !parents.is_empty() {
                format!("\n  Called by: {}", parents.join(", "))
            } else {
                String::new()
            }
        );
    }

    println!("\nPerformance by Category:");
    println!("------------------------");
    let category_timings = CATEGORY_TIMINGS.read();
    let mut category_vec: Vec<_> = category_timings.iter().collect();
    category_vec.sort_by(|a, b| b.1.mean().total_cmp(&a.1.mean()));

    let total_time: f64 = category_vec.iter()
        .map(|(_, hist)| hist.mean() * (hist.len() as f64))
        .sum();

    for (category, histogram) in category_vec {
        let category_total = histogram.mean() * (histogram.len() as f64);
        let percentage = if total_time > 0.0 { (category_total / total_time) * 100.0 } else { 0.0 };
        println!(
            "{}: {:.1}% of total time\n  mean={:.3}ms, p95={:.3}ms, count={}",
            category.as_str(),
            percentage,
            histogram.mean() / 1_000_000.0,
            histogram.value_at_quantile(0.95) as f64 / 1_000_000.0,
            histogram.len(),
        );
    }

    println!("==================\n");
}
