use rayon::ThreadPoolBuilder;
use std::sync::Once;

/// Environment variables consulted for a thread budget, first match wins.
const THREAD_HINTS: [&str; 5] = [
    "HIST_THREADS",
    "RAYON_NUM_THREADS",
    "SLURM_CPUS_PER_TASK",
    "PBS_NP",
    "OMP_NUM_THREADS",
];

/// Size of the decode pool and where the budget came from.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DecodePlan {
    threads: usize,
    budget: usize,
    source: &'static str,
}

/// One decode task per input file, so the pool never needs more threads
/// than there are inputs.
fn plan_decode_threads(env: impl Fn(&str) -> Option<String>, n_inputs: usize) -> DecodePlan {
    let hint = THREAD_HINTS.iter().find_map(|&key| {
        env(key)
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
            .map(|n| (n, key))
    });
    let (budget, source) = hint.unwrap_or_else(|| {
        let n = std::thread::available_parallelism().map_or(1, |n| n.get());
        (n, "available_parallelism")
    });
    DecodePlan {
        threads: budget.min(n_inputs).max(1),
        budget,
        source,
    }
}

/// Build the global pool used by [`crate::events::EventChain::open`].
pub fn configure_thread_pool(n_inputs: usize) {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let plan = plan_decode_threads(|k| std::env::var(k).ok(), n_inputs);
        match ThreadPoolBuilder::new()
            .num_threads(plan.threads)
            .thread_name(|i| format!("hist-decode-{i}"))
            .build_global()
        {
            Ok(()) => log::info!(
                "[threads] decoding {} inputs on {} threads (budget {} from {})",
                n_inputs,
                plan.threads,
                plan.budget,
                plan.source
            ),
            Err(err) => log::warn!("[threads] keeping the default rayon pool ({err})"),
        }
    });
}

/// Peak resident set size of this process so far.
fn peak_rss_bytes() -> Option<u64> {
    // SAFETY: `rusage` is plain data and `getrusage` only writes into it.
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    if unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut usage) } != 0 {
        return None;
    }
    let max = u64::try_from(usage.ru_maxrss).ok()?;
    // kilobytes on Linux, bytes on macOS
    if cfg!(target_os = "macos") {
        Some(max)
    } else {
        Some(max.saturating_mul(1024))
    }
}

pub fn report_memory(stage: &str) {
    if let Some(rss) = peak_rss_bytes() {
        log::info!("[mem] {} peak rss={:.1} MiB", stage, rss as f64 / (1024.0 * 1024.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |k| vars.iter().find(|(n, _)| *n == k).map(|(_, v)| v.to_string())
    }

    #[test]
    fn pool_is_capped_by_input_count() {
        let plan = plan_decode_threads(env(&[("HIST_THREADS", "16")]), 3);
        assert_eq!(
            plan,
            DecodePlan {
                threads: 3,
                budget: 16,
                source: "HIST_THREADS"
            }
        );
        assert_eq!(plan_decode_threads(env(&[("HIST_THREADS", "2")]), 8).threads, 2);
    }

    #[test]
    fn first_valid_hint_wins() {
        let vars = [
            ("HIST_THREADS", "0"),
            ("RAYON_NUM_THREADS", "x"),
            ("SLURM_CPUS_PER_TASK", " 4 "),
            ("OMP_NUM_THREADS", "9"),
        ];
        let plan = plan_decode_threads(env(&vars), 100);
        assert_eq!((plan.threads, plan.source), (4, "SLURM_CPUS_PER_TASK"));
    }

    #[test]
    fn no_hint_falls_back_to_host_parallelism() {
        let plan = plan_decode_threads(env(&[]), 1);
        assert_eq!(plan.source, "available_parallelism");
        assert_eq!(plan.threads, 1);
        assert!(plan.budget >= 1);
    }

    #[test]
    fn peak_rss_is_reported() {
        assert!(peak_rss_bytes().is_some_and(|b| b > 0));
    }
}
