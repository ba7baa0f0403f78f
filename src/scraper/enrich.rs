// src/scraper/enrich.rs
//
// Parallel detail enrichment. Each job gets its own isolated page so the
// shared listing tab's scroll state is never touched; concurrency is capped
// because each page is a full browser context.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;

use crate::browser::BrowserSession;

use super::details::{resolve_detail_url, scrape_property_details, DetailRules};
use super::models::{DetailBundle, RecordStore};
use super::ScraperError;
use super::ts;

pub const MAX_CONCURRENT: usize = 5;

const LABEL_CHARS: usize = 50;
const ERROR_LOG_CHARS: usize = 100;

struct EnrichJob {
    uid: String,
    link: String,
    label: String,
}

/// Run `worker` over `jobs` with at most `limit` concurrent workers.
/// Results come back in job order regardless of completion order.
pub fn run_bounded<T, R, F>(jobs: Vec<T>, limit: usize, worker: F) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync,
{
    let queue: Mutex<VecDeque<(usize, T)>> = Mutex::new(jobs.into_iter().enumerate().collect());
    let done: Mutex<Vec<(usize, R)>> = Mutex::new(Vec::new());
    let worker = &worker;

    thread::scope(|scope| {
        for _ in 0..limit.max(1) {
            scope.spawn(|| loop {
                let job = queue.lock().expect("job queue poisoned").pop_front();
                let Some((i, job)) = job else {
                    break;
                };
                let result = worker(job);
                done.lock().expect("result list poisoned").push((i, result));
            });
        }
    });

    let mut results = done.into_inner().expect("result list poisoned");
    results.sort_by_key(|(i, _)| *i);
    results.into_iter().map(|(_, r)| r).collect()
}

/// Visit every linked record's detail page, at most `limit` at a time, and
/// merge what comes back. Individual page failures land in the record's
/// `error` field; only rule-compilation errors propagate.
pub fn enrich_all(
    session: &BrowserSession,
    store: &mut RecordStore,
    base_origin: &str,
    limit: usize,
) -> Result<(), ScraperError> {
    let rules = DetailRules::new()?;

    let jobs: Vec<EnrichJob> = store
        .records()
        .iter()
        .filter_map(|r| {
            let link = r.property_link.clone()?;
            let label = r
                .address
                .as_deref()
                .map_or_else(|| "Unknown".to_string(), |a| a.chars().take(LABEL_CHARS).collect());
            Some(EnrichJob {
                uid: r.uid.clone(),
                link,
                label,
            })
        })
        .collect();
    if jobs.is_empty() {
        return Ok(());
    }

    let total = jobs.len();
    let started = AtomicUsize::new(0);

    let results = run_bounded(jobs, limit, |job: EnrichJob| {
        let k = started.fetch_add(1, Ordering::SeqCst) + 1;
        eprintln!("[{}] [{}/{}] Scraping: {}", ts(), k, total, job.label);

        let bundle = scrape_in_isolated_context(session, &rules, &job.link, base_origin);
        match &bundle.error {
            None => eprintln!("[{}] [{}/{}] ✓ Done: {}", ts(), k, total, job.label),
            Some(e) => {
                let short: String = e.chars().take(ERROR_LOG_CHARS).collect();
                eprintln!("[{}] [{}/{}] ✗ Failed: {} - {}", ts(), k, total, job.label, short);
            }
        }
        (job.uid, bundle)
    });

    merge_results(store, results);
    Ok(())
}

/// One job, one throwaway incognito page. A page that cannot even open
/// becomes an error bundle like any navigation failure.
fn scrape_in_isolated_context(
    session: &BrowserSession,
    rules: &DetailRules,
    link: &str,
    base_origin: &str,
) -> DetailBundle {
    let page = match session.open_page() {
        Ok(page) => page,
        Err(e) => return DetailBundle::failure(resolve_detail_url(base_origin, link), e.to_string()),
    };
    let bundle = scrape_property_details(&page, rules, link, base_origin);
    page.close();
    bundle
}

pub fn merge_results(store: &mut RecordStore, results: Vec<(String, DetailBundle)>) {
    for (uid, bundle) in results {
        if let Some(record) = store.get_mut(&uid) {
            record.apply_detail(bundle);
        }
    }
}
