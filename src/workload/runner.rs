//! Multi-threaded workload execution
//!
//! Each worker thread connects its own client to the shared session, so the
//! session's reference count rises to `threads + 1` during a phase (the
//! runner keeps one reference of its own for the whole phase).

use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

use super::config::WorkloadConfig;
use super::errors::{WorkloadError, WorkloadResult};
use super::stats::{aggregate, throughput, Operation, Phase, ThroughputStats, WorkloadReport};
use crate::client::{Client, Status};
use crate::codec::Record;
use crate::observability::{
    log_event_with_fields, Event, ObservationScope, Severity, SCOPE_WORKLOAD_LOAD,
    SCOPE_WORKLOAD_RUN,
};
use crate::session::{ConfigSource, Session};

/// Key for record number `n`
pub fn key_name(n: u64) -> String {
    format!("user{}", n)
}

/// Field name for field number `i`
pub fn field_name(i: usize) -> String {
    format!("field{}", i)
}

/// Random printable ASCII
/// Contiguous share of `0..records` for worker `thread` of `threads`
fn key_range(records: u64, threads: u64, thread: u64) -> Range<u64> {
    // Wide enough that records * (thread + 1) cannot overflow.
    let bound = |t: u64| (u128::from(records) * u128::from(t) / u128::from(threads)) as u64;
    bound(thread)..bound(thread + 1)
}

fn random_value(rng: &mut StdRng, len: usize) -> Vec<u8> {
    (0..len).map(|_| rng.gen_range(b' '..=b'~')).collect()
}

/// Uniformly chosen key among the records present
fn existing_key(key_count: &AtomicU64, rng: &mut StdRng) -> String {
    match key_count.load(Ordering::Relaxed) {
        0 => key_name(0),
        n => key_name(rng.gen_range(0..n)),
    }
}

fn random_record(rng: &mut StdRng, field_count: usize, field_length: usize) -> Record {
    (0..field_count)
        .map(|i| (field_name(i), random_value(rng, field_length)))
        .collect()
}

/// Sleeps as needed to hold a per-thread operation rate
struct Pacer {
    interval: Option<Duration>,
    next: Instant,
}

impl Pacer {
    fn new(ops_per_sec: u64) -> Self {
        Self {
            interval: (ops_per_sec > 0).then(|| Duration::from_nanos(1_000_000_000 / ops_per_sec)),
            next: Instant::now(),
        }
    }

    fn wait(&mut self) {
        if let Some(interval) = self.interval {
            let now = Instant::now();
            if self.next > now {
                thread::sleep(self.next - now);
            }
            self.next += interval;
        }
    }
}

pub struct WorkloadRunner {
    session: Arc<Session>,
    directory: PathBuf,
    config_source: ConfigSource,
    config: WorkloadConfig,
}

impl WorkloadRunner {
    /// # Errors
    ///
    /// `WorkloadError::InvalidConfig` if `config` does not validate.
    pub fn new(
        session: Arc<Session>,
        directory: impl AsRef<Path>,
        config_source: ConfigSource,
        config: WorkloadConfig,
    ) -> WorkloadResult<Self> {
        config.validate()?;
        Ok(Self {
            session,
            directory: directory.as_ref().to_path_buf(),
            config_source,
            config,
        })
    }

    pub fn config(&self) -> &WorkloadConfig {
        &self.config
    }

    /// Inserts `record_count` records, split into contiguous key ranges
    /// across the worker threads.
    pub fn load(&self) -> WorkloadResult<WorkloadReport> {
        let threads = self.config.threads as u64;
        let records = self.config.record_count;

        self.execute(Phase::Load, SCOPE_WORKLOAD_LOAD, |thread_index, client, rng| {
            let Range { start, end } = key_range(records, threads, thread_index as u64);
            let mut stats = ThroughputStats::new();
            let mut pacer = Pacer::new(self.config.ops_per_sec);
            let progress_every = ((end - start) / 10).max(1);

            for n in start..end {
                pacer.wait();
                let record = random_record(rng, self.config.field_count, self.config.field_length);
                let began = Instant::now();
                let status = client.insert(&self.config.table, &key_name(n), &record);
                stats.record(Operation::Insert, status, began.elapsed());
                report_progress(thread_index, n - start + 1, end - start, progress_every);
            }
            stats
        })
    }

    /// Performs `operation_count` operations per thread, chosen by the
    /// configured proportions over keys picked uniformly from the records
    /// present (inserts extend the key range).
    pub fn run(&self) -> WorkloadResult<WorkloadReport> {
        let weights: Vec<f64> = self.config.proportions().iter().map(|(_, w)| *w).collect();
        let chooser = WeightedIndex::new(&weights)
            .map_err(|e| WorkloadError::invalid(format!("operation proportions: {}", e)))?;
        let key_count = AtomicU64::new(self.config.record_count);

        self.execute(Phase::Run, SCOPE_WORKLOAD_RUN, |thread_index, client, rng| {
            let mut stats = ThroughputStats::new();
            let mut pacer = Pacer::new(self.config.ops_per_sec);
            let total = self.config.operation_count;
            let progress_every = (total / 10).max(1);

            for done in 1..=total {
                pacer.wait();
                let operation = Operation::ALL[chooser.sample(rng)];
                let began = Instant::now();
                let status = self.perform(client, rng, operation, &key_count);
                stats.record(operation, status, began.elapsed());
                report_progress(thread_index, done, total, progress_every);
            }
            stats
        })
    }

    fn perform(
        &self,
        client: &Client,
        rng: &mut StdRng,
        operation: Operation,
        key_count: &AtomicU64,
    ) -> Status {
        let table = self.config.table.as_str();

        match operation {
            Operation::Read => match client.read(table, &existing_key(key_count, rng), None) {
                Ok(_) => Status::Ok,
                Err(status) => status,
            },
            Operation::Update => {
                let key = existing_key(key_count, rng);
                let field = field_name(rng.gen_range(0..self.config.field_count));
                let mut values = Record::new();
                values.insert(field, random_value(rng, self.config.field_length));
                client.update(table, &key, &values)
            }
            Operation::Insert => {
                let n = key_count.fetch_add(1, Ordering::Relaxed);
                let record =
                    random_record(rng, self.config.field_count, self.config.field_length);
                client.insert(table, &key_name(n), &record)
            }
            Operation::Scan => {
                let start = existing_key(key_count, rng);
                let length = rng.gen_range(1..=self.config.max_scan_length);
                match client.scan(table, &start, length, None) {
                    Ok(_) => Status::Ok,
                    Err(status) => status,
                }
            }
            Operation::Delete => client.delete(table, &existing_key(key_count, rng)),
        }
    }

    fn rng_for(&self, thread_index: usize) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(thread_index as u64)),
            None => StdRng::from_entropy(),
        }
    }

    fn connect(&self) -> WorkloadResult<Client> {
        Ok(Client::connect(
            Arc::clone(&self.session),
            &self.directory,
            self.config_source.clone(),
        )?)
    }

    fn execute<W>(&self, phase: Phase, scope_name: &str, worker: W) -> WorkloadResult<WorkloadReport>
    where
        W: Fn(usize, &Client, &mut StdRng) -> ThroughputStats + Sync,
    {
        let anchor = self.connect()?;

        let run_id = Uuid::new_v4();
        let run_id_str = run_id.to_string();
        let threads_str = self.config.threads.to_string();
        let scope = ObservationScope::with_fields(
            scope_name,
            &[
                ("run_id", &run_id_str),
                ("table", &self.config.table),
                ("threads", &threads_str),
            ],
        );
        let started_at = Utc::now();
        let started = Instant::now();

        let outcomes: Vec<thread::Result<WorkloadResult<ThroughputStats>>> = thread::scope(|s| {
            let handles: Vec<_> = (0..self.config.threads)
                .map(|thread_index| {
                    let worker = &worker;
                    s.spawn(move || -> WorkloadResult<ThroughputStats> {
                        let client = self.connect()?;
                        let mut rng = self.rng_for(thread_index);
                        let index = thread_index.to_string();
                        log_event_with_fields(
                            Severity::Info,
                            Event::WorkerStarted,
                            &[("thread", &index)],
                        );

                        let stats = worker(thread_index, &client, &mut rng);

                        let ops = stats.total_ops().to_string();
                        log_event_with_fields(
                            Severity::Info,
                            Event::WorkerFinished,
                            &[("thread", &index), ("ops", &ops)],
                        );
                        client.close()?;
                        Ok(stats)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join()).collect()
        });
        let elapsed = started.elapsed();

        let mut per_thread = Vec::with_capacity(outcomes.len());
        let mut failure = None;
        for (thread_index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(Ok(stats)) => per_thread.push(stats),
                Ok(Err(e)) => {
                    failure.get_or_insert(e);
                }
                Err(_) => {
                    failure.get_or_insert(WorkloadError::WorkerPanicked(thread_index));
                }
            }
        }

        let metrics = self.session.metrics().snapshot();
        let closed = anchor.close();

        if let Some(e) = failure {
            scope.fail(&e.to_string());
            return Err(e);
        }
        if let Err(e) = closed {
            scope.fail(&e.to_string());
            return Err(e.into());
        }

        let operations = aggregate(&per_thread);
        let total_ops = operations.total_ops();
        let ops_per_sec = throughput(total_ops, elapsed);
        scope.complete_with_fields(&[
            ("total_ops", &total_ops.to_string()),
            ("ops_per_sec", &format!("{:.1}", ops_per_sec)),
        ]);

        Ok(WorkloadReport {
            run_id,
            phase,
            engine: self.session.driver_name().to_string(),
            table: self.config.table.clone(),
            threads: self.config.threads,
            started_at,
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            total_ops,
            ops_per_sec,
            operations,
            per_thread,
            metrics,
        })
    }
}

fn report_progress(thread_index: usize, done: u64, total: u64, every: u64) {
    if done % every == 0 && done < total {
        log_event_with_fields(
            Severity::Trace,
            Event::WorkerProgress,
            &[
                ("thread", &thread_index.to_string()),
                ("done", &done.to_string()),
                ("total", &total.to_string()),
            ],
        );
    }
}
