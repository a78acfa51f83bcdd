pub mod chrome;

use crate::model::{RunConfig, RunResult, SampleEvent, SampleSet};
use crate::stats;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("cycle {cycle}: heading text {actual:?} does not contain {expected:?}")]
    Verification {
        cycle: u32,
        expected: String,
        actual: String,
    },
    #[error("cycle {cycle}: browser automation failed")]
    Automation {
        cycle: u32,
        #[source]
        source: anyhow::Error,
    },
}

/// One live browser session, scoped to a single repetition. Dropping the
/// session must tear down whatever browser state backs it.
pub trait PageSession {
    fn navigate(&mut self, url: &str) -> anyhow::Result<()>;
    fn heading_text(&mut self, selector: &str) -> anyhow::Result<String>;
    fn resource_entries(&mut self) -> anyhow::Result<Vec<(String, f64)>>;
}

/// Hands out a fresh isolated session per repetition.
pub trait SessionProvider {
    type Session: PageSession;
    fn acquire(&self) -> anyhow::Result<Self::Session>;
}

pub struct SamplerEngine<P> {
    cfg: RunConfig,
    provider: P,
}

impl<P: SessionProvider> SamplerEngine<P> {
    pub fn new(cfg: RunConfig, provider: P) -> Self {
        Self { cfg, provider }
    }

    /// Execute the full load-and-measure run: one isolated session per
    /// cycle, heading verification, timing collection, then aggregation.
    /// Fail-fast: the first failed cycle aborts the run with its cause.
    pub fn run(self, event_tx: &UnboundedSender<SampleEvent>) -> Result<RunResult, SampleError> {
        let mut samples = SampleSet::new();

        for cycle in 1..=self.cfg.cycles {
            let _ = event_tx.send(SampleEvent::CycleStarted {
                cycle,
                total: self.cfg.cycles,
            });

            let mut session = self
                .provider
                .acquire()
                .map_err(|source| SampleError::Automation { cycle, source })?;
            // The session drops on every exit path below, failure included.
            self.run_cycle(cycle, &mut session, &mut samples, event_tx)?;
        }

        let averages = stats::aggregate(&samples);

        Ok(RunResult {
            // Formatting now_utc as RFC 3339 cannot realistically fail; an
            // empty field is still preferable to a non-timestamp sentinel.
            timestamp_utc: time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_default(),
            url: self.cfg.url.clone(),
            cycles: self.cfg.cycles,
            meas_id: self.cfg.meas_id.clone(),
            samples,
            averages,
        })
    }

    fn run_cycle(
        &self,
        cycle: u32,
        session: &mut P::Session,
        samples: &mut SampleSet,
        event_tx: &UnboundedSender<SampleEvent>,
    ) -> Result<(), SampleError> {
        let automation = |source| SampleError::Automation { cycle, source };

        session.navigate(&self.cfg.url).map_err(automation)?;

        let heading = session
            .heading_text(&self.cfg.heading_selector)
            .map_err(automation)?;
        if !heading.contains(&self.cfg.expected_heading) {
            return Err(SampleError::Verification {
                cycle,
                expected: self.cfg.expected_heading.clone(),
                actual: heading,
            });
        }
        let _ = event_tx.send(SampleEvent::PageVerified { cycle, heading });

        let entries = session.resource_entries().map_err(automation)?;
        let count = entries.len();
        for (name, duration) in entries {
            samples.entry(name).or_default().push(duration);
        }
        let _ = event_tx.send(SampleEvent::EntriesCollected { cycle, count });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct SessionLog {
        acquired: AtomicU32,
        released: AtomicU32,
    }

    struct StubProvider {
        heading: String,
        entries: Vec<(String, f64)>,
        fail_navigate: bool,
        log: Arc<SessionLog>,
    }

    struct StubSession {
        heading: String,
        entries: Vec<(String, f64)>,
        fail_navigate: bool,
        log: Arc<SessionLog>,
    }

    impl SessionProvider for StubProvider {
        type Session = StubSession;

        fn acquire(&self) -> anyhow::Result<StubSession> {
            self.log.acquired.fetch_add(1, Ordering::SeqCst);
            Ok(StubSession {
                heading: self.heading.clone(),
                entries: self.entries.clone(),
                fail_navigate: self.fail_navigate,
                log: self.log.clone(),
            })
        }
    }

    impl PageSession for StubSession {
        fn navigate(&mut self, _url: &str) -> anyhow::Result<()> {
            if self.fail_navigate {
                anyhow::bail!("net::ERR_CONNECTION_REFUSED");
            }
            Ok(())
        }

        fn heading_text(&mut self, _selector: &str) -> anyhow::Result<String> {
            Ok(self.heading.clone())
        }

        fn resource_entries(&mut self) -> anyhow::Result<Vec<(String, f64)>> {
            Ok(self.entries.clone())
        }
    }

    impl Drop for StubSession {
        fn drop(&mut self) {
            self.log.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn config(cycles: u32) -> RunConfig {
        RunConfig {
            url: "https://en.wikipedia.org/wiki/Software_metric".into(),
            cycles,
            heading_selector: "#firstHeading > span".into(),
            expected_heading: "Software metric".into(),
            headless: true,
            meas_id: "test".into(),
        }
    }

    fn provider(log: &Arc<SessionLog>) -> StubProvider {
        StubProvider {
            heading: "Software metric".into(),
            entries: vec![("a".into(), 10.0)],
            fail_navigate: false,
            log: log.clone(),
        }
    }

    #[test]
    fn fixed_entry_accumulates_across_cycles() {
        let log = Arc::new(SessionLog::default());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let result = SamplerEngine::new(config(3), provider(&log)).run(&tx).unwrap();

        assert_eq!(result.samples["a"], vec![10.0, 10.0, 10.0]);
        assert_eq!(result.averages["a"], 10.0);
        // RFC 3339, never a placeholder.
        assert!(result.timestamp_utc.contains('T'));
        assert_eq!(log.acquired.load(Ordering::SeqCst), 3);
        assert_eq!(log.released.load(Ordering::SeqCst), 3);

        let mut started = 0;
        while let Ok(ev) = rx.try_recv() {
            if matches!(ev, SampleEvent::CycleStarted { .. }) {
                started += 1;
            }
        }
        assert_eq!(started, 3);
    }

    #[test]
    fn no_entries_yields_empty_maps() {
        let log = Arc::new(SessionLog::default());
        let mut p = provider(&log);
        p.entries.clear();
        let (tx, _rx) = mpsc::unbounded_channel();

        let result = SamplerEngine::new(config(2), p).run(&tx).unwrap();

        assert!(result.samples.is_empty());
        assert!(result.averages.is_empty());
    }

    #[test]
    fn heading_mismatch_fails_fast_and_releases_session() {
        let log = Arc::new(SessionLog::default());
        let mut p = provider(&log);
        p.heading = "Something else".into();
        let (tx, _rx) = mpsc::unbounded_channel();

        let err = SamplerEngine::new(config(5), p).run(&tx).unwrap_err();

        match err {
            SampleError::Verification { cycle, expected, actual } => {
                assert_eq!(cycle, 1);
                assert_eq!(expected, "Software metric");
                assert_eq!(actual, "Something else");
            }
            other => panic!("expected verification failure, got {other:?}"),
        }
        // Fail-fast: only the first session was ever opened, and it closed.
        assert_eq!(log.acquired.load(Ordering::SeqCst), 1);
        assert_eq!(log.released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn navigation_failure_propagates_and_releases_session() {
        let log = Arc::new(SessionLog::default());
        let mut p = provider(&log);
        p.fail_navigate = true;
        let (tx, _rx) = mpsc::unbounded_channel();

        let err = SamplerEngine::new(config(3), p).run(&tx).unwrap_err();

        assert!(matches!(err, SampleError::Automation { cycle: 1, .. }));
        assert_eq!(log.acquired.load(Ordering::SeqCst), 1);
        assert_eq!(log.released.load(Ordering::SeqCst), 1);
    }
}
