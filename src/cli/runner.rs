//! CLI runner - executes a gather

use crate::cli::commands::{Cli, OutputFormat};
use crate::config::FileConfig;
use crate::decode::ValueDecoder;
use crate::error::{Error, Result};
use crate::gather::{Call, CallNoError, Gatherer, QueryError};
use crate::http::HttpClient;
use crate::query::Query;
use serde_json::{json, Value};
use std::io::{self, Write};
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the gather and print every page
    ///
    /// Fails when at least one page could not be fetched or decoded.
    pub async fn run(&self) -> Result<()> {
        let config = self.load_config()?;
        let client = HttpClient::with_config(config.http)?;
        let gatherer = Gatherer::new(client, ValueDecoder::new()).with_config(config.gather);

        let seeds: Vec<Query> = self
            .cli
            .paths
            .iter()
            .map(|path| config.query_defaults.page_query(path.as_str(), 1))
            .collect();

        let start = Instant::now();
        let failed = if self.cli.dual {
            let (calls, errors) = gatherer.gather_all_dual::<Value>(seeds);
            self.stream_dual(calls, errors, io::stdout()).await?
        } else {
            self.stream_calls(gatherer.gather_all::<Value>(seeds), io::stdout())
                .await?
        };

        let stats = gatherer.stats();
        info!(
            "Gathered {} pages ({} failed, {} derived, {} skipped) in {:?}",
            stats.fetched,
            stats.failed,
            stats.derived,
            stats.skipped,
            start.elapsed()
        );

        if failed > 0 {
            return Err(Error::Other(format!("{failed} page(s) failed")));
        }
        Ok(())
    }

    /// Build the configuration from the config file and flag overrides
    fn load_config(&self) -> Result<FileConfig> {
        let mut config = match &self.cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };

        if let Some(url) = &self.cli.base_url {
            config.http.base_url = Some(url.clone());
        }
        if let Some(token) = &self.cli.token {
            config.http.private_token = Some(token.clone());
        }
        if let Some(workers) = self.cli.workers {
            config.gather.workers_cap = workers;
        }
        if let Some(limit) = self.cli.limit {
            config.gather.total_pages_limit = limit;
        }

        if config.http.base_url.is_none() {
            return Err(Error::config(
                "Base URL not specified (use --base-url or http.base_url)",
            ));
        }
        Ok(config)
    }

    /// Print pages as they arrive, returning the number of failed pages
    async fn stream_calls<W: Write>(
        &self,
        mut calls: mpsc::Receiver<Call<Value>>,
        mut out: W,
    ) -> Result<usize> {
        let mut failed = 0;
        while let Some(call) = calls.recv().await {
            match call.into_result() {
                Ok(page) => self.emit(&mut out, &page.query, &page.value)?,
                Err(failure) => {
                    report(&failure);
                    failed += 1;
                }
            }
        }
        Ok(failed)
    }

    /// Print pages and report errors from both streams as they arrive
    async fn stream_dual<W: Write>(
        &self,
        mut calls: mpsc::Receiver<CallNoError<Value>>,
        mut errors: mpsc::Receiver<QueryError>,
        mut out: W,
    ) -> Result<usize> {
        let mut failed = 0;
        let mut calls_open = true;
        let mut errors_open = true;

        while calls_open || errors_open {
            tokio::select! {
                call = calls.recv(), if calls_open => match call {
                    Some(page) => self.emit(&mut out, &page.query, &page.value)?,
                    None => calls_open = false,
                },
                error = errors.recv(), if errors_open => match error {
                    Some(failure) => {
                        report(&failure);
                        failed += 1;
                    }
                    None => errors_open = false,
                },
            }
        }
        Ok(failed)
    }

    fn emit<W: Write>(&self, out: &mut W, query: &Query, value: &Value) -> Result<()> {
        let line = json!({
            "path": query.path,
            "page": query.page(),
            "value": value,
        });
        match self.cli.format {
            OutputFormat::Json => serde_json::to_writer(&mut *out, &line)?,
            OutputFormat::Pretty => serde_json::to_writer_pretty(&mut *out, &line)?,
        }
        writeln!(out)?;
        out.flush()?;
        Ok(())
    }
}

fn report(failure: &QueryError) {
    warn!("Failed to gather {}", failure);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use reqwest::header::HeaderMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Output sink readable while the runner is still writing
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn lines(&self) -> Vec<Value> {
            let bytes = self.0.lock().unwrap().clone();
            String::from_utf8(bytes)
                .unwrap()
                .lines()
                .map(|line| serde_json::from_str(line).unwrap())
                .collect()
        }

        async fn wait_for(&self, count: usize) {
            for _ in 0..200 {
                if self.lines().len() >= count {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            panic!("Expected {count} printed pages, got {}", self.lines().len());
        }
    }

    fn runner(args: &[&str]) -> Runner {
        let mut argv = vec!["gitlab-gather"];
        argv.extend_from_slice(args);
        Runner::new(Cli::try_parse_from(argv).unwrap())
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = runner(&[
            "--base-url",
            "https://gitlab.example.com/api/v4",
            "--token",
            "glpat-flag",
            "--workers",
            "3",
            "--limit",
            "7",
            "projects",
        ])
        .load_config()
        .unwrap();

        assert_eq!(
            config.http.base_url.as_deref(),
            Some("https://gitlab.example.com/api/v4")
        );
        assert_eq!(config.http.private_token.as_deref(), Some("glpat-flag"));
        assert_eq!(config.gather.workers_cap, 3);
        assert_eq!(config.gather.total_pages_limit, 7);
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gather.yaml");
        std::fs::write(
            &path,
            "http:\n  base_url: https://file.example.com\ngather:\n  workers_cap: 2\n  call_cap: 11\n",
        )
        .unwrap();

        let config = runner(&[
            "--config",
            path.to_str().unwrap(),
            "--workers",
            "9",
            "projects",
        ])
        .load_config()
        .unwrap();

        assert_eq!(config.http.base_url.as_deref(), Some("https://file.example.com"));
        assert_eq!(config.gather.workers_cap, 9);
        assert_eq!(config.gather.call_cap, 11);
    }

    #[tokio::test]
    async fn test_pages_printed_while_gather_runs() {
        let runner = runner(&["projects"]);
        let (tx, rx) = mpsc::channel(4);
        let out = SharedBuf::default();
        let task = tokio::spawn({
            let out = out.clone();
            async move { runner.stream_calls(rx, out).await }
        });

        let query = Query::page_query("projects", 1);
        tx.send(Call {
            query: query.clone(),
            headers: Some(HeaderMap::new()),
            result: Ok(json!([1, 2])),
        })
        .await
        .unwrap();

        out.wait_for(1).await;
        assert!(!task.is_finished());

        tx.send(Call {
            query: query.with_page(2),
            headers: None,
            result: Err(Error::Cancelled),
        })
        .await
        .unwrap();
        drop(tx);

        let failed = task.await.unwrap().unwrap();
        assert_eq!(failed, 1);
        assert_eq!(
            out.lines(),
            vec![json!({"path": "projects", "page": 1, "value": [1, 2]})]
        );
    }

    #[tokio::test]
    async fn test_dual_streams_printed_while_gather_runs() {
        let runner = runner(&["--dual", "projects"]);
        let (calls_tx, calls_rx) = mpsc::channel(4);
        let (errors_tx, errors_rx) = mpsc::channel(1);
        let out = SharedBuf::default();
        let task = tokio::spawn({
            let out = out.clone();
            async move { runner.stream_dual(calls_rx, errors_rx, out).await }
        });

        let query = Query::page_query("projects", 1);
        errors_tx
            .send(QueryError::new(query.with_page(3), Error::Cancelled))
            .await
            .unwrap();
        calls_tx
            .send(CallNoError {
                query: query.with_page(2),
                headers: HeaderMap::new(),
                value: json!(["b"]),
            })
            .await
            .unwrap();

        out.wait_for(1).await;
        assert!(!task.is_finished());

        drop(errors_tx);
        calls_tx
            .send(CallNoError {
                query,
                headers: HeaderMap::new(),
                value: json!(["a"]),
            })
            .await
            .unwrap();
        drop(calls_tx);

        let failed = task.await.unwrap().unwrap();
        assert_eq!(failed, 1);
        assert_eq!(
            out.lines(),
            vec![
                json!({"path": "projects", "page": 2, "value": ["b"]}),
                json!({"path": "projects", "page": 1, "value": ["a"]}),
            ]
        );
    }
}
