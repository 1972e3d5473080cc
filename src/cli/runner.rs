//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::TapConfig;
use crate::engine::{Extractor, Message, MetricsCollector, Record};
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::streams::{find_stream, list_streams};
use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Check { config_json } => self.check(config_json.as_deref()).await,
            Commands::Read {
                stream,
                config_json,
                max_pages,
            } => {
                self.read(stream, config_json.as_deref(), *max_pages)
                    .await
            }
            Commands::Streams => self.streams(),
        }
    }

    /// Load configuration; inline JSON takes precedence over `--config`
    fn load_config(&self, inline: Option<&str>) -> Result<TapConfig> {
        if let Some(json_str) = inline {
            return TapConfig::from_json(json_str)
                .map_err(|e| Error::config(format!("Invalid config JSON: {e}")));
        }

        match &self.cli.config {
            Some(path) => TapConfig::from_file(path),
            None => Err(Error::config(
                "No configuration given (use -C <file> or --config-json)",
            )),
        }
    }

    fn build_extractor(&self, config: &TapConfig, stream: &str) -> Result<Extractor> {
        let client = HttpClient::with_config(config.http_client_config())?;
        Ok(Extractor::new(
            Arc::new(client),
            config.retry_policy(),
            find_stream(stream)?,
            config.template_context(),
        ))
    }

    /// Check connection by fetching a single page
    async fn check(&self, config_json: Option<&str>) -> Result<()> {
        let config = self.load_config(config_json)?;
        config.validate()?;
        let extractor = self.build_extractor(&config, "tweets")?;

        info!("Checking connection to {}", config.api_url);

        let status = match extractor.pages(1).next_page().await {
            Ok(_) => json!({
                "status": "SUCCEEDED",
                "message": "Connection successful"
            }),
            Err(e) => json!({
                "status": "FAILED",
                "message": format!("Connection failed: {e}")
            }),
        };

        self.output_message(&json!({
            "type": "CONNECTION_STATUS",
            "connectionStatus": status
        }));

        Ok(())
    }

    /// Extract one stream, printing records as they arrive
    async fn read(
        &self,
        stream: &str,
        config_json: Option<&str>,
        max_pages: Option<u32>,
    ) -> Result<()> {
        let mut config = self.load_config(config_json)?;
        if let Some(max_pages) = max_pages {
            config.max_pages = max_pages;
        }
        config.validate()?;

        let extractor = self.build_extractor(&config, stream)?;
        let mut metrics = MetricsCollector::new();
        let mut messages = extractor.extract(config.max_pages);
        let mut outcome = Ok(());

        while let Some(message) = messages.next().await {
            match message {
                Ok(message) => {
                    metrics.observe(&message);
                    if let Message::Record(record) = &message {
                        self.output_message(&record_message(record));
                    }
                }
                Err(e) => {
                    if e.is_fatal() {
                        error!("Extraction of '{}' rejected by the API: {}", stream, e);
                    } else {
                        error!("Extraction of '{}' failed: {}", stream, e);
                    }
                    outcome = Err(e);
                }
            }
        }

        metrics.log_summary();
        outcome
    }

    /// List built-in streams
    fn streams(&self) -> Result<()> {
        self.output_message(&json!({
            "type": "STREAMS",
            "streams": list_streams()
        }));
        Ok(())
    }

    fn output_message(&self, msg: &Value) {
        let line = match self.cli.format {
            OutputFormat::Json => serde_json::to_string(msg),
            OutputFormat::Pretty => serde_json::to_string_pretty(msg),
        };
        println!("{}", line.unwrap_or_default());
    }
}

/// Wire form of one record
fn record_message(record: &Record) -> Value {
    json!({
        "type": "RECORD",
        "record": {
            "stream": record.stream,
            "data": {
                "id": record.id,
                "raw": record.raw,
                "created_at": record.created_at,
            },
            "emitted_at": chrono::Utc::now().timestamp_millis()
        }
    })
}
