//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OptionsKind, OutputFormat};
use crate::client::KlaviyoClient;
use crate::config::ExtractorConfig;
use crate::engine::{Extractor, RunState};
use crate::error::{Error, Result};
use crate::output::JsonlSink;
use chrono::Utc;
use serde_json::{json, Value};
use std::path::Path;
use tracing::info;

/// Documentation on adding scopes to a private API key
const SCOPES_HELP_URL: &str =
    "https://help.klaviyo.com/hc/en-us/articles/7423954176283#add-a-scope-to-a-private-api-key-2";

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
            Commands::Check => self.check().await,
            Commands::Run { output } => self.extract(output).await,
            Commands::Options { kind } => self.options(*kind).await,
        }
    }

    /// Load the extractor configuration
    fn load_config(&self) -> Result<ExtractorConfig> {
        let path = self
            .cli
            .config
            .as_ref()
            .ok_or_else(|| Error::config("Config file not specified (use -C flag)"))?;
        ExtractorConfig::load(path)
    }

    fn build_client(config: &ExtractorConfig) -> Result<KlaviyoClient> {
        KlaviyoClient::new(config.client_config(), config.retry_policy())
    }

    /// Probe the key and its scopes
    async fn check(&self) -> Result<()> {
        let config = self.load_config()?;
        let client = Self::build_client(&config)?;

        let result = client.probe_scopes().await;

        let (status, message) = if !result.token_valid {
            let detail = result
                .last_error
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default();
            (
                "FAILED",
                format!("The provided API token is invalid. Unauthorized. {detail}")
                    .trim_end()
                    .to_string(),
            )
        } else if result.missing_scopes.is_empty() {
            ("SUCCEEDED", "Credentials are valid!".to_string())
        } else {
            (
                "WARNING",
                format!(
                    "The provided token is valid but some scopes are unauthorized. \
                     Please enable RO for following scopes or fix related issues: \n\n{}\n\n\
                     For more information refer to [the documentation]({SCOPES_HELP_URL})",
                    result.missing_table()
                ),
            )
        };

        let missing: serde_json::Map<String, Value> = result
            .missing_scopes
            .iter()
            .map(|(scope, reason)| (scope.to_string(), Value::String(reason.clone())))
            .collect();

        self.output_message(&json!({
            "type": "CONNECTION_STATUS",
            "connectionStatus": {
                "status": status,
                "message": message,
                "missing_scopes": missing
            }
        }));

        Ok(())
    }

    /// Extract every configured object into `output`
    async fn extract(&self, output: &Path) -> Result<()> {
        let config = self.load_config()?;
        let client = Self::build_client(&config)?;

        let state = match &self.cli.state {
            Some(path) => RunState::load(path)?,
            None => RunState::default(),
        };
        let started_at = Utc::now().timestamp();

        let sink = JsonlSink::new(output)?.with_known_columns(state.columns.clone());
        let mut extractor = Extractor::new(client, config, sink).with_last_run(state.last_run);
        let columns = extractor.run().await?;
        let stats = extractor.stats().clone();

        if let Some(path) = &self.cli.state {
            let new_state = RunState {
                last_run: Some(started_at),
                columns: columns.clone(),
            };
            new_state.save(path)?;
            info!("State written to {}", path.display());
        }

        self.output_message(&json!({
            "type": "STATS",
            "stats": {
                "objects_extracted": stats.objects_extracted,
                "pages_fetched": stats.pages_fetched,
                "records_written": stats.records_written,
                "duration_ms": stats.duration_ms,
                "tables": columns
            }
        }));

        Ok(())
    }

    /// Print selectable ids
    async fn options(&self, kind: OptionsKind) -> Result<()> {
        let config = self.load_config()?;
        let client = Self::build_client(&config)?;

        let options = match kind {
            OptionsKind::Lists => client.list_options().await?,
            OptionsKind::Segments => client.segment_options().await?,
            OptionsKind::Metrics => client.metric_options().await?,
        };

        self.output_message(&json!({
            "type": "OPTIONS",
            "options": options
        }));

        Ok(())
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}
