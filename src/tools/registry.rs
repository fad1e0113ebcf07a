//! Tool registry.
//!
//! The registry is built once, then shared read-only (`Arc<ToolRegistry>`)
//! by any number of concurrent execution loops. Lookup is by exact,
//! case-sensitive name.

use crate::messages::ToolDefinition;
use crate::tools::builtins::BuiltinKind;
use crate::tools::error::ToolError;
use crate::tools::observation::Observation;
use crate::tools::{ToolConfig, ToolExecutor};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// How long past a tool's own deadline dispatch keeps waiting for it.
pub const DISPATCH_GRACE: Duration = Duration::from_secs(1);

/// One `[tools.<name>]` entry of the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolEntry {
    /// Built-in type name, e.g. `"calculator"`
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Disabled entries are skipped
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Tool-specific settings
    #[serde(default)]
    pub config: toml::Table,
}

fn default_enabled() -> bool {
    true
}

impl ToolEntry {
    /// Creates an enabled entry with default settings.
    #[must_use]
    pub fn new(tool_type: impl Into<String>) -> Self {
        Self {
            tool_type: tool_type.into(),
            enabled: true,
            config: toml::Table::new(),
        }
    }
}

/// A registered tool.
#[derive(Debug, Clone)]
pub struct RegisteredTool {
    /// The tool configuration
    pub config: ToolConfig,
    /// The tool executor
    pub executor: Arc<dyn ToolExecutor>,
}

/// Dispatch counters.
#[derive(Debug, Default)]
pub struct RegistryMetrics {
    dispatched: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    unknown: AtomicU64,
}

/// Point-in-time copy of [`RegistryMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryMetricsSnapshot {
    /// Total dispatch calls
    pub dispatched: u64,
    /// Calls that produced a success observation
    pub succeeded: u64,
    /// Calls that produced a failure observation
    pub failed: u64,
    /// Calls naming a tool that is not registered
    pub unknown: u64,
}

impl RegistryMetrics {
    /// Returns the current counter values.
    #[must_use]
    pub fn snapshot(&self) -> RegistryMetricsSnapshot {
        RegistryMetricsSnapshot {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            unknown: self.unknown.load(Ordering::Relaxed),
        }
    }
}

/// Immutable name-to-tool mapping.
#[derive(Debug)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
    catalog: Vec<ToolDefinition>,
    metrics: RegistryMetrics,
}

/// Builder for [`ToolRegistry`].
#[derive(Debug, Default)]
pub struct ToolRegistryBuilder {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistryBuilder {
    /// Adds a tool.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyRegistered` if a tool with the same name was added.
    pub fn register(mut self, executor: Arc<dyn ToolExecutor>) -> Result<Self, ToolError> {
        self.insert(executor)?;
        Ok(self)
    }

    fn insert(&mut self, executor: Arc<dyn ToolExecutor>) -> Result<(), ToolError> {
        let config = executor.config();
        let name = config.definition.name.clone();
        if self.index.contains_key(&name) {
            return Err(ToolError::already_registered(name));
        }

        tracing::debug!(tool_name = %name, sandboxed = config.sandboxed, "tool registered");
        self.index.insert(name, self.tools.len());
        self.tools.push(RegisteredTool { config, executor });
        Ok(())
    }

    /// Freezes the registry.
    #[must_use]
    pub fn build(self) -> ToolRegistry {
        let catalog = self
            .tools
            .iter()
            .map(|tool| tool.config.definition.clone())
            .collect();
        ToolRegistry {
            tools: self.tools,
            index: self.index,
            catalog,
            metrics: RegistryMetrics::default(),
        }
    }
}

impl ToolRegistry {
    /// Starts an empty builder.
    #[must_use]
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::default()
    }

    /// Creates a registry holding every built-in tool with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if a built-in cannot be constructed.
    pub fn builtins() -> Result<Self, ToolError> {
        let mut builder = Self::builder();
        for kind in BuiltinKind::ALL {
            builder.insert(kind.build(&toml::Table::new())?)?;
        }
        Ok(builder.build())
    }

    /// Creates a registry from `[tools]` configuration entries.
    ///
    /// `None` enables every built-in with defaults. Entries that are
    /// disabled are skipped; entries with an unknown type, bad settings or a
    /// duplicate name are logged and skipped so the remaining tools still load.
    #[must_use]
    pub fn from_config(entries: Option<&BTreeMap<String, ToolEntry>>) -> Self {
        let Some(entries) = entries else {
            let mut builder = Self::builder();
            for kind in BuiltinKind::ALL {
                Self::load_entry(&mut builder, kind.name(), &ToolEntry::new(kind.name()));
            }
            return builder.build();
        };

        let mut builder = Self::builder();
        for (label, entry) in entries {
            if !entry.enabled {
                tracing::debug!(tool = %label, "tool disabled by configuration");
                continue;
            }
            Self::load_entry(&mut builder, label, entry);
        }
        builder.build()
    }

    fn load_entry(builder: &mut ToolRegistryBuilder, label: &str, entry: &ToolEntry) {
        let loaded = entry
            .tool_type
            .parse::<BuiltinKind>()
            .and_then(|kind| kind.build(&entry.config))
            .and_then(|tool| builder.insert(tool));

        if let Err(error) = loaded {
            tracing::warn!(
                tool = %label,
                tool_type = %entry.tool_type,
                error = %error,
                "skipping tool configuration entry"
            );
        }
    }

    /// Returns the catalog shown to the reasoning service, in registration order.
    #[must_use]
    pub fn catalog(&self) -> &[ToolDefinition] {
        &self.catalog
    }

    /// Looks up a tool by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// Checks if a tool is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Returns the registered tool names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|tool| tool.config.name())
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns true if no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Returns the dispatch counters.
    #[must_use]
    pub fn metrics(&self) -> &RegistryMetrics {
        &self.metrics
    }

    /// Runs the named tool and returns its observation.
    ///
    /// An unknown name produces an `unknown_tool` failure observation without
    /// touching any tool. A tool still running [`DISPATCH_GRACE`] after its
    /// [`ToolConfig::timeout`] is dropped and reported as a `timeout`
    /// failure. Never returns an error: every outcome is an [`Observation`].
    pub async fn dispatch(&self, name: &str, input: Value) -> Observation {
        self.metrics.dispatched.fetch_add(1, Ordering::Relaxed);

        let Some(tool) = self.get(name) else {
            self.metrics.unknown.fetch_add(1, Ordering::Relaxed);
            self.metrics.failed.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(tool_name = %name, "dispatch to unknown tool");
            return Observation::failure(ToolError::unknown_tool(name));
        };

        let span = tracing::info_span!("tool", tool_name = %name, sandboxed = tool.config.sandboxed);
        let deadline = tool.config.timeout;
        let invocation = tool.executor.invoke(input).instrument(span);
        let observation = match tokio::time::timeout(deadline + DISPATCH_GRACE, invocation).await {
            Ok(observation) => observation,
            Err(_) => {
                tracing::warn!(tool_name = %name, deadline_secs = deadline.as_secs_f64(), "tool overran its deadline");
                Observation::failure(ToolError::timeout(name, deadline))
            }
        };

        if observation.is_success() {
            self.metrics.succeeded.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(tool_name = %name, "tool succeeded");
        } else {
            self.metrics.failed.fetch_add(1, Ordering::Relaxed);
            tracing::info!(tool_name = %name, observation = %observation, "tool reported failure");
        }

        observation
    }
}
