use std::collections::VecDeque;
use std::sync::Arc;

use psp_connectors::connector::{ConnectorTaskTree, InstallRequest, InstallResponse, Registry};
use psp_connectors::Plugin;
use tracing::{error, info};

use crate::config::{ConnectorInstance, WorkbenchConfig};
use crate::engine::{Cycle, CycleSummary, Progress, TaskStates};

const LOG_CAPACITY: usize = 200;

pub struct ConnectorView {
    pub instance: ConnectorInstance,
    pub plugin: Option<Arc<dyn Plugin>>,
    pub install: Option<InstallResponse>,
    pub page_size: usize,
    pub error: Option<String>,
    /// `None` while a cycle owns the states.
    pub states: Option<TaskStates>,
    pub last_summary: Option<CycleSummary>,
}

impl ConnectorView {
    pub fn running(&self) -> bool {
        self.install.is_some() && self.states.is_none()
    }

    pub fn workflow(&self) -> &[ConnectorTaskTree] {
        self.install.as_ref().map_or(&[], |i| i.workflow.as_slice())
    }
}

pub struct App {
    pub connectors: Vec<ConnectorView>,
    pub selected: usize,
    pub log: VecDeque<String>,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl App {
    /// Build and install every configured connector. Failures are kept on
    /// the view so the rest of the workbench stays usable.
    pub async fn install(registry: &Registry, config: &WorkbenchConfig) -> Self {
        let mut connectors = Vec::with_capacity(config.connectors.len());
        for instance in &config.connectors {
            connectors.push(install_one(registry, instance).await);
        }

        Self {
            connectors,
            selected: 0,
            log: VecDeque::new(),
            started_at: chrono::Utc::now(),
        }
    }

    pub fn current(&self) -> Option<&ConnectorView> {
        self.connectors.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.connectors.len() {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn push_log(&mut self, line: String) {
        if self.log.len() == LOG_CAPACITY {
            self.log.pop_front();
        }
        self.log.push_back(line);
    }

    /// Hand the selected connector's states to a new cycle. `None` when it
    /// is not installed or a cycle is already running.
    pub fn start_cycle(&mut self) -> Option<(Cycle, TaskStates)> {
        let index = self.selected;
        let view = self.connectors.get_mut(index)?;
        let plugin = view.plugin.clone()?;
        let workflow = view.install.as_ref()?.workflow.clone();
        let states = view.states.take()?;

        let cycle = Cycle {
            connector: index,
            connector_id: view.instance.name.clone(),
            plugin,
            workflow,
            page_size: view.page_size,
            webhook_base_url: view.instance.webhook_base_url.clone(),
        };
        let name = view.instance.name.clone();
        self.push_log(format!("{name}: cycle started"));
        Some((cycle, states))
    }

    pub fn reset_states(&mut self) {
        let Some(view) = self.connectors.get_mut(self.selected) else {
            return;
        };
        if let Some(states) = view.states.as_mut() {
            states.clear();
            view.last_summary = None;
            let name = view.instance.name.clone();
            self.push_log(format!("{name}: fetch states reset"));
        }
    }

    pub fn apply(&mut self, progress: Progress) {
        match progress {
            Progress::Page {
                connector,
                task,
                items,
                has_more,
            } => {
                let name = self.name_of(connector);
                let more = if has_more { ", more" } else { "" };
                self.push_log(format!("{name}: {task} +{items}{more}"));
            }
            Progress::Skipped {
                connector,
                task,
                reason,
            } => {
                let name = self.name_of(connector);
                self.push_log(format!("{name}: {task} skipped ({reason})"));
            }
            Progress::Failed {
                connector,
                task,
                error,
            } => {
                let name = self.name_of(connector);
                self.push_log(format!("{name}: {task} failed: {error}"));
            }
            Progress::Finished {
                connector,
                states,
                summary,
            } => {
                let name = self.name_of(connector);
                self.push_log(format!(
                    "{name}: cycle done, {} items, {} failures",
                    summary.total(),
                    summary.failures
                ));
                if let Some(view) = self.connectors.get_mut(connector) {
                    view.states = Some(states);
                    view.last_summary = Some(summary);
                }
            }
        }
    }

    fn name_of(&self, connector: usize) -> String {
        self.connectors
            .get(connector)
            .map_or_else(|| format!("#{connector}"), |v| v.instance.name.clone())
    }

    pub fn session_duration(&self) -> chrono::Duration {
        chrono::Utc::now() - self.started_at
    }
}

async fn install_one(registry: &Registry, instance: &ConnectorInstance) -> ConnectorView {
    let mut view = ConnectorView {
        instance: instance.clone(),
        plugin: None,
        install: None,
        page_size: instance.page_size.unwrap_or(0),
        error: None,
        states: Some(TaskStates::new()),
        last_summary: None,
    };

    let installed = async {
        let plugin = registry.build(&instance.provider, &instance.name)?;
        let page_size = match instance.page_size {
            Some(size) => size,
            None => registry.default_page_size(&instance.provider)?,
        };
        let config = serde_json::to_vec(&instance.config)
            .map_err(|source| psp_connectors::PluginError::Encode { what: "config", source })?;
        let resp = plugin
            .install(InstallRequest {
                connector_id: instance.name.clone(),
                config,
            })
            .await?;
        Ok::<_, psp_connectors::PluginError>((plugin, page_size, resp))
    }
    .await;

    match installed {
        Ok((plugin, page_size, resp)) => {
            info!(connector_id = %instance.name, provider = %instance.provider, "connector installed");
            view.plugin = Some(plugin);
            view.page_size = page_size;
            view.install = Some(resp);
        }
        Err(err) => {
            error!(connector_id = %instance.name, provider = %instance.provider, error = %err, "install failed");
            view.error = Some(err.to_string());
        }
    }
    view
}
