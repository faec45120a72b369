//! Runs one cycle of a connector's workflow tree.
//!
//! Every fetch task is drained until the connector reports `has_more ==
//! false`, then its children run once per fetched item. States survive
//! between cycles so the next run only picks up new records.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use psp_connectors::connector::{
    ConnectorTaskTree, CreateWebhooksRequest, FetchNextOthersRequest, FetchNextRequest,
    FetchNextResponse, TaskType,
};
use psp_connectors::{Plugin, PluginError};

/// Upper bound on pages per task and cycle, in case a connector never
/// reports exhaustion.
const MAX_PAGES_PER_TASK: usize = 10_000;

/// Fetch states keyed by task path and parent reference.
pub type TaskStates = HashMap<String, Vec<u8>>;

#[derive(Debug, Clone)]
pub enum Progress {
    Page {
        connector: usize,
        task: String,
        items: usize,
        has_more: bool,
    },
    Skipped {
        connector: usize,
        task: String,
        reason: String,
    },
    Failed {
        connector: usize,
        task: String,
        error: String,
    },
    Finished {
        connector: usize,
        states: TaskStates,
        summary: CycleSummary,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleSummary {
    pub fetched: HashMap<TaskType, usize>,
    pub webhook_configs: usize,
    pub failures: usize,
}

impl CycleSummary {
    pub fn total(&self) -> usize {
        self.fetched.values().sum()
    }
}

pub struct Cycle {
    pub connector: usize,
    pub connector_id: String,
    pub plugin: Arc<dyn Plugin>,
    pub workflow: Vec<ConnectorTaskTree>,
    pub page_size: usize,
    pub webhook_base_url: Option<String>,
}

struct Job {
    task: ConnectorTaskTree,
    path: String,
    parent: Option<Parent>,
}

struct Parent {
    reference: String,
    payload: Vec<u8>,
}

struct Page {
    items: Vec<Parent>,
    new_state: Vec<u8>,
    has_more: bool,
}

fn state_key(path: &str, parent: Option<&Parent>) -> String {
    match parent {
        Some(parent) => format!("{path}@{}", parent.reference),
        None => path.to_string(),
    }
}

fn into_page<T: Serialize>(
    resp: FetchNextResponse<T>,
    reference: impl Fn(&T) -> String,
) -> Result<Page, PluginError> {
    let items = resp
        .items
        .iter()
        .map(|item| {
            Ok(Parent {
                reference: reference(item),
                payload: serde_json::to_vec(item)
                    .map_err(|source| PluginError::Encode { what: "payload", source })?,
            })
        })
        .collect::<Result<Vec<_>, PluginError>>()?;

    Ok(Page {
        items,
        new_state: resp.new_state,
        has_more: resp.has_more,
    })
}

impl Cycle {
    /// Walk the whole tree once. Failed tasks are reported and skipped along
    /// with their children; the rest of the tree still runs.
    pub async fn run(self, mut states: TaskStates, tx: UnboundedSender<Progress>) {
        let mut summary = CycleSummary::default();
        let mut queue: VecDeque<Job> = self
            .workflow
            .iter()
            .map(|task| Job {
                task: task.clone(),
                path: task.name.clone(),
                parent: None,
            })
            .collect();

        while let Some(job) = queue.pop_front() {
            match self.run_task(&job, &mut states, &mut summary, &tx).await {
                Ok(items) => {
                    for item in items {
                        for child in &job.task.next_tasks {
                            queue.push_back(Job {
                                task: child.clone(),
                                path: format!("{}/{}", job.path, child.name),
                                parent: Some(Parent {
                                    reference: item.reference.clone(),
                                    payload: item.payload.clone(),
                                }),
                            });
                        }
                    }
                }
                Err(err) => {
                    warn!(task = %job.path, error = %err, "task failed");
                    summary.failures += 1;
                    let _ = tx.send(Progress::Failed {
                        connector: self.connector,
                        task: job.path.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }

        info!(
            connector_id = %self.connector_id,
            items = summary.total(),
            failures = summary.failures,
            "cycle finished"
        );
        let _ = tx.send(Progress::Finished {
            connector: self.connector,
            states,
            summary,
        });
    }

    async fn run_task(
        &self,
        job: &Job,
        states: &mut TaskStates,
        summary: &mut CycleSummary,
        tx: &UnboundedSender<Progress>,
    ) -> Result<Vec<Parent>, PluginError> {
        let from_payload = job.parent.as_ref().map(|p| p.payload.clone());

        if job.task.task_type == TaskType::CreateWebhooks {
            let Some(base_url) = self.webhook_base_url.clone() else {
                let _ = tx.send(Progress::Skipped {
                    connector: self.connector,
                    task: job.path.clone(),
                    reason: "no webhook base url configured".to_string(),
                });
                return Ok(Vec::new());
            };
            let resp = self
                .plugin
                .create_webhooks(CreateWebhooksRequest {
                    connector_id: self.connector_id.clone(),
                    webhook_base_url: base_url,
                    from_payload,
                })
                .await?;
            summary.webhook_configs += resp.configs.len();
            return Ok(Vec::new());
        }

        let key = state_key(&job.path, job.parent.as_ref());
        let mut fetched = Vec::new();

        for _ in 0..MAX_PAGES_PER_TASK {
            let state = states.get(&key).cloned();
            let page = self.fetch(&job.task, state, from_payload.clone()).await?;
            states.insert(key.clone(), page.new_state);

            *summary.fetched.entry(job.task.task_type).or_default() += page.items.len();
            let _ = tx.send(Progress::Page {
                connector: self.connector,
                task: job.path.clone(),
                items: page.items.len(),
                has_more: page.has_more,
            });
            fetched.extend(page.items);

            if !page.has_more {
                return Ok(fetched);
            }
        }

        warn!(task = %job.path, "page limit reached, resuming next cycle");
        Ok(fetched)
    }

    async fn fetch(
        &self,
        task: &ConnectorTaskTree,
        state: Option<Vec<u8>>,
        from_payload: Option<Vec<u8>>,
    ) -> Result<Page, PluginError> {
        let req = FetchNextRequest {
            state,
            page_size: self.page_size,
            from_payload,
        };

        match task.task_type {
            TaskType::FetchAccounts => {
                into_page(self.plugin.fetch_next_accounts(req).await?, |a| a.reference.clone())
            }
            TaskType::FetchExternalAccounts => into_page(
                self.plugin.fetch_next_external_accounts(req).await?,
                |a| a.reference.clone(),
            ),
            TaskType::FetchBalances => into_page(
                self.plugin.fetch_next_balances(req).await?,
                |b| b.account_reference.clone(),
            ),
            TaskType::FetchPayments => {
                into_page(self.plugin.fetch_next_payments(req).await?, |p| p.reference.clone())
            }
            TaskType::FetchOthers => {
                let resp = self
                    .plugin
                    .fetch_next_others(FetchNextOthersRequest {
                        name: task.name.clone(),
                        state: req.state,
                        page_size: req.page_size,
                        from_payload: req.from_payload,
                    })
                    .await?;
                into_page(resp, |o| o.id.clone())
            }
            TaskType::CreateWebhooks => Ok(Page {
                items: Vec::new(),
                new_state: Vec::new(),
                has_more: false,
            }),
        }
    }
}
