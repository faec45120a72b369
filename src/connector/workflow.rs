use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    FetchOthers,
    FetchAccounts,
    FetchBalances,
    FetchExternalAccounts,
    FetchPayments,
    CreateWebhooks,
}

/// One node of a connector's static task forest.
///
/// Children run once per item produced by their parent, receiving that item
/// as `from_payload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorTaskTree {
    pub task_type: TaskType,
    pub name: String,
    pub periodically: bool,
    #[serde(default)]
    pub next_tasks: Vec<ConnectorTaskTree>,
}

pub type ConnectorTasksTree = Vec<ConnectorTaskTree>;

impl ConnectorTaskTree {
    pub fn new(task_type: TaskType, name: impl Into<String>) -> Self {
        Self {
            task_type,
            name: name.into(),
            periodically: false,
            next_tasks: Vec::new(),
        }
    }

    pub fn periodically(mut self) -> Self {
        self.periodically = true;
        self
    }

    pub fn then(mut self, next: ConnectorTaskTree) -> Self {
        self.next_tasks.push(next);
        self
    }

    /// Number of nodes in this subtree.
    pub fn task_count(&self) -> usize {
        1 + self
            .next_tasks
            .iter()
            .map(ConnectorTaskTree::task_count)
            .sum::<usize>()
    }
}
