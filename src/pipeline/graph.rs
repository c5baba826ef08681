//! Dependency table between tasks and its layered execution order

use super::task::TaskName;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// The dependent is skipped when this dependency does not succeed
    Mandatory,
    /// The dependent runs with degraded input when this dependency does not succeed
    Optional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Dependency {
    pub task: TaskName,
    pub kind: EdgeKind,
}

impl Dependency {
    pub const fn mandatory(task: TaskName) -> Self {
        Self {
            task,
            kind: EdgeKind::Mandatory,
        }
    }

    pub const fn optional(task: TaskName) -> Self {
        Self {
            task,
            kind: EdgeKind::Optional,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("dependency cycle detected among tasks: {0:?}")]
    Cycle(Vec<TaskName>),

    #[error("task {0} is missing from the dependency table")]
    MissingTask(TaskName),

    #[error("task {0} declared more than once")]
    DuplicateTask(TaskName),
}

/// A validated dependency table
///
/// Construction runs Kahn's algorithm once, so a graph that exists is
/// guaranteed acyclic and its layers are fixed for every run.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    table: Vec<(TaskName, Vec<Dependency>)>,
    layers: Vec<Vec<TaskName>>,
}

impl DependencyGraph {
    /// The fixed pipeline table
    pub fn standard() -> Result<Self, GraphError> {
        use TaskName::*;
        Self::from_table(vec![
            (VideoAnalysis, vec![]),
            (RepositoryAnalysis, vec![Dependency::mandatory(VideoAnalysis)]),
            (
                ApplicationBuild,
                vec![Dependency::mandatory(RepositoryAnalysis)],
            ),
            (
                TrendAnalysis,
                vec![
                    Dependency::mandatory(VideoAnalysis),
                    Dependency::mandatory(RepositoryAnalysis),
                ],
            ),
            (
                Monetization,
                vec![
                    Dependency::mandatory(VideoAnalysis),
                    Dependency::mandatory(RepositoryAnalysis),
                    Dependency::mandatory(TrendAnalysis),
                    Dependency::optional(ApplicationBuild),
                ],
            ),
        ])
    }

    /// Validates a table that declares each of the five tasks exactly once
    pub(crate) fn from_table(table: Vec<(TaskName, Vec<Dependency>)>) -> Result<Self, GraphError> {
        for (i, (task, _)) in table.iter().enumerate() {
            if table[..i].iter().any(|(other, _)| other == task) {
                return Err(GraphError::DuplicateTask(*task));
            }
        }

        if let Some(missing) = TaskName::ALL
            .into_iter()
            .find(|task| !table.iter().any(|(t, _)| t == task))
        {
            return Err(GraphError::MissingTask(missing));
        }

        let layers = kahn_layers(&table)?;
        Ok(Self { table, layers })
    }

    pub fn required_inputs(&self, task: TaskName) -> &[Dependency] {
        self.table
            .iter()
            .find(|(t, _)| *t == task)
            .map(|(_, deps)| deps.as_slice())
            .unwrap_or(&[])
    }

    pub fn tasks(&self) -> impl Iterator<Item = TaskName> + '_ {
        self.table.iter().map(|(t, _)| *t)
    }

    pub fn layers(&self) -> &[Vec<TaskName>] {
        &self.layers
    }

    /// Tasks flattened in layer order
    pub fn execution_order(&self) -> Vec<TaskName> {
        self.layers.iter().flatten().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

fn kahn_layers(table: &[(TaskName, Vec<Dependency>)]) -> Result<Vec<Vec<TaskName>>, GraphError> {
    let mut remaining: Vec<usize> = table.iter().map(|(_, deps)| deps.len()).collect();
    let mut placed = vec![false; table.len()];
    let mut layers = Vec::new();

    loop {
        let ready: Vec<usize> = (0..table.len())
            .filter(|&i| !placed[i] && remaining[i] == 0)
            .collect();
        if ready.is_empty() {
            break;
        }

        for &i in &ready {
            placed[i] = true;
        }
        let finished: Vec<TaskName> = ready.iter().map(|&i| table[i].0).collect();
        for (i, (_, deps)) in table.iter().enumerate() {
            if placed[i] {
                continue;
            }
            let satisfied = deps.iter().filter(|d| finished.contains(&d.task)).count();
            remaining[i] -= satisfied;
        }
        layers.push(finished);
    }

    let stuck: Vec<TaskName> = table
        .iter()
        .zip(&placed)
        .filter(|(_, placed)| !**placed)
        .map(|((task, _), _)| *task)
        .collect();
    if !stuck.is_empty() {
        return Err(GraphError::Cycle(stuck));
    }

    Ok(layers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use TaskName::*;

    #[test]
    fn test_standard_layers() {
        let graph = DependencyGraph::standard().unwrap();
        assert_eq!(
            graph.layers(),
            &[
                vec![VideoAnalysis],
                vec![RepositoryAnalysis],
                vec![ApplicationBuild, TrendAnalysis],
                vec![Monetization],
            ]
        );
        assert_eq!(graph.len(), 5);
    }

    #[test]
    fn test_only_build_edge_is_optional() {
        let graph = DependencyGraph::standard().unwrap();
        let optional: Vec<_> = graph
            .tasks()
            .flat_map(|t| {
                graph
                    .required_inputs(t)
                    .iter()
                    .filter(|d| d.kind == EdgeKind::Optional)
                    .map(move |d| (t, d.task))
                    .collect::<Vec<_>>()
            })
            .collect();
        assert_eq!(optional, vec![(Monetization, ApplicationBuild)]);
    }

    #[test]
    fn test_dependencies_precede_dependents() {
        let graph = DependencyGraph::standard().unwrap();
        let order = graph.execution_order();
        for task in graph.tasks() {
            let pos = order.iter().position(|t| *t == task).unwrap();
            for dep in graph.required_inputs(task) {
                let dep_pos = order.iter().position(|t| *t == dep.task).unwrap();
                assert!(dep_pos < pos, "{} must run before {}", dep.task, task);
            }
        }
    }

    #[test]
    fn test_cycle_rejected() {
        let result = DependencyGraph::from_table(vec![
            (VideoAnalysis, vec![]),
            (RepositoryAnalysis, vec![Dependency::mandatory(TrendAnalysis)]),
            (ApplicationBuild, vec![Dependency::mandatory(RepositoryAnalysis)]),
            (TrendAnalysis, vec![Dependency::mandatory(RepositoryAnalysis)]),
            (Monetization, vec![Dependency::mandatory(VideoAnalysis)]),
        ]);
        assert_eq!(
            result.unwrap_err(),
            GraphError::Cycle(vec![RepositoryAnalysis, ApplicationBuild, TrendAnalysis])
        );
    }

    #[test]
    fn test_partial_table_rejected() {
        let result = DependencyGraph::from_table(vec![
            (VideoAnalysis, vec![]),
            (RepositoryAnalysis, vec![Dependency::mandatory(VideoAnalysis)]),
        ]);
        assert_eq!(result.unwrap_err(), GraphError::MissingTask(ApplicationBuild));
    }

    #[test]
    fn test_duplicate_task_rejected() {
        let result =
            DependencyGraph::from_table(vec![(VideoAnalysis, vec![]), (VideoAnalysis, vec![])]);
        assert_eq!(result.unwrap_err(), GraphError::DuplicateTask(VideoAnalysis));
    }

    #[test]
    fn test_layer_order_follows_declaration() {
        let graph = DependencyGraph::from_table(vec![
            (TrendAnalysis, vec![]),
            (VideoAnalysis, vec![]),
            (Monetization, vec![]),
            (RepositoryAnalysis, vec![]),
            (ApplicationBuild, vec![]),
        ])
        .unwrap();
        assert_eq!(
            graph.layers(),
            &[vec![
                TrendAnalysis,
                VideoAnalysis,
                Monetization,
                RepositoryAnalysis,
                ApplicationBuild
            ]]
        );
    }
}
