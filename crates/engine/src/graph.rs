//! `WorkflowGraph`: named tasks plus their prerequisites.
//!
//! Rules enforced:
//! 1. Task names are unique (checked on insertion).
//! 2. Every dependency names a task in the graph (checked on ordering, so
//!    tasks may be added before their prerequisites).
//! 3. The dependency relation is acyclic (checked on ordering).
//!
//! Ordering is Kahn's algorithm run layer by layer: each layer ("ready
//! batch") holds the tasks whose prerequisites all sit in earlier layers.
//! Within a layer tasks keep insertion order, so the same graph always yields
//! the same order.

use std::collections::{HashMap, HashSet};

use tasks::{Reference, Task};

use crate::GraphError;

/// A task together with its declared prerequisites.
pub struct TaskNode {
    task: Box<dyn Task>,
    dependencies: Vec<String>,
    enabled: bool,
}

impl TaskNode {
    pub fn name(&self) -> &str {
        self.task.name()
    }

    pub fn task(&self) -> &dyn Task {
        self.task.as_ref()
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// A reference to a task that is not among the reader's declared dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndeclaredReference {
    pub task: String,
    pub reference: Reference,
}

#[derive(Default)]
pub struct WorkflowGraph {
    nodes: Vec<TaskNode>,
    index: HashMap<String, usize>,
}

impl WorkflowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task that runs after every task named in `dependencies`.
    ///
    /// Repeated dependency names are collapsed.
    ///
    /// # Errors
    /// [`GraphError::DuplicateTask`] if the name is taken.
    pub fn add_task<I, S>(&mut self, task: Box<dyn Task>, dependencies: I) -> Result<(), GraphError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = task.name().to_owned();
        if self.index.contains_key(&name) {
            return Err(GraphError::DuplicateTask(name));
        }

        let mut seen = HashSet::new();
        let dependencies = dependencies
            .into_iter()
            .map(Into::into)
            .filter(|d: &String| seen.insert(d.clone()))
            .collect();

        self.index.insert(name, self.nodes.len());
        self.nodes.push(TaskNode {
            task,
            dependencies,
            enabled: true,
        });
        Ok(())
    }

    /// Enable or disable a task. Disabled tasks stay in the graph and keep
    /// their place in the order but are reported as skipped.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> Result<(), GraphError> {
        let idx = *self
            .index
            .get(name)
            .ok_or_else(|| GraphError::UnknownTask(name.to_owned()))?;
        self.nodes[idx].enabled = enabled;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&TaskNode> {
        self.index.get(name).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &TaskNode> {
        self.nodes.iter()
    }

    /// Check dependency names and acyclicity without keeping the order.
    pub fn validate(&self) -> Result<(), GraphError> {
        self.layers().map(|_| ())
    }

    /// Task names such that each comes after all of its dependencies.
    ///
    /// # Errors
    /// - [`GraphError::UnknownDependency`] if a dependency was never added.
    /// - [`GraphError::CyclicDependency`] if no order exists.
    pub fn topological_order(&self) -> Result<Vec<String>, GraphError> {
        Ok(self.ready_batches()?.into_iter().flatten().collect())
    }

    /// The topological order split into batches; every task's dependencies
    /// are in strictly earlier batches, so tasks within one batch are
    /// independent of each other.
    pub fn ready_batches(&self) -> Result<Vec<Vec<String>>, GraphError> {
        Ok(self
            .layers()?
            .into_iter()
            .map(|layer| layer.into_iter().map(|i| self.nodes[i].name().to_owned()).collect())
            .collect())
    }

    /// References whose upstream task is not a declared dependency of the reader.
    pub fn undeclared_references(&self) -> Vec<UndeclaredReference> {
        self.nodes
            .iter()
            .flat_map(|node| {
                node.task
                    .references()
                    .into_iter()
                    .filter(|r| !node.dependencies.iter().any(|d| d == r.task()))
                    .map(|reference| UndeclaredReference {
                        task: node.name().to_owned(),
                        reference,
                    })
            })
            .collect()
    }

    /// Text view, one line per task in execution order.
    pub fn render(&self) -> Result<String, GraphError> {
        let mut lines = Vec::with_capacity(self.nodes.len());
        for name in self.topological_order()? {
            let Some(node) = self.get(&name) else { continue };
            let mut line = if node.dependencies.is_empty() {
                format!("{name} (root)")
            } else {
                format!("{name} <- [{}]", node.dependencies.join(", "))
            };
            if !node.enabled {
                line.push_str(" [disabled]");
            }
            lines.push(line);
        }
        Ok(lines.join("\n"))
    }

    // -----------------------------------------------------------------------
    // Internal: Kahn's algorithm over node indices.
    // -----------------------------------------------------------------------

    fn layers(&self) -> Result<Vec<Vec<usize>>, GraphError> {
        let n = self.nodes.len();
        let mut in_degree = vec![0usize; n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];

        for (i, node) in self.nodes.iter().enumerate() {
            for dep in &node.dependencies {
                let &d = self.index.get(dep).ok_or_else(|| GraphError::UnknownDependency {
                    task: node.name().to_owned(),
                    dependency: dep.clone(),
                })?;
                in_degree[i] += 1;
                dependents[d].push(i);
            }
        }

        let mut current: Vec<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut layers = Vec::new();
        let mut placed = 0;

        while !current.is_empty() {
            placed += current.len();
            let mut next = Vec::new();
            for &i in &current {
                for &j in &dependents[i] {
                    in_degree[j] -= 1;
                    if in_degree[j] == 0 {
                        next.push(j);
                    }
                }
            }
            next.sort_unstable();
            layers.push(std::mem::replace(&mut current, next));
        }

        if placed != n {
            return Err(GraphError::CyclicDependency {
                members: self.find_cycle(&in_degree),
            });
        }
        Ok(layers)
    }

    /// Walk from the first unplaced node to an unplaced prerequisite until a
    /// node repeats. Every unplaced node has at least one unplaced
    /// prerequisite, so the walk always closes a cycle.
    fn find_cycle(&self, in_degree: &[usize]) -> Vec<String> {
        let Some(start) = (0..self.nodes.len()).find(|&i| in_degree[i] > 0) else {
            return Vec::new();
        };

        let mut path = vec![start];
        let mut position: HashMap<usize, usize> = HashMap::from([(start, 0)]);
        let mut at = start;

        loop {
            let next = self.nodes[at]
                .dependencies
                .iter()
                .filter_map(|d| self.index.get(d).copied())
                .find(|&d| in_degree[d] > 0);
            let Some(next) = next else { break };

            if let Some(&pos) = position.get(&next) {
                path.drain(..pos);
                break;
            }
            position.insert(next, path.len());
            path.push(next);
            at = next;
        }

        // The walk followed "depends on" edges; flip it to execution direction.
        path.reverse();
        path.into_iter().map(|i| self.nodes[i].name().to_owned()).collect()
    }
}
