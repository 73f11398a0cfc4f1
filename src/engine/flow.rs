use crate::error::FlowError;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::batch::{BatchNode, BatchStage};
use super::context::Context;
use super::node::{Node, Stage, Step, DEFAULT_SIGNAL};

const DEFAULT_MAX_STEPS: usize = 1000;

#[derive(Debug, Clone)]
pub struct StageRecord {
    pub name: String,
    pub signal: String,
    pub duration: Duration,
}

#[derive(Debug)]
pub struct FlowReport {
    pub visited: Vec<StageRecord>,
    pub total_duration: Duration,
}

impl FlowReport {
    pub fn stage_names(&self) -> Vec<&str> {
        self.visited.iter().map(|r| r.name.as_str()).collect()
    }
}

/// Directed graph of stages; edges are keyed by (stage, signal)
pub struct Flow {
    start: String,
    stages: HashMap<String, Box<dyn Stage>>,
    edges: HashMap<(String, String), String>,
    max_steps: usize,
}

#[derive(Default)]
pub struct FlowBuilder {
    start: Option<String>,
    stages: Vec<Box<dyn Stage>>,
    edges: Vec<(String, String, String)>,
    max_steps: Option<usize>,
}

impl FlowBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(mut self, stage: Box<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn node<N: Node + 'static>(self, node: N) -> Self {
        self.stage(Box::new(Step(node)))
    }

    pub fn batch<B: BatchNode>(self, node: B) -> Self {
        self.stage(Box::new(BatchStage::new(node)))
    }

    /// Route `signal` from `from` to `to`
    pub fn edge(mut self, from: &str, signal: &str, to: &str) -> Self {
        self.edges
            .push((from.to_string(), signal.to_string(), to.to_string()));
        self
    }

    /// Route the default signal from `from` to `to`
    pub fn then(self, from: &str, to: &str) -> Self {
        self.edge(from, DEFAULT_SIGNAL, to)
    }

    /// Entry stage; the first registered stage when unset
    pub fn start(mut self, name: &str) -> Self {
        self.start = Some(name.to_string());
        self
    }

    #[cfg(test)]
    pub fn max_steps(mut self, limit: usize) -> Self {
        self.max_steps = Some(limit);
        self
    }

    pub fn build(self) -> Result<Flow, FlowError> {
        let first = self.stages.first().map(|s| s.name().to_string());

        let mut stages = HashMap::with_capacity(self.stages.len());
        for stage in self.stages {
            let name = stage.name().to_string();
            if stages.contains_key(&name) {
                return Err(FlowError::DuplicateStage(name));
            }
            stages.insert(name, stage);
        }

        let start = self
            .start
            .or(first)
            .ok_or_else(|| FlowError::UnknownStage("<start>".to_string()))?;
        if !stages.contains_key(&start) {
            return Err(FlowError::UnknownStage(start));
        }

        let mut edges = HashMap::with_capacity(self.edges.len());
        for (from, signal, to) in self.edges {
            for name in [&from, &to] {
                if !stages.contains_key(name) {
                    return Err(FlowError::UnknownStage(name.clone()));
                }
            }
            edges.insert((from, signal), to);
        }

        Ok(Flow {
            start,
            stages,
            edges,
            max_steps: self.max_steps.unwrap_or(DEFAULT_MAX_STEPS),
        })
    }
}

impl Flow {
    pub fn builder() -> FlowBuilder {
        FlowBuilder::new()
    }

    /// Stage names reachable from the start, for dry runs
    pub fn reachable(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut queue = vec![self.start.clone()];
        while let Some(name) = queue.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }
            let mut next: Vec<_> = self
                .edges
                .iter()
                .filter(|((from, _), _)| *from == name)
                .map(|((_, signal), to)| (signal.clone(), to.clone()))
                .collect();
            // default route first, the rest by signal name
            next.sort_by_key(|(signal, _)| (signal != DEFAULT_SIGNAL, signal.clone()));
            queue.extend(next.into_iter().rev().map(|(_, to)| to));
            order.push(name);
        }
        order
    }

    /// Run stages from the start until one returns a signal with no edge
    pub async fn run(&self, ctx: &mut Context) -> Result<FlowReport, FlowError> {
        let started = Instant::now();
        let mut visited = Vec::new();
        let mut current = Some(self.start.clone());

        while let Some(name) = current {
            if visited.len() >= self.max_steps {
                return Err(FlowError::StepLimit(self.max_steps));
            }
            let stage = self
                .stages
                .get(&name)
                .ok_or_else(|| FlowError::UnknownStage(name.clone()))?;

            info!("Stage '{}' starting", name);
            let stage_start = Instant::now();
            let signal = stage.run(ctx).await.map_err(|f| FlowError::Stage {
                stage: name.clone(),
                input: f.input,
                source: f.error,
            })?;
            let duration = stage_start.elapsed();

            current = self.edges.get(&(name.clone(), signal.clone())).cloned();
            match &current {
                Some(next) => debug!("'{}' --{}--> '{}'", name, signal, next),
                None => debug!("'{}' returned '{}' with no outgoing edge; flow ends", name, signal),
            }
            info!("Stage '{}' finished in {:?}", name, duration);

            visited.push(StageRecord {
                name,
                signal,
                duration,
            });
        }

        Ok(FlowReport {
            visited,
            total_duration: started.elapsed(),
        })
    }
}
