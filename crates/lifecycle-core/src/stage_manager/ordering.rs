use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use crate::stage_manager::Stage;
use crate::stage_manager::error::StageSystemError;

/// A validated, totally ordered sequence of stages.
///
/// The position of a stage in the set is its ordinal. Once built, a set is
/// never mutated; every engine operation that names a stage resolves it
/// against this ordering.
#[derive(Clone, PartialEq, Eq)]
pub struct StageSet {
    /// Stages in execution order
    stages: Vec<Stage>,
    /// Stage -> ordinal lookup
    positions: HashMap<Stage, usize>,
}

impl fmt::Debug for StageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.stages.iter().map(Stage::name)).finish()
    }
}

impl StageSet {
    /// Build a set whose order is the iteration order of `stages`.
    pub fn new<I>(stages: I) -> Result<Self, StageSystemError>
    where
        I: IntoIterator,
        I::Item: Into<Stage>,
    {
        let stages: Vec<Stage> = stages.into_iter().map(Into::into).collect();
        if stages.is_empty() {
            return Err(StageSystemError::EmptyStageSet);
        }

        let mut positions = HashMap::with_capacity(stages.len());
        for (ordinal, stage) in stages.iter().enumerate() {
            if positions.insert(stage.clone(), ordinal).is_some() {
                return Err(StageSystemError::DuplicateStage { stage: stage.clone() });
            }
        }

        Ok(Self { stages, positions })
    }

    /// `configure < start < stop`
    pub fn standard() -> Self {
        Self::from_known(vec![Stage::CONFIGURE, Stage::START, Stage::STOP])
    }

    /// `configure < start < announce < unannounce < stop`
    pub fn service_discovery() -> Self {
        Self::from_known(vec![
            Stage::CONFIGURE,
            Stage::START,
            Stage::ANNOUNCE,
            Stage::UNANNOUNCE,
            Stage::STOP,
        ])
    }

    // Presets are non-empty and duplicate free, so the map can be built directly.
    fn from_known(stages: Vec<Stage>) -> Self {
        let positions = stages.iter().cloned().enumerate().map(|(i, s)| (s, i)).collect();
        Self { stages, positions }
    }

    /// Build a set from explicit ordinals. Stages are sorted by ordinal; gaps
    /// are allowed, duplicates are not.
    pub fn from_ordinals<I, S>(entries: I) -> Result<Self, StageSystemError>
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<Stage>,
    {
        let mut entries: Vec<(Stage, i64)> = entries.into_iter().map(|(s, o)| (s.into(), o)).collect();
        entries.sort_by_key(|(_, ordinal)| *ordinal);

        for pair in entries.windows(2) {
            if pair[0].1 == pair[1].1 {
                return Err(StageSystemError::DuplicateOrdinal {
                    ordinal: pair[0].1,
                    first: pair[0].0.clone(),
                    second: pair[1].0.clone(),
                });
            }
        }

        Self::new(entries.into_iter().map(|(stage, _)| stage))
    }

    /// Build a set from precedence constraints `(before, after)`.
    ///
    /// The constraints must pin down exactly one order: a cycle is reported
    /// with its path, and a point where two stages could equally come next is
    /// reported as ambiguous.
    pub fn from_precedence<I, S, C>(stages: I, constraints: C) -> Result<Self, StageSystemError>
    where
        I: IntoIterator<Item = S>,
        S: Into<Stage>,
        C: IntoIterator<Item = (Stage, Stage)>,
    {
        let declared: Vec<Stage> = stages.into_iter().map(Into::into).collect();
        if declared.is_empty() {
            return Err(StageSystemError::EmptyStageSet);
        }

        let mut index = HashMap::with_capacity(declared.len());
        for (pos, stage) in declared.iter().enumerate() {
            if index.insert(stage.clone(), pos).is_some() {
                return Err(StageSystemError::DuplicateStage { stage: stage.clone() });
            }
        }

        let n = declared.len();
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut in_degree = vec![0usize; n];
        for (before, after) in constraints {
            let b = *index
                .get(&before)
                .ok_or_else(|| StageSystemError::UnknownPrecedenceStage { stage: before.clone() })?;
            let a = *index
                .get(&after)
                .ok_or_else(|| StageSystemError::UnknownPrecedenceStage { stage: after.clone() })?;
            if a == b {
                return Err(StageSystemError::DependencyCycleDetected {
                    cycle_path: vec![before.clone(), before],
                });
            }
            if !successors[b].contains(&a) {
                successors[b].push(a);
                in_degree[a] += 1;
            }
        }

        // Kahn's algorithm, but a total order needs exactly one ready stage per step
        let mut placed = vec![false; n];
        let mut order = Vec::with_capacity(n);
        while order.len() < n {
            let ready: Vec<usize> = (0..n).filter(|&i| !placed[i] && in_degree[i] == 0).collect();
            match ready.as_slice() {
                [only] => {
                    placed[*only] = true;
                    order.push(*only);
                    for &next in &successors[*only] {
                        in_degree[next] -= 1;
                    }
                }
                [] => {
                    let cycle = find_cycle(&successors, &placed);
                    return Err(StageSystemError::DependencyCycleDetected {
                        cycle_path: cycle.into_iter().map(|i| declared[i].clone()).collect(),
                    });
                }
                many => {
                    return Err(StageSystemError::AmbiguousOrder {
                        candidates: many.iter().map(|&i| declared[i].clone()).collect(),
                    });
                }
            }
        }

        Self::new(order.into_iter().map(|i| declared[i].clone()))
    }

    /// Number of stages in the set
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the set has no stages
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stages in execution order
    pub fn iter(&self) -> std::slice::Iter<'_, Stage> {
        self.stages.iter()
    }

    /// The earliest stage
    pub fn first(&self) -> &Stage {
        &self.stages[0]
    }

    /// The terminal stage
    pub fn last(&self) -> &Stage {
        &self.stages[self.stages.len() - 1]
    }

    /// Stage at the given ordinal, if any
    pub fn get(&self, ordinal: usize) -> Option<&Stage> {
        self.stages.get(ordinal)
    }

    /// Check whether the stage belongs to this set
    pub fn contains(&self, stage: &Stage) -> bool {
        self.positions.contains_key(stage)
    }

    /// Ordinal of a stage, or `None` for a stage outside the set
    pub fn position(&self, stage: &Stage) -> Option<usize> {
        self.positions.get(stage).copied()
    }

    /// Ordinal of a stage, failing for a stage outside the set
    pub fn ordinal(&self, stage: &Stage) -> Result<usize, StageSystemError> {
        self.position(stage)
            .ok_or_else(|| StageSystemError::UnknownStage { stage: stage.clone() })
    }

    /// Compare two stages by their position in this set.
    pub fn compare(&self, a: &Stage, b: &Stage) -> Result<Ordering, StageSystemError> {
        Ok(self.ordinal(a)?.cmp(&self.ordinal(b)?))
    }

    /// The stage immediately after `stage`, or `None` when `stage` is terminal.
    pub fn next(&self, stage: &Stage) -> Result<Option<&Stage>, StageSystemError> {
        let ordinal = self.ordinal(stage)?;
        Ok(self.stages.get(ordinal + 1))
    }
}

impl Default for StageSet {
    fn default() -> Self {
        Self::standard()
    }
}

impl<'a> IntoIterator for &'a StageSet {
    type Item = &'a Stage;
    type IntoIter = std::slice::Iter<'a, Stage>;

    fn into_iter(self) -> Self::IntoIter {
        self.stages.iter()
    }
}

/// Find a cycle among the stages Kahn's algorithm could not place (DFS with
/// an explicit recursion stack).
fn find_cycle(successors: &[Vec<usize>], placed: &[bool]) -> Vec<usize> {
    let mut visited = vec![false; successors.len()];
    let mut stack = Vec::new();
    for start in 0..successors.len() {
        if placed[start] || visited[start] {
            continue;
        }
        if let Some(path) = visit(start, successors, placed, &mut visited, &mut stack) {
            return path;
        }
    }
    Vec::new()
}

fn visit(
    node: usize,
    successors: &[Vec<usize>],
    placed: &[bool],
    visited: &mut [bool],
    stack: &mut Vec<usize>,
) -> Option<Vec<usize>> {
    visited[node] = true;
    stack.push(node);

    for &next in &successors[node] {
        if placed[next] {
            continue;
        }
        if let Some(pos) = stack.iter().position(|&s| s == next) {
            let mut path = stack[pos..].to_vec();
            path.push(next);
            return Some(path);
        }
        if !visited[next] {
            if let Some(path) = visit(next, successors, placed, visited, stack) {
                return Some(path);
            }
        }
    }

    stack.pop();
    None
}
