// src/build/step.rs

//! Build steps, their outcomes, and sets of steps.

use std::collections::BTreeSet;
use std::fmt;

use crate::types::BuildSequence;

/// One idempotent unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BuildStep {
    Clean,
    CompileScripts,
    CompileStyles,
    Generate,
}

impl BuildStep {
    pub const ALL: [BuildStep; 4] = [
        BuildStep::Clean,
        BuildStep::CompileScripts,
        BuildStep::CompileStyles,
        BuildStep::Generate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BuildStep::Clean => "clean",
            BuildStep::CompileScripts => "compile-scripts",
            BuildStep::CompileStyles => "compile-styles",
            BuildStep::Generate => "generate",
        }
    }
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of running one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Success,
    /// Finished, but this many inputs failed and kept their previous output.
    Degraded(usize),
    /// The step itself failed (generator exit code, or `-1`).
    Failed(i32),
}

impl StepOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, StepOutcome::Failed(_))
    }
}

/// A set of steps, e.g. the union of several requested sequences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepSet(BTreeSet<BuildStep>);

impl StepSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_sequence(sequence: BuildSequence) -> Self {
        use BuildStep::*;
        let steps: &[BuildStep] = match sequence {
            BuildSequence::Full => &[Clean, CompileScripts, CompileStyles, Generate],
            BuildSequence::Rebuild => &[CompileScripts, CompileStyles, Generate],
            BuildSequence::Compile => &[CompileScripts, CompileStyles],
            BuildSequence::Generate => &[Generate],
            BuildSequence::Clean => &[Clean],
        };
        steps.iter().copied().collect()
    }

    pub fn from_sequences<I>(sequences: I) -> Self
    where
        I: IntoIterator<Item = BuildSequence>,
    {
        let mut set = Self::new();
        for seq in sequences {
            set.merge(&Self::from_sequence(seq));
        }
        set
    }

    pub fn merge(&mut self, other: &StepSet) {
        self.0.extend(other.0.iter().copied());
    }

    pub fn insert(&mut self, step: BuildStep) -> bool {
        self.0.insert(step)
    }

    pub fn contains(&self, step: BuildStep) -> bool {
        self.0.contains(&step)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = BuildStep> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<BuildStep> for StepSet {
    fn from_iter<T: IntoIterator<Item = BuildStep>>(iter: T) -> Self {
        StepSet(iter.into_iter().collect())
    }
}

impl From<BuildSequence> for StepSet {
    fn from(sequence: BuildSequence) -> Self {
        Self::from_sequence(sequence)
    }
}

impl fmt::Display for StepSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(|s| s.name()).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_of_sequences() {
        let set = StepSet::from_sequences([BuildSequence::Clean, BuildSequence::Generate]);
        assert_eq!(set.to_string(), "[clean, generate]");

        let set = StepSet::from_sequences([BuildSequence::Compile, BuildSequence::Rebuild]);
        assert_eq!(set, StepSet::from_sequence(BuildSequence::Rebuild));
    }

    #[test]
    fn full_is_every_step() {
        assert_eq!(StepSet::from(BuildSequence::Full).len(), BuildStep::ALL.len());
    }
}
