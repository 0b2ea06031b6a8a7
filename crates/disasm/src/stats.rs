//! Instruction statistics of one analysis pass
//!
//! Every parsed instruction is tallied by mnemonic and by stack-impact
//! class, so the consumer can show how much of the instruction stream the
//! analysis actually understood.

use std::collections::BTreeMap;

use crate::recognize::StackImpact;

/// Tally for one mnemonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationCount {
    /// Times the mnemonic was seen.
    pub executions: u64,
    /// Strongest stack impact observed for it.
    pub impact: StackImpact,
}

/// Statistics over every instruction of one listing.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    per_operation: BTreeMap<String, OperationCount>,
    per_impact: [u64; 4],
}

impl Statistics {
    pub fn record(&mut self, operation: &str, impact: StackImpact) {
        self.per_operation
            .entry(operation.to_string())
            .and_modify(|count| {
                count.executions += 1;
                count.impact = count.impact.max(impact);
            })
            .or_insert(OperationCount {
                executions: 1,
                impact,
            });
        self.per_impact[impact_index(impact)] += 1;
    }

    /// Total number of instructions seen.
    pub fn total(&self) -> u64 {
        self.per_impact.iter().sum()
    }

    /// Instructions seen with the given impact class.
    pub fn count(&self, impact: StackImpact) -> u64 {
        self.per_impact[impact_index(impact)]
    }

    /// Per-mnemonic tallies in mnemonic order.
    pub fn operations(&self) -> impl Iterator<Item = (&str, OperationCount)> {
        self.per_operation
            .iter()
            .map(|(operation, count)| (operation.as_str(), *count))
    }

    pub fn is_empty(&self) -> bool {
        self.per_operation.is_empty()
    }
}

fn impact_index(impact: StackImpact) -> usize {
    match impact {
        StackImpact::No => 0,
        StackImpact::Clear => 1,
        StackImpact::Potential => 2,
        StackImpact::Weak => 3,
    }
}
