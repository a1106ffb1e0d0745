//! RP005 (unreachable statement) and RP006 (dead branch), thin checkers
//! over the reachability analysis.

use crate::analyze::report::Rule;
use crate::reachability::DeadBranchKind;
use crate::rules::Checker;

/// One diagnostic per dead suffix, spanning from the first unreachable
/// statement to the end of its block.
pub(crate) fn unreachable_statements(checker: &mut Checker) {
    let suffixes = checker.module.reach.dead_suffixes.clone();
    for range in suffixes {
        checker.push(
            Rule::UnreachableStatement,
            range,
            "",
            "Unreachable code: a preceding statement always transfers control".to_string(),
        );
    }
}

pub(crate) fn dead_branches(checker: &mut Checker) {
    let branches = checker.module.reach.dead_branches.clone();
    for branch in branches {
        match branch.kind {
            DeadBranchKind::DeadCondition => {
                let condition = checker.module.slice(branch.range).to_string();
                checker.push(
                    Rule::DeadBranch,
                    branch.range,
                    &condition,
                    format!("Branch condition `{condition}` is always false"),
                );
            }
            DeadBranchKind::UnreachableClause => {
                checker.push(
                    Rule::DeadBranch,
                    branch.range,
                    "",
                    "Branch can never run: a preceding condition is always true".to_string(),
                );
            }
        }
    }
}
