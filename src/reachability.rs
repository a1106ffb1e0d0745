//! Conservative per-body reachability: a statement is unreachable when it
//! follows an unconditional control transfer in the same block, and an
//! `if`/`elif` branch is dead when its condition is one of a small set of
//! constant falsy literals. Anything involving a name or a call is treated
//! as runtime-dynamic.

use ruff_python_ast::{self as ast, Expr, Stmt};
use ruff_text_size::{Ranged, TextRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truthiness {
    AlwaysTrue,
    AlwaysFalse,
    Unknown,
}

/// Classify a branch condition. The falsy set is exactly `False`, `None`,
/// `0`, `0.0`, `""`, `b""`, `()`, `[]`, `{}`; `True`, nonzero numbers and
/// non-empty literals are always taken.
pub fn static_truthiness(expr: &Expr) -> Truthiness {
    match expr {
        Expr::BooleanLiteral(node) => {
            if node.value {
                Truthiness::AlwaysTrue
            } else {
                Truthiness::AlwaysFalse
            }
        }
        Expr::NoneLiteral(_) => Truthiness::AlwaysFalse,
        Expr::NumberLiteral(node) => match &node.value {
            ast::Number::Int(int) => {
                if int.as_u64() == Some(0) {
                    Truthiness::AlwaysFalse
                } else {
                    Truthiness::AlwaysTrue
                }
            }
            ast::Number::Float(float) => {
                if *float == 0.0 {
                    Truthiness::AlwaysFalse
                } else {
                    Truthiness::AlwaysTrue
                }
            }
            ast::Number::Complex { .. } => Truthiness::Unknown,
        },
        Expr::StringLiteral(node) => {
            if node.value.is_empty() {
                Truthiness::AlwaysFalse
            } else {
                Truthiness::AlwaysTrue
            }
        }
        Expr::BytesLiteral(node) => {
            if node.value.is_empty() {
                Truthiness::AlwaysFalse
            } else {
                Truthiness::AlwaysTrue
            }
        }
        Expr::Tuple(node) => {
            if node.elts.is_empty() {
                Truthiness::AlwaysFalse
            } else {
                Truthiness::AlwaysTrue
            }
        }
        Expr::List(node) => {
            if node.elts.is_empty() {
                Truthiness::AlwaysFalse
            } else {
                Truthiness::AlwaysTrue
            }
        }
        Expr::Dict(node) => {
            if node.items.is_empty() {
                Truthiness::AlwaysFalse
            } else {
                Truthiness::AlwaysTrue
            }
        }
        // set literals cannot be empty
        Expr::Set(_) => Truthiness::AlwaysTrue,
        _ => Truthiness::Unknown,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadBranchKind {
    /// The branch's own condition is a statically false literal.
    DeadCondition,
    /// A preceding branch condition is statically true, so this
    /// `elif`/`else` clause can never run.
    UnreachableClause,
}

#[derive(Debug, Clone, Copy)]
pub struct DeadBranch {
    pub range: TextRange,
    pub kind: DeadBranchKind,
}

#[derive(Debug, Default)]
pub struct ReachabilityResult {
    /// One range per dead suffix: from the first unreachable statement to
    /// the end of its block.
    pub dead_suffixes: Vec<TextRange>,
    pub dead_branches: Vec<DeadBranch>,
}

pub fn analyze_module(suite: &[Stmt]) -> ReachabilityResult {
    let mut analyzer = ReachabilityAnalyzer::default();
    analyzer.scan_body(suite);
    analyzer.result
}

#[derive(Default)]
struct ReachabilityAnalyzer {
    result: ReachabilityResult,
}

impl ReachabilityAnalyzer {
    /// Scan a block; returns whether the block always transfers control.
    fn scan_body(&mut self, body: &[Stmt]) -> bool {
        let mut terminated = false;
        for stmt in body {
            if terminated {
                let start = stmt.range().start();
                let end = body.last().map(|last| last.range().end()).unwrap_or(start);
                self.result.dead_suffixes.push(TextRange::new(start, end));
                return true;
            }
            terminated = self.scan_stmt(stmt);
        }
        terminated
    }

    fn scan_stmt(&mut self, stmt: &Stmt) -> bool {
        match stmt {
            Stmt::Return(_) | Stmt::Raise(_) | Stmt::Break(_) | Stmt::Continue(_) => true,
            Stmt::If(node) => self.scan_if(node),
            Stmt::FunctionDef(node) => {
                self.scan_body(&node.body);
                false
            }
            Stmt::ClassDef(node) => {
                self.scan_body(&node.body);
                false
            }
            Stmt::For(node) => {
                self.scan_body(&node.body);
                self.scan_body(&node.orelse);
                false
            }
            Stmt::While(node) => {
                self.scan_body(&node.body);
                self.scan_body(&node.orelse);
                false
            }
            Stmt::With(node) => self.scan_body(&node.body),
            Stmt::Try(node) => {
                self.scan_body(&node.body);
                for handler in &node.handlers {
                    let ast::ExceptHandler::ExceptHandler(handler) = handler;
                    self.scan_body(&handler.body);
                }
                self.scan_body(&node.orelse);
                self.scan_body(&node.finalbody);
                false
            }
            Stmt::Match(node) => {
                for case in &node.cases {
                    self.scan_body(&case.body);
                }
                false
            }
            _ => false,
        }
    }

    /// Dead branches are recorded here; live arms are scanned. The `if`
    /// terminates only when every live arm terminates and there is no
    /// fall-through path left.
    fn scan_if(&mut self, node: &ast::StmtIf) -> bool {
        let mut prior_true = false;
        let mut all_terminate = true;
        match static_truthiness(&node.test) {
            Truthiness::AlwaysFalse => {
                self.result.dead_branches.push(DeadBranch {
                    range: node.test.range(),
                    kind: DeadBranchKind::DeadCondition,
                });
            }
            Truthiness::AlwaysTrue => {
                all_terminate &= self.scan_body(&node.body);
                prior_true = true;
            }
            Truthiness::Unknown => {
                all_terminate &= self.scan_body(&node.body);
            }
        }
        let mut has_else = false;
        for clause in &node.elif_else_clauses {
            if prior_true {
                self.result.dead_branches.push(DeadBranch {
                    range: clause.range(),
                    kind: DeadBranchKind::UnreachableClause,
                });
                continue;
            }
            match &clause.test {
                Some(test) => match static_truthiness(test) {
                    Truthiness::AlwaysFalse => {
                        self.result.dead_branches.push(DeadBranch {
                            range: test.range(),
                            kind: DeadBranchKind::DeadCondition,
                        });
                    }
                    Truthiness::AlwaysTrue => {
                        all_terminate &= self.scan_body(&clause.body);
                        prior_true = true;
                    }
                    Truthiness::Unknown => {
                        all_terminate &= self.scan_body(&clause.body);
                    }
                },
                None => {
                    has_else = true;
                    all_terminate &= self.scan_body(&clause.body);
                }
            }
        }
        (prior_true || has_else) && all_terminate
    }
}
