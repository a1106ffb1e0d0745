use ruff_python_ast::{self as ast, Expr};

/// Extract a static `__all__` literal: a list/tuple/set of string
/// literals, optionally concatenated with `+`. Anything else leaves the
/// module in the "no declared `__all__`" state; nothing is evaluated.
pub fn extract_dunder_all(expr: &Expr) -> Option<Vec<String>> {
    match expr {
        Expr::List(ast::ExprList { elts, .. }) => string_elements(elts),
        Expr::Tuple(ast::ExprTuple { elts, .. }) => string_elements(elts),
        Expr::Set(ast::ExprSet { elts, .. }) => string_elements(elts),
        Expr::BinOp(ast::ExprBinOp {
            left,
            op: ast::Operator::Add,
            right,
            ..
        }) => {
            let mut names = extract_dunder_all(left)?;
            names.extend(extract_dunder_all(right)?);
            Some(names)
        }
        _ => None,
    }
}

fn string_elements(elts: &[Expr]) -> Option<Vec<String>> {
    elts.iter()
        .map(|elt| match elt {
            Expr::StringLiteral(ast::ExprStringLiteral { value, .. }) => {
                Some(value.to_string())
            }
            _ => None,
        })
        .collect()
}
