//! Static analysis of a parsed template, without evaluating it.
//!
//! Callers use this ahead of execution to check that every required binding
//! will be supplied and that order-by fragments are safely static.

use std::collections::BTreeSet;

use crate::ast::{TemplateExpr, TemplateNode};

/// What a template needs from its caller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Analysis {
    /// Root binding names the template reads, excluding loop variables.
    pub required_bindings: BTreeSet<String>,
    /// True when any whitelisted order-by fragment contains a parameter,
    /// which the renderer will reject.
    pub order_by_has_params: bool,
}

/// Walk the tree collecting free binding names and order-by parameter use.
pub fn analyze(nodes: &[TemplateNode]) -> Analysis {
    let mut analysis = Analysis::default();
    let mut shadows = Vec::new();
    walk(nodes, &mut shadows, false, &mut analysis);
    analysis
}

fn walk(
    nodes: &[TemplateNode],
    shadows: &mut Vec<String>,
    in_order_by_fragment: bool,
    analysis: &mut Analysis,
) {
    for node in nodes {
        match node {
            TemplateNode::Text(_) | TemplateNode::Table(_) | TemplateNode::Column { .. } => {}
            TemplateNode::Param(expr) => {
                if in_order_by_fragment {
                    analysis.order_by_has_params = true;
                }
                collect(expr, shadows, analysis);
            }
            TemplateNode::If { cond, body } => {
                collect(cond, shadows, analysis);
                walk(body, shadows, in_order_by_fragment, analysis);
            }
            TemplateNode::For { var, source, body } => {
                collect(source, shadows, analysis);
                shadows.push(var.clone());
                walk(body, shadows, in_order_by_fragment, analysis);
                shadows.pop();
            }
            TemplateNode::Clause { body, .. } | TemplateNode::Or(body) => {
                walk(body, shadows, in_order_by_fragment, analysis);
            }
            TemplateNode::In(source) => collect(source, shadows, analysis),
            TemplateNode::Page { page, page_size } => {
                collect(page, shadows, analysis);
                collect(page_size, shadows, analysis);
            }
            TemplateNode::OrderBy {
                selection, allowed, ..
            } => {
                collect(selection, shadows, analysis);
                for (_, fragment) in allowed {
                    walk(fragment, shadows, true, analysis);
                }
            }
            TemplateNode::Fn { args, .. } => {
                for arg in args {
                    walk(arg, shadows, in_order_by_fragment, analysis);
                }
            }
        }
    }
}

fn collect(expr: &TemplateExpr, shadows: &[String], analysis: &mut Analysis) {
    match expr {
        TemplateExpr::Literal(_) => {}
        TemplateExpr::Path(segments) => {
            if let Some(root) = segments.first() {
                if !shadows.iter().any(|s| s == &root.name) {
                    analysis.required_bindings.insert(root.name.clone());
                }
            }
        }
        TemplateExpr::Not(inner) => collect(inner, shadows, analysis),
        TemplateExpr::Binary { left, right, .. } => {
            collect(left, shadows, analysis);
            collect(right, shadows, analysis);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_template;

    fn required(template: &str) -> Vec<String> {
        analyze(&parse_template(template).unwrap())
            .required_bindings
            .into_iter()
            .collect()
    }

    #[test]
    fn collects_free_names_across_directives() {
        let names = required(
            "@where{ @if(:a && :b > 1){ AND x = :c } AND y IN @in(:d) } @page(:p, :n)",
        );
        assert_eq!(names, vec!["a", "b", "c", "d", "n", "p"]);
    }

    #[test]
    fn loop_variable_shadows_inner_references() {
        let names = required("@for(tag : :tags){ :tag @if(tag == :needle){ ! } }");
        assert_eq!(names, vec!["needle", "tags"]);
    }

    #[test]
    fn shadow_ends_with_the_loop() {
        let names = required("@for(x : :xs){ :x } :x");
        assert_eq!(names, vec!["x", "xs"]);
    }

    #[test]
    fn nested_loops_shadow_independently() {
        let names = required("@for(a : :outer){ @for(b : a.items){ :b :z } }");
        assert_eq!(names, vec!["outer", "z"]);
    }

    #[test]
    fn order_by_fragment_params_are_flagged() {
        let analysis = analyze(
            &parse_template(r#"@orderBy(:sort, allowed = { K: "f(:x)" })"#).unwrap(),
        );
        assert!(analysis.order_by_has_params);
        assert!(analysis.required_bindings.contains("sort"));
        assert!(analysis.required_bindings.contains("x"));
    }

    #[test]
    fn clean_order_by_is_not_flagged() {
        let analysis = analyze(
            &parse_template(r#"@orderBy(:sort, allowed = { K: "id ASC" })"#).unwrap(),
        );
        assert!(!analysis.order_by_has_params);
    }
}
