//! Rewriting of non-shell template syntax into inert shell placeholders.
//!
//! Matching is line-local and non-greedy, so a line keeps its line count and
//! two expressions on the same line are replaced separately. Substitution is
//! lossy: only the shell syntax of the result matters.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use crate::document::Node;

/// Placeholder for GitHub `${{ ... }}` expressions.
pub const ACTION_EXPRESSION: &str = "$ACTION_EXPRESSION";
/// Placeholder for CircleCI `<< pipeline.parameters.x >>` values.
pub const PIPELINE_PARAMETER: &str = "\"$PARAMETER\"";
/// Placeholder for Ansible Jinja `{{ ... }}` expressions.
pub const JINJA_EXPRESSION: &str = "$JINJA_EXPRESSION";
/// Placeholder for Taskfile Go-template `{{.Var}}` expressions.
pub const TASK_VARIABLE: &str = "$TASK_VARIABLE";

static GITHUB_EXPRESSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{\{.*?\}\}").expect("valid regex"));

// A dotted name is required so that `cat << EOF >> out` is left alone.
static PIPELINE_VALUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<<\s*[A-Za-z_][\w-]*(?:\.[\w-]+)+\s*>>").expect("valid regex")
});

static TEMPLATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{.*?\}\}").expect("valid regex"));

/// A family of foreign template syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// `${{ ... }}`
    GitHubExpression,
    /// `<< a.b >>`
    PipelineValue,
    /// `{{ ... }}` in Ansible
    Jinja,
    /// `{{ ... }}` in Taskfiles
    GoTemplate,
}

impl Marker {
    fn pattern(&self) -> &'static Regex {
        match self {
            Marker::GitHubExpression => &GITHUB_EXPRESSION_RE,
            Marker::PipelineValue => &PIPELINE_VALUE_RE,
            Marker::Jinja | Marker::GoTemplate => &TEMPLATE_RE,
        }
    }

    /// Shell text that replaces a match.
    pub fn replacement(&self) -> &'static str {
        match self {
            Marker::GitHubExpression => ACTION_EXPRESSION,
            Marker::PipelineValue => PIPELINE_PARAMETER,
            Marker::Jinja => JINJA_EXPRESSION,
            Marker::GoTemplate => TASK_VARIABLE,
        }
    }
}

/// Replace every occurrence of `markers` in `line`.
///
/// Returns the input unchanged (borrowed) when nothing matches.
pub fn substitute<'a>(line: &'a str, markers: &[Marker]) -> Cow<'a, str> {
    let mut out = Cow::Borrowed(line);
    for marker in markers {
        let re = marker.pattern();
        if re.is_match(&out) {
            // NoExpand keeps the `$` in the replacement literal
            let replaced = re
                .replace_all(&out, regex::NoExpand(marker.replacement()))
                .into_owned();
            out = Cow::Owned(replaced);
        }
    }
    out
}

/// Placeholder line for a GitLab `!reference [job, key, ...]` tag.
///
/// The reference is not resolved; the line is a shell comment.
pub fn reference_placeholder(target: &Node) -> String {
    let parts: Vec<String> = match target {
        Node::Sequence(items) => items
            .iter()
            .map(|item| item.scalar_text().unwrap_or_else(|| item.kind().to_string()))
            .collect(),
        other => vec![other.scalar_text().unwrap_or_else(|| other.kind().to_string())],
    };
    // keep it on one line whatever the scalars contain
    let joined = parts.join(", ").replace(['\n', '\r'], " ");
    format!("# !reference [{joined}]")
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVERY_MARKER: [Marker; 3] = [Marker::GitHubExpression, Marker::PipelineValue, Marker::Jinja];

    #[test]
    fn test_identity_without_markers() {
        let line = "echo \"$HOME\" | grep -v '{' && cat <<EOF >> out";
        let result = substitute(line, &EVERY_MARKER);
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result, line);
    }

    #[test]
    fn test_github_expression() {
        assert_eq!(
            substitute("echo ${{ github.sha }} and ${{ env.X }}", &[Marker::GitHubExpression]),
            "echo $ACTION_EXPRESSION and $ACTION_EXPRESSION"
        );
    }

    #[test]
    fn test_github_expression_not_confused_with_jinja() {
        assert_eq!(substitute("echo ${{ matrix.os }}", &EVERY_MARKER), "echo $ACTION_EXPRESSION");
    }

    #[test]
    fn test_pipeline_value() {
        assert_eq!(
            substitute("deploy << pipeline.parameters.env >>", &[Marker::PipelineValue]),
            "deploy \"$PARAMETER\""
        );
        assert_eq!(
            substitute("echo <<parameters.name>>", &[Marker::PipelineValue]),
            "echo \"$PARAMETER\""
        );
    }

    #[test]
    fn test_heredoc_is_not_a_pipeline_value() {
        let line = "cat << EOF >> file";
        assert_eq!(substitute(line, &[Marker::PipelineValue]), line);
    }

    #[test]
    fn test_empty_marker_set_is_identity() {
        let line = "docker inspect --format '{{.Id}}' ${{ x }}";
        assert!(matches!(substitute(line, &[]), Cow::Borrowed(_)));
    }

    #[test]
    fn test_jinja_and_go_templates() {
        assert_eq!(
            substitute("echo {{ item }} > {{ dest }}", &[Marker::Jinja]),
            "echo $JINJA_EXPRESSION > $JINJA_EXPRESSION"
        );
        assert_eq!(
            substitute("go build -o {{.OUT}}", &[Marker::GoTemplate]),
            "go build -o $TASK_VARIABLE"
        );
    }

    #[test]
    fn test_unclosed_marker_is_left_alone() {
        assert_eq!(substitute("echo {{ oops", &EVERY_MARKER), "echo {{ oops");
    }

    #[test]
    fn test_no_quote_imbalance_inside_quotes() {
        let out = substitute("echo \"v={{ a }}\"", &[Marker::Jinja]);
        assert_eq!(out.matches('"').count() % 2, 0);
    }

    #[test]
    fn test_reference_placeholder() {
        let target = Node::Sequence(vec![
            Node::String(".setup".to_string()),
            Node::String("script".to_string()),
        ]);
        assert_eq!(reference_placeholder(&target), "# !reference [.setup, script]");
    }
}
