//! JQL builders.

/// Build the JQL selecting every issue of one project.
///
/// Generates: `project = DEVOPS ORDER BY created ASC`
pub fn project_issues_jql(project_key: &str) -> String {
    format!("project = {} ORDER BY created ASC", escape_jql_value(project_key))
}

/// Escape a JQL value, quoting it if it contains special characters.
fn escape_jql_value(value: &str) -> String {
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        value.to_string()
    } else {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_project_key() {
        assert_eq!(
            project_issues_jql("DEVOPS"),
            "project = DEVOPS ORDER BY created ASC"
        );
    }

    #[test]
    fn test_key_with_hyphen_is_quoted() {
        assert_eq!(escape_jql_value("MY-PROJ"), "\"MY-PROJ\"");
    }

    #[test]
    fn test_quotes_are_escaped() {
        assert_eq!(escape_jql_value("A\"B"), "\"A\\\"B\"");
        assert_eq!(escape_jql_value(""), "\"\"");
    }
}
