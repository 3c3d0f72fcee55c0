//! JQL query builders.

use chrono::NaiveDate;

/// Quote a value as a JQL string literal.
fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

fn quoted_list<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|v| quote(v.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Issues of `project` with the given keys, or the whole project for no keys.
pub fn issues_by_key<S: AsRef<str>>(project: &str, keys: &[S]) -> String {
    if keys.is_empty() {
        format!("project = {project}")
    } else {
        format!("project = {project} and key in ({})", quoted_list(keys))
    }
}

/// Issues in any currently open sprint.
pub fn open_sprints(project: &str) -> String {
    format!("project = {project} and Sprint in openSprints()")
}

/// Issues with work logged by `authors` between `from` and `to` inclusive.
///
/// Not filtered by sprint, so time logged on non-sprint issues is included.
pub fn worklogs_between<I, S>(project: &str, from: NaiveDate, to: NaiveDate, authors: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    format!(
        "project = {project} and worklogDate >= {} and worklogDate <= {} and worklogAuthor in ({})",
        from.format("%Y-%m-%d"),
        to.format("%Y-%m-%d"),
        quoted_list(authors)
    )
}
