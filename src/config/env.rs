/// Treat empty strings the way the runner does: as unset.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolve `(owner, repo)` from `GITHUB_REPOSITORY_OWNER` and
/// `GITHUB_REPOSITORY`.
///
/// `GITHUB_REPOSITORY` is normally `owner/repo`; a bare `repo` is accepted
/// too. When the owner variable is missing, the owner half of the slug is
/// used.
pub fn resolve_repo_scope(
    owner: Option<&str>,
    repository: Option<&str>,
) -> (Option<String>, Option<String>) {
    let (slug_owner, repo) = match repository {
        Some(r) => match r.split_once('/') {
            Some((o, name)) => (Some(o), Some(name)),
            None => (None, Some(r)),
        },
        None => (None, None),
    };

    let owner = owner
        .or(slug_owner)
        .filter(|o| !o.is_empty())
        .map(str::to_string);
    let repo = repo.filter(|r| !r.is_empty()).map(str::to_string);
    (owner, repo)
}
