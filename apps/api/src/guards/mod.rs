// Input guards: cheap, pure pre-filters that run before any retrieval or model call.
// Both guards take their pattern/keyword lists at construction; defaults live in each module.

pub mod injection;
pub mod topic;

pub use injection::InjectionGuard;
pub use topic::TopicGuard;

/// Outcome of a single guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardVerdict {
    Allowed,
    Rejected(String),
}

/// Lowercases every entry and drops blank ones. A blank pattern would match every input.
fn normalize_list<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items
        .into_iter()
        .map(|s| s.into().to_lowercase())
        .filter(|s| !s.trim().is_empty())
        .collect()
}
