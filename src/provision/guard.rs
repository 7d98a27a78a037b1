//! Detection of destructive execution plans.

const ZERO_DESTROY_MARKER: &str = "0 to destroy";

/// Returns `true` when captured `terraform plan` output states that nothing
/// will be destroyed.
///
/// The summary line must report exactly zero destructions, so
/// `10 to destroy` does not count.
#[must_use]
pub fn plan_destroys_nothing(captured: &str) -> bool {
    captured
        .match_indices(ZERO_DESTROY_MARKER)
        .any(|(index, _)| {
            captured
                .get(..index)
                .and_then(|prefix| prefix.chars().next_back())
                .is_none_or(|previous| !previous.is_ascii_digit())
        })
}
