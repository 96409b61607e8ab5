//! Structural equality over a sequence of projections.

/// True when every item equals the first one.
///
/// Empty and single-item sequences are trivially equal. The comparator only
/// says *that* something differs; callers map the position back to results.
#[must_use]
pub fn all_equal<T: PartialEq>(items: &[T]) -> bool {
    items
        .split_first()
        .is_none_or(|(first, rest)| rest.iter().all(|item| item == first))
}
