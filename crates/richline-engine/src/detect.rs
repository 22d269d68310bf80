use crate::value::ListTag;

/// The nearest ancestor list containing the host editor's selection.
///
/// `at_root` is true when that list is the editable surface's outermost
/// body element itself, meaning the selection sits directly in the root
/// content flow rather than inside a nested list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListScope {
    pub tag: ListTag,
    pub at_root: bool,
}

/// Read access to the host editor's live selection state.
///
/// The decision logic never walks the host document itself; it depends on
/// this injected capability so it stays testable against a fake inspector.
/// Focus is an explicit query rather than ambient global state.
pub trait SelectionInspector {
    /// Whether the editable surface currently holds input focus.
    fn has_focus(&self) -> bool;

    /// Whether the editor has a current selection at all.
    fn has_selection(&self) -> bool;

    /// Walk up from the selection node to the nearest ancestor `ol` or
    /// `ul`. `None` means no list ancestor exists.
    fn nearest_list(&self) -> Option<ListScope>;
}

/// Whether a list type is the one containing the selection.
///
/// This is a tri-state, not a boolean: with focus but no enclosing list,
/// no active state can be asserted either way and the result is
/// `Indeterminate`. Callers that need a boolean use [`ActiveState::as_bool`]
/// and decide what `None` means for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveState {
    Active,
    Inactive,
    Indeterminate,
}

impl ActiveState {
    fn from_match(matches: bool) -> Self {
        if matches {
            ActiveState::Active
        } else {
            ActiveState::Inactive
        }
    }

    /// `None` for `Indeterminate`, so "not computable" is never silently
    /// collapsed into "inactive".
    pub fn as_bool(self) -> Option<bool> {
        match self {
            ActiveState::Active => Some(true),
            ActiveState::Inactive => Some(false),
            ActiveState::Indeterminate => None,
        }
    }

    pub fn is_active(self) -> bool {
        self == ActiveState::Active
    }
}

/// Decide whether `requested` is the list type containing the selection.
///
/// Without focus the live selection is not meaningful, so detection falls
/// back to comparing the requested tag against the value's current root
/// tag. With focus, the nearest enclosing list decides; no enclosing list
/// yields `Indeterminate`.
pub fn active_list_type<I>(inspector: &I, requested: ListTag, root_tag: ListTag) -> ActiveState
where
    I: SelectionInspector + ?Sized,
{
    if !inspector.has_focus() {
        return ActiveState::from_match(requested == root_tag);
    }

    match inspector.nearest_list() {
        None => ActiveState::Indeterminate,
        Some(scope) => ActiveState::from_match(scope.tag == requested),
    }
}

/// Whether the selection sits at the root of the list structure.
///
/// True iff there is no selection, or the nearest list ancestor of the
/// selection node is the editable surface's outermost body element. Root
/// and nested selections toggle differently: the root list's type is a
/// structural change on the owning block, while a nested list needs the
/// host editor's native conversion command to re-parent its items.
pub fn is_root_selected<I>(inspector: &I) -> bool
where
    I: SelectionInspector + ?Sized,
{
    !inspector.has_selection() || inspector.nearest_list().is_some_and(|scope| scope.at_root)
}

/// Combined detection result for one requested tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListDetection {
    pub active: ActiveState,
    pub is_root_selected: bool,
}

/// Answer both detection questions against one inspector query.
pub fn detect<I>(inspector: &I, requested: ListTag, root_tag: ListTag) -> ListDetection
where
    I: SelectionInspector + ?Sized,
{
    ListDetection {
        active: active_list_type(inspector, requested, root_tag),
        is_root_selected: is_root_selected(inspector),
    }
}

/// Selection state relative to list structure, computed fresh per query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionLocus {
    pub is_root_selected: bool,
    /// Tag of the nearest enclosing list. Only meaningful while the editor
    /// holds focus; reported as `None` otherwise.
    pub enclosing_list: Option<ListTag>,
}

impl SelectionLocus {
    pub fn capture<I>(inspector: &I) -> Self
    where
        I: SelectionInspector + ?Sized,
    {
        let enclosing_list = if inspector.has_focus() {
            inspector.nearest_list().map(|scope| scope.tag)
        } else {
            None
        };
        Self {
            is_root_selected: is_root_selected(inspector),
            enclosing_list,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::FakeInspector;
    use rstest::rstest;

    #[rstest]
    #[case(ListTag::Ordered, ActiveState::Active)]
    #[case(ListTag::Unordered, ActiveState::Inactive)]
    fn test_focused_detection_follows_the_enclosing_list(
        #[case] requested: ListTag,
        #[case] expected: ActiveState,
    ) {
        // Editor has focus and the selection sits inside a nested ol.
        let inspector = FakeInspector::focused_in(ListTag::Ordered, false);
        assert_eq!(
            active_list_type(&inspector, requested, ListTag::Unordered),
            expected
        );
    }

    #[rstest]
    #[case(ListTag::Unordered, ActiveState::Active)]
    #[case(ListTag::Ordered, ActiveState::Inactive)]
    fn test_unfocused_detection_compares_against_the_root_tag(
        #[case] requested: ListTag,
        #[case] expected: ActiveState,
    ) {
        // Regardless of any prior selection state, an unfocused editor
        // reports purely from the root tag.
        let mut inspector = FakeInspector::focused_in(ListTag::Ordered, false);
        inspector.focused = false;
        assert_eq!(
            active_list_type(&inspector, requested, ListTag::Unordered),
            expected
        );
    }

    #[test]
    fn test_no_enclosing_list_while_focused_is_indeterminate() {
        let inspector = FakeInspector::focused_outside_lists();
        let state = active_list_type(&inspector, ListTag::Ordered, ListTag::Ordered);
        assert_eq!(state, ActiveState::Indeterminate);
        assert_eq!(state.as_bool(), None);
        assert!(!state.is_active());
    }

    #[test]
    fn test_detect_bundles_both_questions() {
        let inspector = FakeInspector::focused_in(ListTag::Ordered, false);
        let detection = detect(&inspector, ListTag::Ordered, ListTag::Unordered);
        assert_eq!(detection.active, ActiveState::Active);
        assert!(!detection.is_root_selected);
    }

    #[test]
    fn test_root_selected_without_any_selection() {
        let inspector = FakeInspector::without_selection();
        assert!(is_root_selected(&inspector));
    }

    #[test]
    fn test_root_selected_when_the_nearest_list_is_the_body() {
        let inspector = FakeInspector::focused_in(ListTag::Unordered, true);
        assert!(is_root_selected(&inspector));
    }

    #[test]
    fn test_not_root_selected_inside_a_nested_list() {
        let inspector = FakeInspector::focused_in(ListTag::Unordered, false);
        assert!(!is_root_selected(&inspector));
    }

    #[test]
    fn test_locus_hides_the_enclosing_list_without_focus() {
        let mut inspector = FakeInspector::focused_in(ListTag::Ordered, false);
        let focused = SelectionLocus::capture(&inspector);
        assert_eq!(focused.enclosing_list, Some(ListTag::Ordered));

        inspector.focused = false;
        let unfocused = SelectionLocus::capture(&inspector);
        assert_eq!(unfocused.enclosing_list, None);
    }
}
