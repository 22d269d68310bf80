use crate::detect::{SelectionInspector, is_root_selected};
use crate::shortcut::ShortcutAction;
use crate::value::{FormatError, ListTag, RichTextValue};

/// The native list commands a host editor understands, named after the
/// `execCommand` identifiers they map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListCommand {
    InsertUnorderedList,
    InsertOrderedList,
}

impl ListCommand {
    pub fn for_tag(tag: ListTag) -> Self {
        match tag {
            ListTag::Unordered => ListCommand::InsertUnorderedList,
            ListTag::Ordered => ListCommand::InsertOrderedList,
        }
    }

    pub fn tag(self) -> ListTag {
        match self {
            ListCommand::InsertUnorderedList => ListTag::Unordered,
            ListCommand::InsertOrderedList => ListTag::Ordered,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ListCommand::InsertUnorderedList => "InsertUnorderedList",
            ListCommand::InsertOrderedList => "InsertOrderedList",
        }
    }
}

/// The host editor as the toggle logic sees it: selection inspection plus
/// the native command entry point.
pub trait HostEditor: SelectionInspector {
    /// Execute a native list command, mutating the host's own state.
    /// Returns false when the editor cannot act (no usable selection, for
    /// example). A refusal is not an error; it is absorbed silently.
    fn exec_command(&mut self, command: ListCommand) -> bool;
}

/// The owner of the rich-text block: the party that holds the current
/// value and root tag and re-renders when either changes.
pub trait BlockOwner {
    /// The active list's root element type should change; the owner
    /// re-renders with the new tag, which re-synchronizes the line-format
    /// annotations on the next cycle.
    fn change_root_tag(&mut self, tag: ListTag);

    /// A delegated native command has mutated the host editor's state out
    /// of band; the owner must rebuild the line-format value from it.
    fn resync(&mut self);

    /// A pure value operation produced a new value; the owner persists it
    /// as the new source of truth.
    fn commit(&mut self, value: RichTextValue);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToggleState {
    #[default]
    Idle,
    RootTagChange,
    DelegatedCommand,
}

/// Which branch a `request_list_type` took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    RootTagChange,
    DelegatedCommand,
}

/// Decides how a requested list-type change is expressed.
///
/// A root-selected toggle is a structural change on the owning block (the
/// root tag rewrites and the annotations follow on re-render); a nested
/// toggle must go through the host editor's native conversion command,
/// which re-parents list items correctly, followed by a forced
/// resynchronization. Each request runs to completion synchronously inside
/// one input event, so the controller is back in `Idle` by the time it
/// returns.
#[derive(Debug, Default)]
pub struct ToggleController {
    state: ToggleState,
}

impl ToggleController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ToggleState {
        self.state
    }

    /// Handle a list-type request for `tag`, branching on whether the
    /// selection is root-selected.
    ///
    /// The delegated branch invokes the native command and then the resync
    /// collaborator, in that order. A refused command skips the resync, so
    /// a no-op is detectable only by the absence of a resynchronization
    /// effect.
    pub fn request_list_type<E, O>(
        &mut self,
        editor: &mut E,
        owner: &mut O,
        tag: ListTag,
    ) -> ToggleOutcome
    where
        E: HostEditor + ?Sized,
        O: BlockOwner + ?Sized,
    {
        if is_root_selected(editor) {
            self.state = ToggleState::RootTagChange;
            owner.change_root_tag(tag);
            self.state = ToggleState::Idle;
            ToggleOutcome::RootTagChange
        } else {
            self.state = ToggleState::DelegatedCommand;
            if editor.exec_command(ListCommand::for_tag(tag)) {
                owner.resync();
            }
            self.state = ToggleState::Idle;
            ToggleOutcome::DelegatedCommand
        }
    }

    /// Indent: annotate the selected lines with the block's current tag.
    /// Always a pure value operation, never a host command, regardless of
    /// how deep the selection sits.
    pub fn indent<O>(
        &mut self,
        owner: &mut O,
        value: &RichTextValue,
        tag: ListTag,
    ) -> Result<(), FormatError>
    where
        O: BlockOwner + ?Sized,
    {
        owner.commit(value.apply_line_format(tag)?);
        Ok(())
    }

    /// Outdent: strip the selected lines' annotations. Pure value
    /// operation, like `indent`.
    pub fn outdent<O>(&mut self, owner: &mut O, value: &RichTextValue) -> Result<(), FormatError>
    where
        O: BlockOwner + ?Sized,
    {
        owner.commit(value.remove_line_format()?);
        Ok(())
    }

    /// Route a resolved shortcut action onto indent or outdent.
    pub fn handle_shortcut<O>(
        &mut self,
        action: ShortcutAction,
        owner: &mut O,
        value: &RichTextValue,
        tag: ListTag,
    ) -> Result<(), FormatError>
    where
        O: BlockOwner + ?Sized,
    {
        match action {
            ShortcutAction::ApplyLineFormat => self.indent(owner, value, tag),
            ShortcutAction::RemoveLineFormat => self.outdent(owner, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::ListScope;
    use crate::tests::FakeInspector;
    use std::cell::RefCell;
    use std::rc::Rc;

    type EventLog = Rc<RefCell<Vec<String>>>;

    struct FakeEditor {
        inspector: FakeInspector,
        refuse_commands: bool,
        log: EventLog,
    }

    impl FakeEditor {
        fn new(inspector: FakeInspector, log: &EventLog) -> Self {
            Self {
                inspector,
                refuse_commands: false,
                log: log.clone(),
            }
        }
    }

    impl SelectionInspector for FakeEditor {
        fn has_focus(&self) -> bool {
            self.inspector.has_focus()
        }

        fn has_selection(&self) -> bool {
            self.inspector.has_selection()
        }

        fn nearest_list(&self) -> Option<ListScope> {
            self.inspector.nearest_list()
        }
    }

    impl HostEditor for FakeEditor {
        fn exec_command(&mut self, command: ListCommand) -> bool {
            if self.refuse_commands {
                return false;
            }
            self.log.borrow_mut().push(format!("exec:{}", command.name()));
            true
        }
    }

    #[derive(Default)]
    struct RecordingOwner {
        log: EventLog,
        committed: Vec<RichTextValue>,
    }

    impl RecordingOwner {
        fn new(log: &EventLog) -> Self {
            Self {
                log: log.clone(),
                committed: Vec::new(),
            }
        }
    }

    impl BlockOwner for RecordingOwner {
        fn change_root_tag(&mut self, tag: ListTag) {
            self.log.borrow_mut().push(format!("tag:{tag}"));
        }

        fn resync(&mut self) {
            self.log.borrow_mut().push("resync".to_string());
        }

        fn commit(&mut self, value: RichTextValue) {
            self.log.borrow_mut().push("commit".to_string());
            self.committed.push(value);
        }
    }

    fn annotated_value(text: &str, tag: ListTag) -> RichTextValue {
        let mut value = RichTextValue::from_plain_text(text);
        value.set_selection(0..text.len());
        value.apply_line_format(tag).unwrap()
    }

    #[test]
    fn test_root_selection_rewrites_the_root_tag_without_a_command() {
        let log = EventLog::default();
        // The nearest list is the editable body itself.
        let mut editor = FakeEditor::new(FakeInspector::focused_in(ListTag::Unordered, true), &log);
        let mut owner = RecordingOwner::new(&log);
        let mut controller = ToggleController::new();

        let outcome = controller.request_list_type(&mut editor, &mut owner, ListTag::Ordered);

        assert_eq!(outcome, ToggleOutcome::RootTagChange);
        assert_eq!(*log.borrow(), vec!["tag:ol".to_string()]);
        assert_eq!(controller.state(), ToggleState::Idle);
    }

    #[test]
    fn test_nested_selection_delegates_and_resyncs_in_order() {
        let log = EventLog::default();
        // Selection inside a ul nested below the root.
        let mut editor = FakeEditor::new(FakeInspector::focused_in(ListTag::Unordered, false), &log);
        let mut owner = RecordingOwner::new(&log);
        let mut controller = ToggleController::new();

        let outcome = controller.request_list_type(&mut editor, &mut owner, ListTag::Ordered);

        assert_eq!(outcome, ToggleOutcome::DelegatedCommand);
        assert_eq!(
            *log.borrow(),
            vec!["exec:InsertOrderedList".to_string(), "resync".to_string()]
        );
        assert_eq!(controller.state(), ToggleState::Idle);
    }

    #[test]
    fn test_missing_selection_counts_as_root_selected() {
        let log = EventLog::default();
        let mut editor = FakeEditor::new(FakeInspector::without_selection(), &log);
        let mut owner = RecordingOwner::new(&log);
        let mut controller = ToggleController::new();

        let outcome = controller.request_list_type(&mut editor, &mut owner, ListTag::Unordered);

        assert_eq!(outcome, ToggleOutcome::RootTagChange);
        assert_eq!(*log.borrow(), vec!["tag:ul".to_string()]);
    }

    #[test]
    fn test_refused_command_is_absorbed_and_skips_the_resync() {
        let log = EventLog::default();
        let mut editor = FakeEditor::new(FakeInspector::focused_in(ListTag::Ordered, false), &log);
        editor.refuse_commands = true;
        let mut owner = RecordingOwner::new(&log);
        let mut controller = ToggleController::new();

        let outcome = controller.request_list_type(&mut editor, &mut owner, ListTag::Unordered);

        // Still the delegated branch, but no visible effect at all.
        assert_eq!(outcome, ToggleOutcome::DelegatedCommand);
        assert!(log.borrow().is_empty());
        assert_eq!(controller.state(), ToggleState::Idle);
    }

    #[test]
    fn test_indent_commits_an_applied_value_without_touching_the_host() {
        let log = EventLog::default();
        let mut owner = RecordingOwner::new(&log);
        let mut controller = ToggleController::new();
        let mut value = RichTextValue::from_plain_text("a\nb");
        value.set_selection(0..3);

        controller
            .indent(&mut owner, &value, ListTag::Unordered)
            .unwrap();

        assert_eq!(*log.borrow(), vec!["commit".to_string()]);
        let committed = &owner.committed[0];
        assert_eq!(committed.line_format(0), Some(ListTag::Unordered));
        assert_eq!(committed.line_format(1), Some(ListTag::Unordered));
    }

    #[test]
    fn test_outdent_commits_a_stripped_value() {
        let log = EventLog::default();
        let mut owner = RecordingOwner::new(&log);
        let mut controller = ToggleController::new();
        let value = annotated_value("a\nb", ListTag::Unordered);

        controller.outdent(&mut owner, &value).unwrap();

        assert!(owner.committed[0].annotations().is_empty());
    }

    #[test]
    fn test_shortcut_actions_route_to_indent_and_outdent() {
        let log = EventLog::default();
        let mut owner = RecordingOwner::new(&log);
        let mut controller = ToggleController::new();
        let value = annotated_value("a", ListTag::Ordered);

        controller
            .handle_shortcut(
                ShortcutAction::RemoveLineFormat,
                &mut owner,
                &value,
                ListTag::Ordered,
            )
            .unwrap();
        controller
            .handle_shortcut(
                ShortcutAction::ApplyLineFormat,
                &mut owner,
                &value,
                ListTag::Ordered,
            )
            .unwrap();

        assert_eq!(owner.committed.len(), 2);
        assert!(owner.committed[0].annotations().is_empty());
        assert_eq!(owner.committed[1].line_format(0), Some(ListTag::Ordered));
    }

    #[test]
    fn test_indent_propagates_malformed_state() {
        let log = EventLog::default();
        let mut owner = RecordingOwner::new(&log);
        let mut controller = ToggleController::new();
        let stale = crate::tests::value_with_stale_annotation();

        let result = controller.indent(&mut owner, &stale, ListTag::Ordered);

        assert!(result.is_err());
        assert!(owner.committed.is_empty(), "no value may be committed");
    }
}
