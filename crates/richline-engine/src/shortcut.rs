use crate::value::{FormatError, ListTag, RichTextValue};

/// Modifier classes for list shortcuts. "Primary" is the platform's
/// canonical command modifier; resolving it to a concrete key is the host
/// environment's job, not this table's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutModifier {
    Primary,
    PrimaryShift,
}

/// The two actions list shortcuts can trigger. Both are pure value
/// operations regardless of selection nesting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    /// Indent: annotate the selected lines with the block's current tag.
    ApplyLineFormat,
    /// Outdent: strip the selected lines' annotations.
    RemoveLineFormat,
}

impl ShortcutAction {
    /// Run the action against a value. `tag` is the owning block's current
    /// list tag, used when indenting.
    pub fn run(self, value: &RichTextValue, tag: ListTag) -> Result<RichTextValue, FormatError> {
        match self {
            ShortcutAction::ApplyLineFormat => value.apply_line_format(tag),
            ShortcutAction::RemoveLineFormat => value.remove_line_format(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortcutBinding {
    pub modifier: ShortcutModifier,
    pub character: char,
    pub action: ShortcutAction,
}

/// The fixed shortcut table, evaluated only while the rich-text component
/// holds focus.
///
/// `]` and `m` both indent. They are two independent mnemonic conventions
/// (bracket pairing, and outline-style `m`/`M`), kept as separate rows so
/// either can be reassigned later without touching the other.
pub const LIST_SHORTCUTS: [ShortcutBinding; 4] = [
    ShortcutBinding {
        modifier: ShortcutModifier::Primary,
        character: '[',
        action: ShortcutAction::RemoveLineFormat,
    },
    ShortcutBinding {
        modifier: ShortcutModifier::Primary,
        character: ']',
        action: ShortcutAction::ApplyLineFormat,
    },
    ShortcutBinding {
        modifier: ShortcutModifier::Primary,
        character: 'm',
        action: ShortcutAction::ApplyLineFormat,
    },
    ShortcutBinding {
        modifier: ShortcutModifier::PrimaryShift,
        character: 'm',
        action: ShortcutAction::RemoveLineFormat,
    },
];

/// Find the action bound to a key combination, scanning the table in
/// declaration order.
pub fn lookup(modifier: ShortcutModifier, character: char) -> Option<ShortcutAction> {
    LIST_SHORTCUTS
        .iter()
        .find(|binding| binding.modifier == modifier && binding.character == character)
        .map(|binding| binding.action)
}
