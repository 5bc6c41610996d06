//! Keyboard shortcuts for the editor, independent of any windowing toolkit

use crate::domain::Tool;
use crate::session::messages::{CropMsg, EditorMsg, Modifiers, TextMsg, ToolSelection};

/// A key press as delivered by the host toolkit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Character(String),
    Enter,
    Escape,
    Delete,
    Backspace,
}

/// Translate a key press into an editor message.
///
/// While a text annotation is being edited, printable keys go to the text
/// instead of selecting tools.
pub fn handle_key_event(
    key: Key,
    modifiers: Modifiers,
    editing_text: bool,
    cropping: bool,
) -> Option<EditorMsg> {
    if editing_text {
        return match key {
            Key::Escape => Some(EditorMsg::Text(TextMsg::Commit)),
            Key::Enter if !modifiers.shift => Some(EditorMsg::Text(TextMsg::Commit)),
            Key::Enter => Some(EditorMsg::Text(TextMsg::Insert("\n".to_string()))),
            Key::Backspace => Some(EditorMsg::Text(TextMsg::Backspace)),
            Key::Character(c) if !modifiers.control => Some(EditorMsg::Text(TextMsg::Insert(c))),
            _ => None,
        };
    }

    match key {
        // Undo
        Key::Character(c) if c == "z" && modifiers.control && !modifiers.shift => {
            Some(EditorMsg::undo())
        }
        Key::Enter if cropping => Some(EditorMsg::apply_crop()),
        Key::Escape if cropping => Some(EditorMsg::Crop(CropMsg::Cancel)),
        Key::Escape => Some(EditorMsg::cancel()),
        Key::Delete | Key::Backspace => Some(EditorMsg::DeleteSelected),
        Key::Character(_) if modifiers.control => None,
        Key::Character(c) => {
            let selection = match c.to_ascii_lowercase().as_str() {
                "v" => ToolSelection::Select,
                "c" => ToolSelection::Crop,
                "a" => ToolSelection::Draw(Tool::Arrow),
                "p" => ToolSelection::Draw(Tool::Freehand),
                "m" => ToolSelection::Draw(Tool::Measurement),
                "r" => ToolSelection::Draw(Tool::Rectangle),
                "o" => ToolSelection::Draw(Tool::Circle),
                "l" => ToolSelection::Draw(Tool::Line),
                "t" => ToolSelection::Draw(Tool::Text),
                "b" => ToolSelection::Draw(Tool::Pixelate),
                _ => return None,
            };
            Some(EditorMsg::SelectTool(selection))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CTRL: Modifiers = Modifiers {
        shift: false,
        control: true,
    };

    #[test]
    fn test_tool_keys() {
        assert_eq!(
            handle_key_event(Key::Character("R".into()), Modifiers::NONE, false, false),
            Some(EditorMsg::tool(Tool::Rectangle))
        );
        assert_eq!(
            handle_key_event(Key::Character("q".into()), Modifiers::NONE, false, false),
            None
        );
    }

    #[test]
    fn test_undo_and_crop_keys() {
        assert_eq!(
            handle_key_event(Key::Character("z".into()), CTRL, false, false),
            Some(EditorMsg::Undo)
        );
        assert_eq!(
            handle_key_event(Key::Enter, Modifiers::NONE, false, true),
            Some(EditorMsg::apply_crop())
        );
        assert_eq!(
            handle_key_event(Key::Escape, Modifiers::NONE, false, true),
            Some(EditorMsg::Crop(CropMsg::Cancel))
        );
    }

    #[test]
    fn test_text_editing_captures_characters() {
        assert_eq!(
            handle_key_event(Key::Character("r".into()), Modifiers::NONE, true, false),
            Some(EditorMsg::Text(TextMsg::Insert("r".into())))
        );
        assert_eq!(
            handle_key_event(Key::Enter, Modifiers::SHIFT, true, false),
            Some(EditorMsg::Text(TextMsg::Insert("\n".into())))
        );
        assert_eq!(
            handle_key_event(Key::Escape, Modifiers::NONE, true, false),
            Some(EditorMsg::Text(TextMsg::Commit))
        );
    }
}
