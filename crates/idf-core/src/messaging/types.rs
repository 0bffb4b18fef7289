/// Callback payloads carried by the bot's inline buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    CopyId,
    MyId,
    Help,
}

impl CallbackAction {
    pub fn data(self) -> &'static str {
        match self {
            CallbackAction::CopyId => "copy_id",
            CallbackAction::MyId => "cmd_myid",
            CallbackAction::Help => "cmd_help",
        }
    }

    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "copy_id" => Some(CallbackAction::CopyId),
            "cmd_myid" => Some(CallbackAction::MyId),
            "cmd_help" => Some(CallbackAction::Help),
            _ => None,
        }
    }
}

/// Inline keyboard, row by row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn action(label: &str, action: CallbackAction) -> Self {
        Self {
            label: label.to_string(),
            callback_data: action.data().to_string(),
        }
    }
}

impl InlineKeyboard {
    pub fn new(rows: Vec<Vec<InlineButton>>) -> Self {
        Self { rows }
    }

    /// Keyboard attached to the `/start` greeting.
    pub fn start_menu() -> Self {
        Self::new(vec![
            vec![
                InlineButton::action("📋 Copy My ID", CallbackAction::CopyId),
                InlineButton::action("🆔 Get My ID", CallbackAction::MyId),
            ],
            vec![InlineButton::action("ℹ️ Help", CallbackAction::Help)],
        ])
    }

    /// Keyboard attached to welcome messages for new group members.
    pub fn copy_id() -> Self {
        Self::new(vec![vec![InlineButton::action(
            "📋 Copy My ID",
            CallbackAction::CopyId,
        )]])
    }
}

/// Limits of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    /// Longest single message; longer replies are split.
    pub max_message_len: usize,
}
