//! Inbound event normalization.
//!
//! Turns raw chat payloads (typed text, slash commands, button presses)
//! into the [`Input`] values the wizard engine consumes. Typed answers and
//! button choices carry the same [`Token`] type; a choice also names the
//! step its button was rendered for, so a press on an old message can be
//! told apart from an answer to the current prompt.

use kbuilder_types::session::WizardStep;

/// Prefix on every button payload this bot produces: `kb:<step>:<value>`.
pub const CHOICE_PREFIX: &str = "kb:";

pub const KEYWORD_CANCEL: &str = "cancel";
pub const KEYWORD_DEFAULT: &str = "default";
pub const KEYWORD_SKIP: &str = "skip";
pub const KEYWORD_CONFIRM: &str = "confirm";
pub const KEYWORD_EDIT: &str = "edit";

/// Bot commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Welcome message and overview.
    Start,
    /// Usage guide.
    Help,
    /// Start the build wizard.
    Build,
    /// Report the wizard step or last dispatch.
    Status,
    /// Abort the wizard.
    Cancel,
    /// Unknown command (name without the leading slash).
    Unknown(String),
}

/// A user answer, already trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive keyword match.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.0.eq_ignore_ascii_case(keyword)
    }

    pub fn is_cancel(&self) -> bool {
        self.is_keyword(KEYWORD_CANCEL)
    }
}

/// One normalized inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Command(Command),
    /// Typed answer for whatever step is active.
    Token(Token),
    /// Button press, valid only while `step` is the active step.
    Choice { step: WizardStep, token: Token },
}

/// Parse input as a slash command.
///
/// Returns `None` if the input doesn't start with `/`. A `@botname` suffix
/// on the command (as sent in group chats) is ignored.
pub fn parse_command(input: &str) -> Option<Command> {
    let trimmed = input.trim();
    let rest = trimmed.strip_prefix('/')?;

    let name = rest.split_whitespace().next().unwrap_or("");
    let name = name.split('@').next().unwrap_or("").to_lowercase();

    let command = match name.as_str() {
        "start" => Command::Start,
        "help" => Command::Help,
        "build" => Command::Build,
        "status" => Command::Status,
        "cancel" => Command::Cancel,
        other => Command::Unknown(other.to_string()),
    };
    Some(command)
}

/// Normalize a typed message.
pub fn normalize_text(text: &str) -> Input {
    match parse_command(text) {
        Some(command) => Input::Command(command),
        None => Input::Token(Token::new(text)),
    }
}

/// Normalize a button payload.
///
/// Returns `None` for payloads this bot did not produce; callers log and
/// drop those.
pub fn normalize_choice(data: &str) -> Option<Input> {
    let (step, value) = data.strip_prefix(CHOICE_PREFIX)?.split_once(':')?;
    let step = step.parse::<WizardStep>().ok()?;
    if value.trim().is_empty() {
        return None;
    }
    Some(Input::Choice {
        step,
        token: Token::new(value),
    })
}

/// Encode a choice value offered at `step` as a button payload.
pub fn choice_data(step: WizardStep, value: &str) -> String {
    format!("{CHOICE_PREFIX}{step}:{value}")
}
