//! Reply rendering.
//!
//! Turns [`Reply`] values into HTML-formatted text (Telegram's `HTML` parse
//! mode subset: `<b>`, `<code>`, `<a>`) and a grid of choice buttons. All
//! user-supplied text is escaped.

use kbuilder_types::build::{BuildConfiguration, BuildField, KsuMode};
use kbuilder_types::dispatch::{DispatchOutcome, DispatchRecord};
use kbuilder_types::error::DispatchError;
use kbuilder_types::session::WizardStep;

use crate::wizard::reply::{Prompt, Reply, StatusReport};

use super::inbound::{
    choice_data, KEYWORD_CANCEL, KEYWORD_CONFIRM, KEYWORD_DEFAULT, KEYWORD_EDIT, KEYWORD_SKIP,
};

/// One inline button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    /// Payload sent back when pressed; see `inbound::normalize_choice`.
    pub data: String,
}

impl Button {
    fn choice(step: WizardStep, label: impl Into<String>, value: &str) -> Self {
        Self {
            label: label.into(),
            data: choice_data(step, value),
        }
    }
}

/// A message ready for a chat transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    /// HTML-formatted body.
    pub text: String,
    /// Button rows; empty when the message has no keyboard.
    pub keyboard: Vec<Vec<Button>>,
}

impl RenderedMessage {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: Vec::new(),
        }
    }
}

/// Render one reply.
pub fn render(reply: &Reply) -> RenderedMessage {
    match reply {
        Reply::Welcome => RenderedMessage::text(WELCOME),
        Reply::Help => RenderedMessage::text(HELP),
        Reply::UnknownCommand(name) => RenderedMessage::text(format!(
            "Unknown command <code>/{}</code>. Send /help for the list of commands.",
            escape_html(name)
        )),
        Reply::Prompt(prompt) => render_prompt(prompt),
        Reply::Summary {
            config,
            unrecognized,
        } => render_summary(config, unrecognized.as_deref()),
        Reply::Cancelled => RenderedMessage::text("❌ Build configuration cancelled."),
        Reply::NoActiveBuild => RenderedMessage::text(NO_ACTIVE_BUILD),
        Reply::Dispatched(record) => RenderedMessage::text(render_dispatch(record)),
        Reply::Status(report) => RenderedMessage::text(render_status(report)),
    }
}

const NO_ACTIVE_BUILD: &str = "❌ No active build. Use /build to start a new build.";

const WELCOME: &str = "🔧 <b>Kernel Builder Bot</b>\n\n\
Welcome! This bot helps you build custom kernels using GitHub Actions.\n\n\
Available commands:\n\
• /build - Start a new kernel build\n\
• /status - Check build status\n\
• /cancel - Abort the build being configured\n\
• /help - Show usage help\n\n\
To get started, use /build to configure and start a new kernel build.";

const HELP: &str = "🔧 <b>Kernel Builder Bot Help</b>\n\n\
<b>Commands:</b>\n\
• /start - Welcome message and overview\n\
• /build - Start a new kernel build\n\
• /status - Check the status of your last build\n\
• /cancel - Abort the build being configured\n\
• /help - Show this help message\n\n\
<b>Build Process:</b>\n\
1. Use /build to start\n\
2. Answer each question, or send <code>default</code> to keep the shown value\n\
3. Optional steps accept <code>skip</code>\n\
4. Confirm your settings to trigger the workflow\n\
5. Follow the link to monitor the build\n\n\
Send <code>cancel</code> at any step to abort.";

fn render_prompt(prompt: &Prompt) -> RenderedMessage {
    let mut text = String::new();

    if prompt.resumed {
        text.push_str("⚠️ A build is already being configured. Continue below or send /cancel.\n\n");
    }
    if let Some((field, value)) = &prompt.accepted {
        text.push_str(&format!(
            "✅ {}: <code>{}</code>\n\n",
            field.label(),
            display_value(value)
        ));
    }
    if let Some(error) = &prompt.error {
        text.push_str(&format!("❌ {}\n\n", escape_html(&error.to_string())));
    }

    let Some(field) = prompt.step.field() else {
        return RenderedMessage::text(text);
    };
    let number = prompt.step.number().unwrap_or_default();
    text.push_str(&format!(
        "<b>Step {number}/{} · {}</b>\n",
        WizardStep::total(),
        field.label()
    ));

    let current = escape_html(&prompt.current);
    let step = prompt.step;
    let keyboard = match field {
        BuildField::Notes => {
            text.push_str("Enter notes for this build, or send <code>skip</code>.");
            vec![
                vec![Button::choice(step, "Skip", KEYWORD_SKIP)],
                vec![Button::choice(step, "❌ Cancel", KEYWORD_CANCEL)],
            ]
        }
        BuildField::KsuMode => {
            text.push_str("KernelSU patching (optional). Options:\n");
            for mode in [KsuMode::Both, KsuMode::Sus, KsuMode::Ksu] {
                text.push_str(&format!("• <code>{mode}</code> - {}\n", mode.description()));
            }
            text.push_str("• <code>skip</code> - No KernelSU patching\n\nEnter your choice:");
            vec![
                vec![
                    Button::choice(step, "both", "both"),
                    Button::choice(step, "sus", "sus"),
                    Button::choice(step, "ksu", "ksu"),
                ],
                vec![Button::choice(step, "Skip", KEYWORD_SKIP)],
                vec![Button::choice(step, "❌ Cancel", KEYWORD_CANCEL)],
            ]
        }
        required => {
            text.push_str(&format!("Current: <code>{current}</code>\n"));
            text.push_str(&format!(
                "Enter the {}, or send <code>default</code> to keep the current value:",
                required_noun(required)
            ));
            vec![
                vec![Button::choice(step, "Keep current", KEYWORD_DEFAULT)],
                vec![Button::choice(step, "❌ Cancel", KEYWORD_CANCEL)],
            ]
        }
    };

    RenderedMessage { text, keyboard }
}

fn required_noun(field: BuildField) -> &'static str {
    match field {
        BuildField::Compiler => "compiler to use",
        BuildField::KernelRepositoryUrl => "kernel repository URL",
        BuildField::KernelBranch => "kernel branch",
        BuildField::ContainerImage => "container image",
        BuildField::Notes => "notes",
        BuildField::KsuMode => "KernelSU mode",
    }
}

fn render_summary(config: &BuildConfiguration, unrecognized: Option<&str>) -> RenderedMessage {
    let mut text = String::new();
    if let Some(answer) = unrecognized {
        text.push_str(&format!(
            "<code>{}</code> is not an option here. Choose one of the buttons below.\n\n",
            escape_html(answer)
        ));
    }
    text.push_str("🔍 <b>Build Configuration Summary</b>\n\n");
    text.push_str(&config_lines(config));
    text.push_str("\nIs this configuration correct?");

    let step = WizardStep::AwaitingConfirmation;

    RenderedMessage {
        text,
        keyboard: vec![
            vec![Button::choice(step, "✅ Confirm & Start Build", KEYWORD_CONFIRM)],
            vec![
                Button::choice(step, "✏️ Edit", KEYWORD_EDIT),
                Button::choice(step, "❌ Cancel", KEYWORD_CANCEL),
            ],
        ],
    }
}

fn config_lines(config: &BuildConfiguration) -> String {
    let fields = [
        BuildField::Compiler,
        BuildField::KernelRepositoryUrl,
        BuildField::KernelBranch,
        BuildField::ContainerImage,
        BuildField::Notes,
        BuildField::KsuMode,
    ];
    fields
        .iter()
        .map(|field| {
            format!(
                "<b>{}:</b> <code>{}</code>\n",
                field.label(),
                display_value(config.value_of(*field))
            )
        })
        .collect()
}

fn render_dispatch(record: &DispatchRecord) -> String {
    match &record.outcome {
        DispatchOutcome::Triggered { tracking } => format!(
            "🚀 <b>Build Started Successfully!</b>\n\nMonitor your build progress at:\n{}",
            escape_html(tracking.url())
        ),
        DispatchOutcome::Failed { error } => format!(
            "❌ <b>Build Failed to Start</b>\n\n{}\n\n{}",
            escape_html(&error.to_string()),
            failure_hint(error)
        ),
    }
}

fn failure_hint(error: &DispatchError) -> &'static str {
    match error {
        DispatchError::Unauthorized(_) => {
            "The bot's GitHub token was rejected. Ask the bot operator to check it."
        }
        DispatchError::WorkflowNotFound(_) => {
            "The target workflow does not exist. Ask the bot operator to check the configuration."
        }
        DispatchError::InvalidInput(_) => {
            "Check your build parameters and send /build to start over."
        }
        DispatchError::Transient(_) => "Send /build to try again.",
    }
}

fn render_status(report: &StatusReport) -> String {
    let mut text = String::from("📊 <b>Build Status</b>\n\n");

    match report.active_step {
        Some(WizardStep::AwaitingConfirmation) => {
            text.push_str("A build is configured and waiting for your confirmation.");
        }
        Some(WizardStep::Dispatching) => {
            text.push_str("Your build is being submitted to GitHub Actions…");
        }
        Some(step) => match (step.number(), step.field()) {
            (Some(number), Some(field)) => text.push_str(&format!(
                "A build is being configured: step {number}/{} ({}).",
                WizardStep::total(),
                field.label()
            )),
            _ => text.push_str(NO_ACTIVE_BUILD),
        },
        None => text.push_str(NO_ACTIVE_BUILD),
    }

    if let Some(record) = &report.last_dispatch {
        text.push_str(&format!(
            "\n\n<b>Last build:</b> {}\n",
            record.dispatched_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        match &record.outcome {
            DispatchOutcome::Triggered { tracking } => {
                text.push_str(&format!(
                    "<b>Result:</b> started\n<a href=\"{0}\">View on GitHub</a>",
                    escape_html(tracking.url())
                ));
            }
            DispatchOutcome::Failed { error } => {
                text.push_str(&format!(
                    "<b>Result:</b> failed to start ({})",
                    escape_html(&error.to_string())
                ));
            }
        }
    }

    text
}

/// Escaped value, or `None` for empty optional values.
fn display_value(value: &str) -> String {
    if value.is_empty() {
        "None".to_string()
    } else {
        escape_html(value)
    }
}

/// Escape text for Telegram's HTML parse mode.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::defaults;
    use chrono::Utc;
    use kbuilder_types::dispatch::TrackingRef;
    use kbuilder_types::error::ValidationError;
    use uuid::Uuid;

    fn record(outcome: DispatchOutcome) -> DispatchRecord {
        DispatchRecord {
            dispatch_id: Uuid::now_v7(),
            config: defaults(),
            outcome,
            dispatched_at: Utc::now(),
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a<b>&\"c\""), "a&lt;b&gt;&amp;&quot;c&quot;");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_required_prompt_shows_current_and_keep_button() {
        let msg = render(&Reply::Prompt(Prompt::new(
            WizardStep::CollectCompiler,
            "Geopelia-Clang-20",
        )));

        assert!(msg.text.contains("Step 1/6 · Compiler"));
        assert!(msg.text.contains("<code>Geopelia-Clang-20</code>"));
        assert_eq!(msg.keyboard[0][0].data, "kb:collect_compiler:default");
        assert_eq!(msg.keyboard[1][0].data, "kb:collect_compiler:cancel");
    }

    #[test]
    fn test_prompt_with_error_and_ack() {
        let mut prompt = Prompt::new(WizardStep::CollectBranch, "yoka");
        prompt.accepted = Some((
            BuildField::KernelRepositoryUrl,
            "https://example.com/k.git".to_string(),
        ));
        prompt.error = Some(ValidationError::Empty {
            field: "Kernel Branch",
        });

        let msg = render(&Reply::Prompt(prompt));
        assert!(msg.text.contains("✅ Kernel Repository: <code>https://example.com/k.git</code>"));
        assert!(msg.text.contains("❌ Kernel Branch cannot be empty"));
        assert!(msg.text.contains("Step 3/6"));
    }

    #[test]
    fn test_ksu_prompt_offers_all_choices() {
        let msg = render(&Reply::Prompt(Prompt::new(WizardStep::CollectKsuMode, "")));
        let payloads: Vec<&str> = msg
            .keyboard
            .iter()
            .flatten()
            .map(|b| b.data.as_str())
            .collect();

        assert_eq!(
            payloads,
            vec![
                "kb:collect_ksu_mode:both",
                "kb:collect_ksu_mode:sus",
                "kb:collect_ksu_mode:ksu",
                "kb:collect_ksu_mode:skip",
                "kb:collect_ksu_mode:cancel",
            ]
        );
        assert!(msg.text.contains("SuSFS"));
    }

    #[test]
    fn test_summary_lists_fields_and_choices() {
        let msg = render(&Reply::Summary {
            config: defaults(),
            unrecognized: None,
        });

        assert!(msg.text.contains("<b>Compiler:</b> <code>Geopelia-Clang-20</code>"));
        assert!(msg.text.contains("<b>Notes:</b> <code>None</code>"));
        assert!(msg.text.contains("<b>KernelSU:</b> <code>None</code>"));
        assert_eq!(msg.keyboard[0][0].data, "kb:awaiting_confirmation:confirm");
        assert_eq!(msg.keyboard[1][0].data, "kb:awaiting_confirmation:edit");
        assert_eq!(msg.keyboard[1][1].data, "kb:awaiting_confirmation:cancel");
    }

    #[test]
    fn test_user_text_is_escaped_in_summary() {
        let mut config = defaults();
        config.notes = "<script>".to_string();

        let msg = render(&Reply::Summary {
            config,
            unrecognized: Some("<b>".to_string()),
        });
        assert!(msg.text.contains("&lt;script&gt;"));
        assert!(msg.text.contains("<code>&lt;b&gt;</code> is not an option"));
    }

    #[test]
    fn test_dispatch_success_includes_tracking_link() {
        let msg = render(&Reply::Dispatched(record(DispatchOutcome::Triggered {
            tracking: TrackingRef("https://github.com/o/r/actions/runs/1".to_string()),
        })));

        assert!(msg.text.contains("Build Started Successfully"));
        assert!(msg.text.contains("https://github.com/o/r/actions/runs/1"));
        assert!(msg.keyboard.is_empty());
    }

    #[test]
    fn test_dispatch_unauthorized_message() {
        let msg = render(&Reply::Dispatched(record(DispatchOutcome::Failed {
            error: DispatchError::Unauthorized("Bad credentials".to_string()),
        })));

        assert!(msg.text.contains("Build Failed to Start"));
        assert!(msg.text.contains("not authorized"));
        assert!(msg.text.contains("token was rejected"));
    }

    #[test]
    fn test_transient_failure_suggests_retry() {
        let msg = render(&Reply::Dispatched(record(DispatchOutcome::Failed {
            error: DispatchError::Transient("connection reset".to_string()),
        })));
        assert!(msg.text.contains("Send /build to try again."));
    }

    #[test]
    fn test_status_without_anything() {
        let msg = render(&Reply::Status(StatusReport {
            active_step: None,
            last_dispatch: None,
        }));
        assert!(msg.text.contains("No active build"));
        assert!(!msg.text.contains("Last build"));
    }

    #[test]
    fn test_status_with_active_step_and_history() {
        let msg = render(&Reply::Status(StatusReport {
            active_step: Some(WizardStep::CollectContainer),
            last_dispatch: Some(record(DispatchOutcome::Triggered {
                tracking: TrackingRef("https://github.com/o/r/actions".to_string()),
            })),
        }));

        assert!(msg.text.contains("step 4/6 (Container Image)"));
        assert!(msg.text.contains("<b>Last build:</b>"));
        assert!(msg.text.contains("href=\"https://github.com/o/r/actions\""));
    }
}
