//! Client-side interception of the destructive clear-all chat command.

/// Exact input strings (trimmed, case-insensitive) that trigger the clear-all
/// flow instead of being sent as text.
pub const CLEAR_TRIGGERS: [&str; 4] = ["/clear-all", "清空数据", "/清空", "clear all"];

/// Fixed out-of-band code shared with the backend.
///
/// A known limitation carried over from the server contract, not a security
/// boundary: the backend rejects any other value with 400.
pub const CLEAR_CONFIRM_CODE: &str = "1234";

/// Warning shown before the code prompt.
pub const CLEAR_WARNING: &str =
    "This permanently deletes every message and file for all devices. There is no undo.";

/// Whether `input` is a clear-all trigger and must never reach the transport
/// as a text message.
pub fn is_clear_command(input: &str) -> bool {
    let normalized = input.trim().to_lowercase();
    CLEAR_TRIGGERS
        .iter()
        .any(|trigger| normalized == trigger.to_lowercase())
}

/// Interactive confirmation seam for destructive flows.
///
/// Implemented over stdin by the CLI; tests script it.
pub trait ConfirmPrompt {
    /// Ask the user to confirm a destructive action.
    fn confirm_destructive(&mut self, warning: &str) -> bool;

    /// Ask the user for the confirmation code; `None` when dismissed.
    fn request_code(&mut self) -> Option<String>;
}

/// Local gate decision for the clear-all flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearDecision {
    /// User declined the confirmation dialog.
    Cancelled,
    /// Entered code did not match; the server must not be called.
    CodeMismatch,
    /// Confirmed with the matching code; safe to issue the server call.
    Proceed { confirm_code: String },
}

/// Run the confirm → code-prompt gate. No server interaction happens here;
/// anything but [`ClearDecision::Proceed`] must leave server and local view
/// untouched.
pub fn decide_clear(prompt: &mut dyn ConfirmPrompt) -> ClearDecision {
    if !prompt.confirm_destructive(CLEAR_WARNING) {
        return ClearDecision::Cancelled;
    }
    match prompt.request_code() {
        Some(code) if code.trim() == CLEAR_CONFIRM_CODE => ClearDecision::Proceed {
            confirm_code: code.trim().to_owned(),
        },
        _ => ClearDecision::CodeMismatch,
    }
}
