//! Terminal implementations of the confirmation prompt and notices

use cadrelay_bridge::Notifier;
use cadrelay_script::{Confirm, ScriptPreview};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

/// Shows the preview and asks on the terminal
///
/// Keeps asking until the operator answers yes or no; Ctrl+C and Ctrl+D
/// decline.
#[derive(Debug, Default)]
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&mut self, preview: &ScriptPreview) -> bool {
        println!("\n{}\n", preview.prompt());
        if preview.is_truncated() {
            println!("(showing part of a {} character script)", preview.total_chars());
        }

        let mut editor = match DefaultEditor::new() {
            Ok(editor) => editor,
            Err(e) => {
                tracing::warn!("cannot prompt for confirmation: {}", e);
                return false;
            }
        };

        loop {
            match editor.readline("Execute? [y/n] ") {
                Ok(answer) => match parse_answer(&answer) {
                    Some(yes) => return yes,
                    None => println!("Please answer y or n"),
                },
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => return false,
                Err(e) => {
                    tracing::warn!("confirmation prompt failed: {}", e);
                    return false;
                }
            }
        }
    }
}

fn parse_answer(answer: &str) -> Option<bool> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Prints notices to stdout
#[derive(Debug, Default)]
pub struct PrintNotifier;

impl Notifier for PrintNotifier {
    fn notify(&mut self, title: &str, message: &str) {
        println!("[{}] {}", title, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer("y"), Some(true));
        assert_eq!(parse_answer(" YES "), Some(true));
        assert_eq!(parse_answer("n"), Some(false));
        assert_eq!(parse_answer("No"), Some(false));
        // No default answer
        assert_eq!(parse_answer(""), None);
        assert_eq!(parse_answer("maybe"), None);
    }
}
