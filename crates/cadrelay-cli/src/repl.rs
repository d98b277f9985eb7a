//! Interactive tool-call console
//!
//! Edit the server, endpoint, tool name and parameters, send calls, and save
//! or run the scripts that come back.

use anyhow::Result;
use cadrelay_bridge::{Session, Transcript};
use cadrelay_client::{ClientConfig, ToolClient};
use cadrelay_core::{Endpoint, RelayConfig, parse_parameters};
use cadrelay_script::ExecutionGate;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{CompletionType, Config, EditMode, Editor};
use std::path::{Path, PathBuf};

use crate::terminal::TerminalConfirm;

/// REPL state
pub struct Repl {
    session: Session,
    client: ToolClient,
    gate: ExecutionGate,
    editor: Editor<(), DefaultHistory>,
    history_path: Option<PathBuf>,
}

impl Repl {
    /// Create a new REPL instance
    pub fn new(config: &RelayConfig, transcript: Option<&Path>) -> Result<Self> {
        let editor_config = Config::builder()
            .history_ignore_space(true)
            .completion_type(CompletionType::List)
            .edit_mode(EditMode::Emacs)
            .build();

        let mut editor = Editor::with_config(editor_config)?;

        let history_path = history_path();
        if let Some(ref path) = history_path {
            let _ = editor.load_history(path);
        }

        let mut session = Session::new(config);
        if let Some(path) = transcript {
            session = session.with_transcript(Transcript::with_mirror(path)?);
        }

        Ok(Self {
            session,
            client: ToolClient::new(ClientConfig {
                timeout: config.timeout(),
            })?,
            gate: ExecutionGate::from_config(config),
            editor,
            history_path,
        })
    }

    /// Run the REPL loop
    pub fn run(&mut self) -> Result<()> {
        println!("{}", WELCOME_MESSAGE);
        self.print_state();

        loop {
            match self.editor.readline("relay> ") {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    let _ = self.editor.add_history_entry(trimmed);

                    if !trimmed.starts_with(':') {
                        println!("Commands start with ':'. Type :help for available commands.");
                        continue;
                    }

                    match self.handle_command(trimmed) {
                        CommandResult::Continue => {}
                        CommandResult::Exit => break,
                        CommandResult::Error(e) => eprintln!("Error: {}", e),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("Use :quit or Ctrl+D to exit");
                }
                Err(ReadlineError::Eof) => {
                    println!("\nGoodbye!");
                    break;
                }
                Err(err) => {
                    eprintln!("Error: {:?}", err);
                    break;
                }
            }
        }

        if let Some(ref path) = self.history_path {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let _ = self.editor.save_history(path);
        }

        Ok(())
    }

    /// Handle REPL commands
    fn handle_command(&mut self, cmd: &str) -> CommandResult {
        let (command, args) = match cmd.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, Some(rest.trim()).filter(|s| !s.is_empty())),
            None => (cmd, None),
        };

        match command {
            ":help" | ":h" | ":?" => {
                println!("{}", HELP_MESSAGE);
                CommandResult::Continue
            }
            ":quit" | ":q" | ":exit" => CommandResult::Exit,
            ":server" => match args {
                Some(url) => {
                    self.session.server_url = url.to_string();
                    println!("Server: {}", self.session.url());
                    CommandResult::Continue
                }
                None => {
                    println!("Server: {}", self.session.server_url);
                    CommandResult::Continue
                }
            },
            ":endpoint" => match args {
                Some(name) => match Endpoint::parse(name) {
                    Some(endpoint) => {
                        self.session.endpoint = endpoint;
                        println!("Endpoint: {}", endpoint);
                        CommandResult::Continue
                    }
                    None => CommandResult::Error(format!(
                        "Unknown endpoint '{}'. Use /call_tool or /call_tools.",
                        name
                    )),
                },
                None => {
                    println!("Endpoint: {}", self.session.endpoint);
                    CommandResult::Continue
                }
            },
            ":tool" => match args {
                Some(name) => {
                    self.session.tool_name = name.to_string();
                    println!("Tool: {}", name);
                    CommandResult::Continue
                }
                None => {
                    println!("Tool: {}", self.session.tool_name);
                    CommandResult::Continue
                }
            },
            ":params" => self.edit_params(args),
            ":load-params" => match args {
                Some(path) => self.load_params(path),
                None => {
                    println!("Usage: :load-params <file>");
                    CommandResult::Continue
                }
            },
            ":paste" => self.paste_params(),
            ":clear-params" => {
                self.session.clear_params();
                println!("Parameters cleared");
                CommandResult::Continue
            }
            ":send" | ":s" => self.send(),
            ":save" => self.save(args),
            ":run" | ":r" => self.run_script(),
            ":show" => {
                self.print_state();
                match self.session.last_response() {
                    Some(response) => {
                        let pretty = serde_json::to_string_pretty(response.value()).unwrap_or_default();
                        println!("\nLast response:\n{}", pretty);
                    }
                    None => println!("\nNo response yet"),
                }
                CommandResult::Continue
            }
            ":log" => {
                let text = self.session.transcript().text();
                if text.is_empty() {
                    println!("Transcript is empty");
                } else {
                    print!("{}", text);
                }
                CommandResult::Continue
            }
            _ => CommandResult::Error(format!(
                "Unknown command: {}. Type :help for available commands.",
                command
            )),
        }
    }

    /// Set parameters inline, or read lines until the document is balanced
    fn edit_params(&mut self, inline: Option<&str>) -> CommandResult {
        let mut text = inline.unwrap_or_default().to_string();

        while text.trim().is_empty() || !is_balanced(&text) {
            match self.editor.readline("...> ") {
                Ok(line) => {
                    text.push_str(&line);
                    text.push('\n');
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                    println!("^C - parameter edit cancelled");
                    return CommandResult::Continue;
                }
                Err(e) => return CommandResult::Error(e.to_string()),
            }
        }

        self.set_params(text)
    }

    fn load_params(&mut self, path: &str) -> CommandResult {
        match std::fs::read_to_string(path) {
            Ok(text) => self.set_params(text),
            Err(e) => CommandResult::Error(format!("Failed to read {}: {}", path, e)),
        }
    }

    fn paste_params(&mut self) -> CommandResult {
        let text = arboard::Clipboard::new().and_then(|mut clipboard| clipboard.get_text());
        match text {
            Ok(text) => self.set_params(text),
            Err(e) => CommandResult::Error(format!("Clipboard unavailable: {}", e)),
        }
    }

    /// Store parameter text, warning early if it will not send
    fn set_params(&mut self, text: String) -> CommandResult {
        // Batch documents are checked on send
        if !self.session.endpoint.is_batch() {
            if let Err(e) = parse_parameters(&text) {
                println!("Warning: {}", e);
            }
        }
        self.session.set_params_text(text);
        println!("Parameters updated");
        CommandResult::Continue
    }

    fn send(&mut self) -> CommandResult {
        println!("POST {}", self.session.url());
        match self.session.send(&self.client) {
            Ok(response) => {
                let pretty = serde_json::to_string_pretty(response.value()).unwrap_or_default();
                println!("{}", pretty);
                if response.is_actionable() {
                    println!("\nScript received. Use :save [file] or :run");
                }
                CommandResult::Continue
            }
            Err(e) => CommandResult::Error(e.to_string()),
        }
    }

    fn save(&mut self, path: Option<&str>) -> CommandResult {
        match self.session.save_last_script(path.map(Path::new)) {
            Ok(path) => {
                println!("Saved script to {}", path.display());
                CommandResult::Continue
            }
            Err(e) => CommandResult::Error(e.to_string()),
        }
    }

    fn run_script(&mut self) -> CommandResult {
        match self.session.run_last_script(&self.gate, &mut TerminalConfirm) {
            Ok(outcome) => {
                if outcome.is_fault() {
                    eprintln!("{}", outcome);
                } else {
                    println!("{}", outcome);
                }
                CommandResult::Continue
            }
            Err(e) => CommandResult::Error(e.to_string()),
        }
    }

    fn print_state(&self) {
        println!("Server:     {}", self.session.server_url);
        println!("Endpoint:   {}", self.session.endpoint);
        println!("Tool:       {}", self.session.tool_name);
        println!("Parameters: {}", self.session.params_text());
    }
}

/// Result of handling a command
enum CommandResult {
    Continue,
    Exit,
    Error(String),
}

/// Check if braces and brackets are balanced outside of JSON strings
fn is_balanced(input: &str) -> bool {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for c in input.chars() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => depth -= 1,
            _ => {}
        }
    }

    depth <= 0 && !in_string
}

/// Get the history file path
fn history_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("cadrelay").join("repl_history"))
}

const WELCOME_MESSAGE: &str = r#"
cadrelay interactive console

Send tool calls, inspect responses, save or run returned scripts.
Type :help for commands.
"#;

const HELP_MESSAGE: &str = r#"
Commands:
  :help, :h, :?        - Show this help message
  :quit, :q, :exit     - Exit the console
  :server [url]        - Show or set the tool server base URL
  :endpoint [path]     - Show or set the endpoint (/call_tool or /call_tools)
  :tool [name]         - Show or set the tool name
  :params [json]       - Set parameters; unbalanced input continues on next line
  :load-params <file>  - Read parameters from a file
  :paste               - Read parameters from the clipboard
  :clear-params        - Send no parameters
  :send, :s            - Send the tool call
  :save [file]         - Save the last script verbatim (default generated_script.rhai)
  :run, :r             - Run the last script after confirmation
  :show                - Show current settings and the last response
  :log                 - Show the session transcript

Tips:
  - On /call_tools, a JSON array of {"tool_name", "parameters"} objects is
    sent as-is; an object is sent as a one-element batch
  - Use Ctrl+C to cancel input, Ctrl+D to exit
"#;

/// Entry point for the REPL command
pub fn run_repl(config: &RelayConfig, transcript: Option<&Path>) -> Result<()> {
    let mut repl = Repl::new(config, transcript)?;
    repl.run()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balanced_documents() {
        assert!(is_balanced(r#"{"plane": "xy"}"#));
        assert!(is_balanced(r#"[{"tool_name": "A"}, {"tool_name": "B"}]"#));
        assert!(!is_balanced(r#"{"plane": "xy","#));
        assert!(!is_balanced("["));
    }

    #[test]
    fn test_brackets_inside_strings_are_ignored() {
        assert!(is_balanced(r#"{"note": "a { b ["}"#));
        assert!(is_balanced(r#"{"note": "quote \" then {"}"#));
        assert!(!is_balanced(r#"{"note": "unterminated"#));
    }
}
