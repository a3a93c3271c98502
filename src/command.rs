//! Command recognition, tokenization and dispatch.
//!
//! A `privmsg` is a command when it is sent privately to the bot, starts
//! with `<nick>:`, or starts with the configured prefix. The remainder is
//! split with POSIX shell rules, the first word names the command, and every
//! plugin registered for that name runs concurrently.

use crate::bot::Bot;
use crate::plugin::{CommandSpec, Invocation, Plugin, Requirement, normalize_command};
use futures_util::FutureExt;
use futures_util::future::join_all;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;
use tracing::{Instrument, debug, debug_span, error, warn};

/// A command line split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// The command word as typed.
    pub typed: String,
    /// Normalized command name.
    pub command: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unbalanced quotes")]
    UnbalancedQuotes,
}

/// Extract the command text from a message, if it is addressed to the bot.
pub fn command_text<'a>(
    nickname: &str,
    prefix: Option<&str>,
    channel: &str,
    message: &'a str,
) -> Option<&'a str> {
    if let Some(rest) = message
        .strip_prefix(nickname)
        .and_then(|rest| rest.strip_prefix(':'))
    {
        return Some(rest);
    }
    if let Some(rest) = prefix
        .filter(|p| !p.is_empty())
        .and_then(|p| message.strip_prefix(p))
    {
        return Some(rest);
    }
    (channel == nickname).then_some(message)
}

/// Backslash-escape `#` at the start of unquoted words, so shell comment
/// syntax cannot swallow channel-name arguments.
fn escape_word_hashes(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let (mut single, mut double, mut escaped, mut word_start) = (false, false, false, true);
    for c in line.chars() {
        if escaped {
            escaped = false;
            word_start = false;
            out.push(c);
            continue;
        }
        match c {
            '\\' if !single => escaped = true,
            '\'' if !double => single = !single,
            '"' if !single => double = !double,
            '#' if word_start && !single && !double => out.push('\\'),
            _ => {}
        }
        word_start = c.is_whitespace() && !single && !double;
        out.push(c);
    }
    out
}

/// Split a command line. `Ok(None)` for blank input.
pub fn parse_command_line(line: &str) -> Result<Option<ParsedCommand>, ParseError> {
    let words =
        shlex::split(&escape_word_hashes(line.trim())).ok_or(ParseError::UnbalancedQuotes)?;
    let mut words = words.into_iter();
    let Some(typed) = words.next() else {
        return Ok(None);
    };
    Ok(Some(ParsedCommand {
        command: normalize_command(&typed),
        typed,
        args: words.collect(),
    }))
}

/// `a`, `a and b`, `a, b, and c`; `(none)` when empty.
pub fn natural_list<S: AsRef<str>>(items: &[S]) -> String {
    match items {
        [] => "(none)".to_owned(),
        [one] => one.as_ref().to_owned(),
        [a, b] => format!("{} and {}", a.as_ref(), b.as_ref()),
        [init @ .., last] => {
            let init: Vec<&str> = init.iter().map(AsRef::as_ref).collect();
            format!("{}, and {}", init.join(", "), last.as_ref())
        }
    }
}

impl Bot {
    /// Tokenize and run a command line from `user` in `channel`.
    pub async fn handle_command_line(&self, user: &str, channel: &str, line: &str) {
        match parse_command_line(line) {
            Ok(Some(parsed)) => self.dispatch_command(user, channel, parsed).await,
            Ok(None) => {}
            Err(e) => {
                debug!(user, channel, error = %e, "Unparseable command line");
                self.reply(user, channel, &format!("Sorry, I couldn't parse that: {e}."))
                    .await;
            }
        }
    }

    /// Run every handler registered for the command, concurrently.
    pub async fn dispatch_command(&self, user: &str, channel: &str, parsed: ParsedCommand) {
        let handlers = self.registry().tables().handlers(&parsed.command).to_vec();
        if handlers.is_empty() {
            debug!(command = %parsed.command, user, "Unknown command");
            self.reply(
                user,
                channel,
                &format!("Sorry, I don't understand '{}'. :(", parsed.command),
            )
            .await;
            return;
        }

        let invocation = Invocation {
            user: user.to_owned(),
            channel: channel.to_owned(),
            command: parsed.command,
            typed: parsed.typed,
            args: parsed.args,
        };
        let span = debug_span!("bot.command", command = %invocation.command, user, channel);
        let runs = handlers
            .into_iter()
            .map(|(plugin, spec)| self.run_handler(plugin, spec, &invocation));
        join_all(runs).instrument(span).await;
    }

    async fn run_handler(&self, plugin: Arc<dyn Plugin>, spec: CommandSpec, inv: &Invocation) {
        if let Some(requirement) = &spec.requirement {
            let (allowed, capability, scope) = match requirement {
                Requirement::Global(cap) => (self.user_has(&inv.user, cap), cap, ""),
                Requirement::Channel(cap) => (
                    self.user_has_in(&inv.channel, &inv.user, cap),
                    cap,
                    " in this channel",
                ),
            };
            if !allowed {
                debug!(
                    plugin = %plugin.name(),
                    command = %inv.command,
                    capability = %capability,
                    user = %inv.user,
                    "Command refused"
                );
                let text = format!("command '{}' requires privilege {capability}{scope}", inv.typed);
                self.reply(&inv.user, &inv.channel, &text).await;
                return;
            }
        }

        let outcome = AssertUnwindSafe(plugin.run_command(self, inv))
            .catch_unwind()
            .await;
        let err = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(e)) => {
                warn!(
                    plugin = %plugin.name(),
                    command = %inv.command,
                    error = %e,
                    code = e.error_code(),
                    "Command failed"
                );
                e.to_string()
            }
            Err(_) => {
                error!(plugin = %plugin.name(), command = %inv.command, "Command handler panicked");
                "internal error".to_owned()
            }
        };
        let text = format!("Error in the '{}' command: {err}", inv.command);
        self.reply(&inv.user, &inv.channel, &text).await;
    }

    /// `address_msg` with the failure logged instead of returned.
    pub(crate) async fn reply(&self, user: &str, channel: &str, text: &str) {
        if let Err(e) = self.address_msg(user, channel, text, true).await {
            warn!(user, channel, error = %e, "Failed to send reply");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addressed_by_nick() {
        assert_eq!(
            command_text("bot", None, "#dev", "bot: add-jira x y"),
            Some(" add-jira x y")
        );
        assert_eq!(command_text("bot", None, "#dev", "bot add-jira"), None);
        assert_eq!(command_text("bot", None, "#dev", "hello there"), None);
    }

    #[test]
    fn addressed_by_prefix() {
        assert_eq!(command_text("bot", Some("!"), "#dev", "!logs"), Some("logs"));
        assert_eq!(command_text("bot", Some(""), "#dev", "logs"), None);
    }

    #[test]
    fn private_messages_are_commands() {
        assert_eq!(command_text("bot", None, "bot", "modules"), Some("modules"));
        assert_eq!(command_text("bot", Some("!"), "bot", "!modules"), Some("modules"));
    }

    #[test]
    fn tokenizes_with_shell_quoting() {
        let parsed =
            parse_command_line(r#"add-jira http://x.example "My Project" PROJ min=100"#)
                .unwrap()
                .unwrap();
        assert_eq!(parsed.command, "add_jira");
        assert_eq!(parsed.typed, "add-jira");
        assert_eq!(
            parsed.args,
            vec!["http://x.example", "My Project", "PROJ", "min=100"]
        );
    }

    #[test]
    fn channel_arguments_survive() {
        let parsed = parse_command_line(r##"grant op bob!*@* #dev "#not-a-comment" 'x #y'"##)
            .unwrap()
            .unwrap();
        assert_eq!(
            parsed.args,
            vec!["op", "bob!*@*", "#dev", "#not-a-comment", "x #y"]
        );
        assert_eq!(escape_word_hashes(r"a \#b c#d"), r"a \#b c#d");
    }

    #[test]
    fn blank_and_unbalanced_input() {
        assert_eq!(parse_command_line("   "), Ok(None));
        assert_eq!(
            parse_command_line(r#"say "oops"#),
            Err(ParseError::UnbalancedQuotes)
        );
    }

    #[test]
    fn natural_lists() {
        let none: [&str; 0] = [];
        assert_eq!(natural_list(&none), "(none)");
        assert_eq!(natural_list(&["a"]), "a");
        assert_eq!(natural_list(&["a", "b"]), "a and b");
        assert_eq!(natural_list(&["a", "b", "c"]), "a, b, and c");
    }
}
