// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

use crate::dispatcher::Dispatcher;
use chatwatch_core::rules::WordList;
use chatwatch_core::{ChannelKind, RuleEdit};
use std::fmt::Write as _;
use std::future::Future;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// A parsed, validated control command read from the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // Stop monitoring and exit
    Quit,
    // List commands
    Help,
    // Begin monitoring (no-op when already running)
    Start,
    // Stop monitoring, keep the process alive
    Stop,
    // Print monitor state and counters
    Status,
    // Print current rules
    Rules,
    // Add a word to the NG or SP list
    AddWord(WordList, String),
    // Remove a word from the NG or SP list
    RemoveWord(WordList, String),
    // Flip a channel's visibility
    ToggleChannel(ChannelKind),
    // Show (`on`) or suppress (`off`) a noise prefix
    Noise(String, bool),
    // Empty the message history
    Clear,
    // Case-insensitive search over history
    Search(String),
}

pub const HELP: &str = "\
commands:
  ng add|rm <word>      edit the NG (suppress) list
  sp add|rm <word>      edit the SP (force-show) list
  ch <channel>          toggle general|whisper|team|club|system|shout
  noise <prefix> on|off suppress or show a system-notice prefix
  search <text>         find stored messages
  clear                 drop stored history
  rules                 show current rules
  start | stop          control monitoring
  status                show monitor state
  help | q";

impl Command {
    /// Parse a raw command line.
    ///
    /// Returns `Ok(cmd)` on success, `Err(message)` on failure. An empty
    /// string returns `Err("")` as a sentinel meaning "do nothing".
    pub fn parse(input: &str) -> Result<Command, String> {
        let input = input.trim();
        if input.is_empty() {
            return Err(String::new());
        }

        let (word, rest) = input
            .split_once(char::is_whitespace)
            .map(|(w, r)| (w, r.trim()))
            .unwrap_or((input, ""));

        match word {
            "q" | "quit" | "exit" => Ok(Command::Quit),
            "help" | "?" => Ok(Command::Help),
            "start" => Ok(Command::Start),
            "stop" => Ok(Command::Stop),
            "status" => Ok(Command::Status),
            "rules" => Ok(Command::Rules),
            "clear" => Ok(Command::Clear),
            "ng" => parse_word_edit(WordList::Ng, rest),
            "sp" => parse_word_edit(WordList::Sp, rest),
            "ch" | "channel" => ChannelKind::from_name(rest)
                .map(Command::ToggleChannel)
                .ok_or_else(|| "usage: ch <general|whisper|team|club|system|shout>".to_string()),
            "noise" => match rest.rsplit_once(char::is_whitespace) {
                Some((prefix, "on")) if !prefix.trim().is_empty() => {
                    Ok(Command::Noise(prefix.trim().to_string(), true))
                }
                Some((prefix, "off")) if !prefix.trim().is_empty() => {
                    Ok(Command::Noise(prefix.trim().to_string(), false))
                }
                _ => Err("usage: noise <prefix> on|off".to_string()),
            },
            "search" | "/" => {
                if rest.is_empty() {
                    Err("usage: search <text>".to_string())
                } else {
                    Ok(Command::Search(rest.to_string()))
                }
            }
            other => Err(format!("unknown command: {other}")),
        }
    }
}

fn parse_word_edit(list: WordList, rest: &str) -> Result<Command, String> {
    let usage = || format!("usage: {} add|rm <word>", list.to_string().to_lowercase());
    let (action, word) = rest
        .split_once(char::is_whitespace)
        .map(|(a, w)| (a, w.trim()))
        .ok_or_else(usage)?;
    if word.is_empty() {
        return Err(usage());
    }
    match action {
        "add" => Ok(Command::AddWord(list, word.to_string())),
        "rm" | "remove" | "del" => Ok(Command::RemoveWord(list, word.to_string())),
        _ => Err(usage()),
    }
}

/// What the console loop should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub message: String,
    pub quit: bool,
}

impl Reply {
    fn say(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            quit: false,
        }
    }
}

/// Execute a parsed [`Command`] against the dispatcher.
pub fn execute_command(d: &Dispatcher, cmd: Command) -> Reply {
    match cmd {
        Command::Quit => Reply {
            message: String::new(),
            quit: true,
        },
        Command::Help => Reply::say(HELP),
        Command::Start => match d.start() {
            Ok(()) => Reply::say("monitoring started"),
            Err(e) => Reply::say(e.to_string()),
        },
        Command::Stop => {
            if d.stop() {
                Reply::say("monitoring stops after the current cycle")
            } else {
                Reply::say("not monitoring")
            }
        }
        Command::Status => {
            let stats = d.stats();
            Reply::say(format!(
                "{} ({}) cycles={} fragments={} events={} faults={}",
                d.state(),
                d.folder().display(),
                stats.cycles,
                stats.fragments,
                stats.events,
                stats.faults
            ))
        }
        Command::Rules => Reply::say(describe_rules(d)),
        Command::AddWord(list, word) => {
            Reply::say(describe_edit(d.add_word(list, &word), list, &word, "added"))
        }
        Command::RemoveWord(list, word) => {
            Reply::say(describe_edit(d.remove_word(list, &word), list, &word, "removed"))
        }
        Command::ToggleChannel(channel) => {
            let on = d.toggle_channel(channel);
            Reply::say(format!("{channel} {}", if on { "shown" } else { "hidden" }))
        }
        Command::Noise(prefix, shown) => {
            if d.set_noise_suppressed(&prefix, !shown) {
                Reply::say(format!("noise {prefix:?} {}", if shown { "shown" } else { "suppressed" }))
            } else {
                Reply::say(format!("no such noise prefix: {prefix:?}"))
            }
        }
        Command::Clear => {
            d.clear_messages();
            Reply::say("history cleared")
        }
        Command::Search(needle) => {
            let hits = d.search(&needle);
            let mut out = format!("{} match(es)", hits.len());
            for event in hits {
                let _ = write!(out, "\n  {} [{}] {}", event.timestamp, event.channel, event.text);
            }
            Reply::say(out)
        }
    }
}

/// Read and execute commands from `input` until `q` or until `shutdown`
/// resolves. Replies go to stderr. End of input stops reading commands but
/// keeps the console waiting for `shutdown`, so a detached stdin does not end
/// monitoring.
pub async fn run_console<R, F>(d: &Dispatcher, input: R, shutdown: F) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    F: Future<Output = ()>,
{
    let mut lines = input.lines();
    let mut input_open = true;
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.next_line(), if input_open => {
                let Some(line) = line? else {
                    tracing::info!("console input closed, waiting for shutdown");
                    input_open = false;
                    continue;
                };
                match Command::parse(&line) {
                    Ok(cmd) => {
                        let reply = execute_command(d, cmd);
                        if !reply.message.is_empty() {
                            eprintln!("{}", reply.message);
                        }
                        if reply.quit {
                            break;
                        }
                    }
                    Err(msg) if msg.is_empty() => {}
                    Err(msg) => eprintln!("{msg}"),
                }
            }
            _ = &mut shutdown => break,
        }
    }
    Ok(())
}

fn describe_edit(outcome: RuleEdit, list: WordList, word: &str, verb: &str) -> String {
    match outcome {
        RuleEdit::Applied => format!("{list} {verb}: {word}"),
        RuleEdit::AlreadyPresent => format!("{list} already has {word:?}"),
        RuleEdit::NotPresent => format!("{list} has no {word:?}"),
        RuleEdit::Rejected => "empty word ignored".to_string(),
    }
}

fn describe_rules(d: &Dispatcher) -> String {
    let rules = d.rules();
    let join = |list: WordList| rules.words(list).collect::<Vec<_>>().join(", ");
    let mut out = format!("NG: [{}]\nSP: [{}]\nchannels:", join(WordList::Ng), join(WordList::Sp));
    for (channel, on) in rules.channels() {
        let _ = write!(out, " {channel}={}", if on { "on" } else { "off" });
    }
    out.push_str("\nnoise:");
    for prefix in d.noise_prefixes() {
        let _ = write!(out, " {:?}={}", prefix.prefix, if prefix.suppress { "off" } else { "on" });
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
