//! Line-oriented control channel on stdin.

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::thread;

use crossbeam_channel::Sender;
use cybercompanion::director::DirectorEvent;
use cybercompanion::log_debug;

pub(crate) const HELP: &str =
    "commands: summon | toggle | idle | active | media on|off | comment <text> | switch <dir> [voice] | quit";

/// Map one input line to a director event. `Err` carries a message for the user.
pub(crate) fn parse_command(line: &str) -> Result<Option<DirectorEvent>, String> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    let event = match verb.to_ascii_lowercase().as_str() {
        "" => return Ok(None),
        "summon" => DirectorEvent::Summon,
        "toggle" => DirectorEvent::ToggleVisibility,
        "idle" => DirectorEvent::UserIdleConfirmed,
        "active" => DirectorEvent::UserActiveDetected,
        "media" => match rest {
            "on" => DirectorEvent::MediaStarted,
            "off" => DirectorEvent::MediaStopped,
            _ => return Err("usage: media on|off".to_string()),
        },
        "comment" => {
            if rest.is_empty() {
                return Err("usage: comment <screen text>".to_string());
            }
            DirectorEvent::RequestCommentary(rest.to_string())
        }
        "switch" => {
            let mut parts = rest.split_whitespace();
            let Some(root) = parts.next() else {
                return Err("usage: switch <dir> [voice]".to_string());
            };
            DirectorEvent::SwitchCharacter {
                root: PathBuf::from(root),
                voice: parts.next().map(str::to_string),
            }
        }
        "quit" | "exit" => DirectorEvent::Shutdown,
        other => return Err(format!("unknown command '{other}'; {HELP}")),
    };
    Ok(Some(event))
}

/// Forward parsed stdin lines until EOF; EOF itself is not treated as a shutdown.
pub(crate) fn spawn_command_thread(tx: Sender<DirectorEvent>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    log_debug(&format!("stdin read error: {err}"));
                    break;
                }
            };
            match parse_command(&line) {
                Ok(Some(event)) => {
                    if tx.send(event).is_err() {
                        return;
                    }
                }
                Ok(None) => {}
                Err(message) => eprintln!("{message}"),
            }
        }
    })
}
