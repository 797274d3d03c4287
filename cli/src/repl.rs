//! Interactive loop: read a line, run a turn on the same thread, print, repeat.

use std::io::Write;

use insight::Assistant;
use tokio::io::{AsyncBufReadExt, BufReader};

fn is_quit_command(line: &str) -> bool {
    matches!(line.trim(), "quit" | "exit" | "/quit")
}

/// Exits on EOF or a quit command. A failed turn is reported and the loop continues.
pub async fn run_repl_loop(
    assistant: &Assistant,
    thread_id: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = match lines.next_line().await? {
            None => break,
            Some(s) if s.trim().is_empty() => continue,
            Some(s) if is_quit_command(&s) => break,
            Some(s) => s,
        };

        match assistant.run_turn(thread_id, &line).await {
            Ok(outcome) => crate::print_outcome(&outcome, thread_id, json)?,
            Err(e) => eprintln!("error: {}", e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::is_quit_command;

    /// **Scenario**: Only a bare quit word ends the REPL; a sentence starting with it does not.
    #[test]
    fn quit_commands() {
        assert!(is_quit_command("quit"));
        assert!(is_quit_command(" exit "));
        assert!(is_quit_command("/quit"));
        assert!(!is_quit_command("quit the funnel"));
    }
}
