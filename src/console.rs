//! Blocking stdin prompts, moved off the async runtime

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};

/// Print `prompt` and read one trimmed line from stdin. A closed stdin is an
/// `UnexpectedEof` error, not an empty answer.
pub async fn read_line(prompt: &str) -> Result<String> {
    let prompt = prompt.to_string();
    tokio::task::spawn_blocking(move || -> Result<String> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", prompt)?;
        stdout.flush()?;

        Ok(read_answer(&mut io::stdin().lock())?)
    })
    .await
    .context("Prompt task panicked")?
}

fn read_answer(input: &mut impl BufRead) -> io::Result<String> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin is closed"));
    }
    Ok(line.trim().to_string())
}

/// True when `err` comes from reading a closed stdin
pub fn is_input_closed(err: &anyhow::Error) -> bool {
    err.downcast_ref::<io::Error>()
        .is_some_and(|e| e.kind() == io::ErrorKind::UnexpectedEof)
}

pub async fn pause() {
    let _ = read_line("\nPress Enter to continue...").await;
}

/// Only an explicit `y` or `yes` counts
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

pub fn clear_screen() {
    print!("\x1B[2J\x1B[1;1H");
    let _ = io::stdout().flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn closed_input_differs_from_bare_enter() {
        assert_eq!(read_answer(&mut Cursor::new("\n")).unwrap(), "");
        assert_eq!(read_answer(&mut Cursor::new("  2 \r\n")).unwrap(), "2");

        let err = read_answer(&mut Cursor::new("")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert!(is_input_closed(&anyhow::Error::new(err)));
        assert!(!is_input_closed(&anyhow::anyhow!("other failure")));
    }

    #[test]
    fn only_explicit_yes_confirms() {
        assert!(is_affirmative("y"));
        assert!(is_affirmative(" YES "));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("n"));
        assert!(!is_affirmative(" No "));
    }
}
