//! Line-based prompts for interactive sessions.

use std::io::{self, Write};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};

/// The input that ends the current phase of a session.
pub const EXIT: &str = "exit";

/// Reads answers line by line and writes prompts and results.
#[derive(Debug)]
pub struct Console<R, W> {
    input: R,
    output: W,
    line: Vec<u8>,
}

impl Console<BufReader<Stdin>, io::Stdout> {
    /// A console attached to stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), io::stdout())
    }
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    /// Creates a console from an input and an output.
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            line: Vec::new(),
        }
    }

    /// Prints the message and reads one trimmed line.
    ///
    /// Bytes that are not valid UTF-8 are replaced with `U+FFFD`, so they surface as an invalid
    /// answer instead of an error. Returns `None` once the input stream is closed.
    pub async fn prompt(&mut self, message: &str) -> io::Result<Option<String>> {
        writeln!(self.output, "{message}")?;
        self.output.flush()?;

        self.line.clear();
        if self.input.read_until(b'\n', &mut self.line).await? == 0 {
            return Ok(None);
        }

        Ok(Some(String::from_utf8_lossy(&self.line).trim().to_owned()))
    }

    /// Prints an informational line.
    pub fn say(&mut self, message: impl std::fmt::Display) -> io::Result<()> {
        writeln!(self.output, "{message}")
    }

    /// Prints a validation error.
    pub fn reject(&mut self, message: impl std::fmt::Display) -> io::Result<()> {
        writeln!(self.output, "{}", yansi::Paint::red(&message.to_string()))
    }

    /// Consumes the console and returns the output.
    pub fn into_output(self) -> W {
        self.output
    }
}

/// Returns `true` if the answer is the exit sentinel.
pub fn is_exit(answer: &str) -> bool {
    answer.eq_ignore_ascii_case(EXIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_trimmed_lines_until_closed() {
        yansi::disable();

        let input: &[u8] = b"  12 \nexit\n";
        let mut console = Console::new(input, Vec::new());

        assert_eq!(console.prompt("first").await.unwrap().as_deref(), Some("12"));
        assert_eq!(console.prompt("second").await.unwrap().as_deref(), Some("exit"));
        assert_eq!(console.prompt("third").await.unwrap(), None);

        let output = String::from_utf8(console.into_output()).unwrap();
        assert_eq!(output, "first\nsecond\nthird\n");
    }

    #[tokio::test]
    async fn every_prompt_reads_only_its_own_line() {
        let input: &[u8] = b"app\n1000\n10000\n25\n";
        let mut console = Console::new(input, Vec::new());

        for expected in ["app", "1000", "10000", "25"] {
            let answer = console.prompt("next").await.unwrap();
            assert_eq!(answer.as_deref(), Some(expected));
        }
        assert_eq!(console.prompt("next").await.unwrap(), None);
    }

    #[tokio::test]
    async fn undecodable_bytes_are_an_answer() {
        let input: &[u8] = b"\xff\xfe\n2\n";
        let mut console = Console::new(input, Vec::new());

        let answer = console.prompt("amount").await.unwrap().unwrap();
        assert_eq!(answer, "\u{FFFD}\u{FFFD}");
        assert_eq!(console.prompt("amount").await.unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn exit_is_case_insensitive() {
        assert!(is_exit("EXIT"));
        assert!(is_exit("exit"));
        assert!(!is_exit("exit now"));
    }
}
