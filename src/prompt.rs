use crate::error::Result;
use colored::Colorize;
use std::io::{self, BufRead, Write};

/// Ask a free-text question on stdout and read one trimmed line from stdin.
pub fn ask(question: &str) -> Result<String> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();
    ask_with(&mut input, &mut output, question)
}

/// Ask a yes/no question; only `y`/`Y`/`yes` count as an affirmation.
pub fn confirm(question: &str) -> Result<bool> {
    let answer = ask(question)?;
    Ok(is_affirmative(&answer))
}

/// Keep asking until the operator supplies a non-blank value.
pub fn ask_required(question: &str) -> Result<String> {
    loop {
        let answer = ask(question)?;
        if !answer.is_empty() {
            return Ok(answer);
        }
        println!("{}", "Please submit a proper value.".red());
    }
}

pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

pub(crate) fn ask_with<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
) -> Result<String> {
    write!(output, "{} ", question.bold())?;
    output.flush()?;

    let mut line = String::new();
    let bytes = input.read_line(&mut line)?;
    if bytes == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input stream closed").into());
    }
    Ok(line.trim().to_string())
}
