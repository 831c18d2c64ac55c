//! Terminal UI: one prompt per line, result or error printed below it.

use std::io::{self, Write};

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::RunnerError;
use crate::runner::PromptRunner;
use crate::spinner::Spinner;

/// Format a generation outcome for the terminal.
pub fn render(outcome: &Result<String, RunnerError>) -> String {
    match outcome {
        Ok(text) => format!("\n=> {text}"),
        Err(e) => format!("\nerror: {e}"),
    }
}

/// Run a single prompt with a spinner, returning the outcome.
pub async fn run_once(runner: &PromptRunner, prompt: &str) -> Result<String, RunnerError> {
    let spinner = Spinner::start("generating");
    let outcome = runner.generate(prompt).await;
    spinner.stop().await;
    outcome
}

/// Read prompts from `input` until EOF, `quit`/`exit`, or Ctrl+C.
/// Returns the number of prompts submitted.
pub async fn run<R>(runner: &PromptRunner, input: R) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut submitted = 0;

    loop {
        print!("\nprompt> ");
        io::stdout().flush()?;

        let line = tokio::select! {
            result = lines.next_line() => {
                match result {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        println!();
                        break;
                    }
                    Err(e) => {
                        eprintln!("input error: {}", e);
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };

        if line.is_empty() {
            continue;
        }
        if matches!(line.trim(), "quit" | "exit") {
            break;
        }

        submitted += 1;
        // Ctrl+C during a call abandons the call, not the REPL
        tokio::select! {
            outcome = run_once(runner, &line) => {
                match &outcome {
                    Ok(_) => println!("{}", render(&outcome)),
                    Err(_) => eprintln!("{}", render(&outcome)),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\n\ninterrupted");
            }
        }
    }

    Ok(submitted)
}
