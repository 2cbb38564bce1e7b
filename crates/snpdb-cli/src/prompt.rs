// SPDX-License-Identifier: Apache-2.0

//! Interactive conflict resolution over a line-oriented terminal.

use std::io::{BufRead, Write};

use snpdb_ingest::{ConflictPrompt, Decision, DecisionHandler};

pub(crate) struct LinePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub(crate) fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn menu(prompt: &ConflictPrompt) -> String {
        let mut choices = Vec::new();
        if !prompt.candidates.is_empty() {
            choices.push(format!("[1-{}] use existing", prompt.candidates.len()));
        }
        if prompt.options.create_new {
            choices.push("[n] create new".to_string());
        }
        if prompt.options.always_create_new {
            choices.push("[a] always create new".to_string());
        }
        if prompt.options.always_use_existing {
            choices.push("[e] always use existing".to_string());
        }
        choices.push("[q] abort".to_string());
        choices.join(", ")
    }
}

fn parse_answer(answer: &str, prompt: &ConflictPrompt) -> Option<Decision> {
    let decision = match answer.trim() {
        "n" | "N" => Decision::CreateNew,
        "a" | "A" => Decision::AlwaysCreateNew,
        "e" | "E" => Decision::AlwaysUseExisting,
        "q" | "Q" => Decision::Abort,
        other => {
            let index: usize = other.parse().ok()?;
            Decision::UseExisting(index.checked_sub(1)?)
        }
    };
    prompt.allows(decision).then_some(decision)
}

impl<R: BufRead, W: Write> DecisionHandler for LinePrompt<R, W> {
    fn decide(&mut self, prompt: &ConflictPrompt) -> Decision {
        let menu = Self::menu(prompt);
        loop {
            // a broken terminal aborts instead of guessing
            if write!(self.output, "{prompt}{menu}: ")
                .and_then(|()| self.output.flush())
                .is_err()
            {
                return Decision::Abort;
            }
            let mut line = String::new();
            match self.input.read_line(&mut line) {
                Ok(0) | Err(_) => return Decision::Abort,
                Ok(_) => {}
            }
            if let Some(decision) = parse_answer(&line, prompt) {
                return decision;
            }
            if writeln!(self.output, "unrecognised answer `{}`", line.trim()).is_err() {
                return Decision::Abort;
            }
        }
    }
}
