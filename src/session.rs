//! Run-scoped configuration: verbosity and the overwrite policy.
//!
//! A [`Session`] is created once per run and handed down the pipeline by
//! reference. It uses `Cell`/`RefCell`, so it is neither `Sync` nor shareable
//! across threads, which keeps the whole pipeline sequential.

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    io::{self, BufRead, Write},
    path::Path,
};

use crate::{
    error::{Error, Result},
    log,
};

/// Answer to an overwrite prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwriteChoice {
    /// Overwrite this file.
    Yes,
    /// Keep the existing file.
    No,
    /// Overwrite this file and every later one without asking.
    All,
    /// Abort the run.
    Quit,
}

impl OverwriteChoice {
    /// Parse an operator answer (`y`, `no`, `A`, `quit`, ...).
    pub fn parse(answer: &str) -> Option<Self> {
        match answer.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => Some(Self::Yes),
            "n" | "no" => Some(Self::No),
            "a" | "all" => Some(Self::All),
            "q" | "quit" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Source of overwrite decisions.
pub trait OverwritePrompt {
    fn ask(&mut self, path: &Path) -> Result<OverwriteChoice>;
}

/// Asks the operator on stdin, repeating until the answer is understood.
#[derive(Debug, Default)]
pub struct StdinPrompt;

impl OverwritePrompt for StdinPrompt {
    fn ask(&mut self, path: &Path) -> Result<OverwriteChoice> {
        let stdin = io::stdin();
        loop {
            print!("File exists: {} . Overwrite? [Yes/No/All/Quit]: ", path.display());
            io::stdout().flush().map_err(|e| Error::io(path, e))?;

            let mut answer = String::new();
            let read = stdin
                .lock()
                .read_line(&mut answer)
                .map_err(|e| Error::io(path, e))?;
            // stdin closed: nobody can ever answer
            if read == 0 {
                return Ok(OverwriteChoice::Quit);
            }
            if let Some(choice) = OverwriteChoice::parse(&answer) {
                return Ok(choice);
            }
        }
    }
}

/// Replays a fixed list of answers; answers `Quit` once exhausted.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<OverwriteChoice>,
}

impl ScriptedPrompt {
    pub fn new(answers: impl IntoIterator<Item = OverwriteChoice>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
        }
    }
}

impl OverwritePrompt for ScriptedPrompt {
    fn ask(&mut self, _path: &Path) -> Result<OverwriteChoice> {
        Ok(self.answers.pop_front().unwrap_or(OverwriteChoice::Quit))
    }
}

/// State shared by every stage of one run.
pub struct Session {
    verbose: bool,
    overwrite_all: Cell<bool>,
    prompt: RefCell<Box<dyn OverwritePrompt>>,
    prompts_shown: Cell<usize>,
}

impl Session {
    /// Session prompting on stdin.
    pub fn new(verbose: bool) -> Self {
        Self::with_prompt(verbose, StdinPrompt)
    }

    pub fn with_prompt(verbose: bool, prompt: impl OverwritePrompt + 'static) -> Self {
        Self {
            verbose,
            overwrite_all: Cell::new(false),
            prompt: RefCell::new(Box::new(prompt)),
            prompts_shown: Cell::new(0),
        }
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Overwrite every existing file for the rest of the run.
    pub fn force_overwrite(&self) {
        log!("build"; "overwrite all files");
        self.overwrite_all.set(true);
    }

    pub fn overwrites_all(&self) -> bool {
        self.overwrite_all.get()
    }

    /// How many times the operator has been asked so far.
    pub fn prompts_shown(&self) -> usize {
        self.prompts_shown.get()
    }

    /// Decide whether the existing file at `path` may be replaced.
    ///
    /// `Ok(false)` means "skip this file"; quitting is an error.
    pub fn may_overwrite(&self, path: &Path) -> Result<bool> {
        if self.overwrite_all.get() {
            return Ok(true);
        }

        self.prompts_shown.set(self.prompts_shown.get() + 1);
        match self.prompt.borrow_mut().ask(path)? {
            OverwriteChoice::Yes => Ok(true),
            OverwriteChoice::No => Ok(false),
            OverwriteChoice::All => {
                self.overwrite_all.set(true);
                Ok(true)
            }
            OverwriteChoice::Quit => Err(Error::QuitRequested),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("verbose", &self.verbose)
            .field("overwrite_all", &self.overwrite_all.get())
            .finish_non_exhaustive()
    }
}
