//! `lore ask`: answer questions about a codebase from its knowledge document.

use anyhow::{Context, Result};
use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use super::common::{build_reasoner, install_interrupt_handler, load_config, open_store, SourceSpec};
use crate::agent::{Answer, QaSession, RetrievalAgent};
use crate::cancel::CancelToken;
use crate::document::KnowledgeDocument;
use crate::reasoning::Reasoner;
use crate::store::FileStore;

const EXIT_WORDS: &[&str] = &["exit", "quit", "q"];

#[derive(Debug, Clone)]
pub struct AskArgs {
    pub knowledge: PathBuf,
    pub source: SourceSpec,
    pub question: Option<String>,
    pub max_rounds: Option<usize>,
}

pub fn execute(args: AskArgs, config_path: Option<&Path>) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(rounds) = args.max_rounds {
        config.agent.max_rounds = rounds;
    }

    let document = KnowledgeDocument::load(&args.knowledge).with_context(|| {
        format!(
            "Failed to load knowledge document {} (run 'lore build' first)",
            args.knowledge.display()
        )
    })?;
    let store = open_store(&args.source, &config)?;
    warn_if_stale(&document, store.as_ref());

    let reasoner = build_reasoner(&config)?;
    let cancel = CancelToken::new();
    install_interrupt_handler(&cancel)?;

    let agent = RetrievalAgent::new(&reasoner, store.as_ref(), &document, config.agent.clone())
        .with_cancel(cancel.clone());
    let mut session = QaSession::new(agent);

    match args.question {
        Some(question) => {
            let answer = session
                .ask(&question)
                .context("Could not answer the question")?;
            print_answer(&mut io::stdout(), &answer)?;
            Ok(())
        }
        None => {
            eprintln!(
                "{} Loaded '{}' ({} chapters). Ask a question, or type exit, quit or q to leave.",
                "✓".green().bold(),
                document.project,
                document.chapters.len()
            );
            let stdin = io::stdin();
            run_repl(&mut session, &cancel, stdin.lock(), &mut io::stdout())
        }
    }
}

/// Compare the document's snapshot fingerprint with the opened store.
pub fn warn_if_stale<S: FileStore + ?Sized>(document: &KnowledgeDocument, store: &S) -> bool {
    let current = store.fingerprint();
    if current == document.fingerprint {
        return false;
    }
    eprintln!(
        "{} The source files changed since the knowledge document was built; answers may be out of date",
        "!".yellow().bold()
    );
    true
}

/// Read questions line by line until EOF or an exit word. Errors are
/// reported per question and never end the loop.
pub fn run_repl<R, S, I, W>(
    session: &mut QaSession<'_, R, S>,
    cancel: &CancelToken,
    input: I,
    output: &mut W,
) -> Result<()>
where
    R: Reasoner + ?Sized,
    S: FileStore + ?Sized,
    I: BufRead,
    W: Write,
{
    write!(output, "\n{} ", "?".cyan().bold())?;
    output.flush()?;

    for line in input.lines() {
        let line = line?;
        let question = line.trim();
        if EXIT_WORDS.contains(&question.to_lowercase().as_str()) {
            break;
        }
        if !question.is_empty() {
            cancel.reset();
            match session.ask(question) {
                Ok(answer) => print_answer(output, &answer)?,
                Err(e) => writeln!(output, "{} {e}", "✗".red().bold())?,
            }
        }
        write!(output, "\n{} ", "?".cyan().bold())?;
        output.flush()?;
    }
    writeln!(output)?;
    Ok(())
}

pub fn print_answer<W: Write>(output: &mut W, answer: &Answer) -> io::Result<()> {
    writeln!(output, "\n{}", answer.text.trim())?;
    if !answer.consulted_files.is_empty() {
        writeln!(
            output,
            "\n{} {}",
            "Files consulted:".dimmed(),
            answer.consulted_files.join(", ")
        )?;
    }
    if let Some(caveat) = answer.caveat() {
        writeln!(output, "{} {caveat}", "!".yellow().bold())?;
    }
    Ok(())
}
