//! Script commands.
//!
//! One command per line, words separated by whitespace. Blank lines and
//! lines starting with `#` are skipped. Text arguments take the rest of the
//! line.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use polyhedron_store::{BlockId, BlockMove, EditorSession, ProjectId};

/// A single parsed script line.
#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_help_flag = true)]
struct ScriptLine {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Create an empty block (optionally appended to a project)
    AddBlock {
        #[arg(long)]
        to: Option<String>,
    },
    /// Remove a block, leaving project references alone
    RemoveBlock { id: String },
    /// Remove a block and every reference to it
    DeleteBlock { id: String },
    /// Set a block's title, desc, or body
    SetBlock {
        id: String,
        field: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// Create an empty project and make it active
    AddProject,
    RemoveProject { id: String },
    /// Set a project attribute by dotted path (meta.title, meta.desc)
    SetProject {
        id: String,
        path: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// Insert a block id into a project (default: at the end)
    Link {
        project: String,
        block: String,
        #[arg(long)]
        at: Option<usize>,
    },
    Unlink { project: String, block: String },
    /// Move the block at FROM to TO within a project
    Move {
        project: String,
        from: usize,
        to: usize,
    },
    /// Set (or with no argument, clear) the active project
    Activate { project: Option<String> },
    /// Print the session state as JSON
    Show,
}

/// Parse one line; `Ok(None)` for blanks and comments.
pub fn parse_line(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let mut command = ScriptLine::try_parse_from(line.split_whitespace())?.command;
    // Text keeps its original spacing: command, id and field/path come first.
    if let Command::SetBlock { text, .. } | Command::SetProject { text, .. } = &mut command {
        *text = vec![rest_after(line, 3).to_string()];
    }
    Ok(Some(command))
}

/// The raw text after the first `words` whitespace-separated words.
fn rest_after(line: &str, words: usize) -> &str {
    let mut rest = line.trim_start();
    for _ in 0..words {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        rest = rest[end..].trim_start();
    }
    rest
}

/// Run one command, returning what it prints.
pub async fn execute(session: &EditorSession, command: Command) -> Result<Option<String>> {
    let blocks = session.blocks();
    let projects = session.projects();

    let output = match command {
        Command::AddBlock { to: None } => Some(blocks.add_block().await?.to_string()),
        Command::AddBlock { to: Some(project) } => Some(
            session
                .add_block_to_project(&ProjectId::new(project))
                .await?
                .to_string(),
        ),
        Command::RemoveBlock { id } => {
            blocks.remove_block(&BlockId::new(id)).await?;
            None
        }
        Command::DeleteBlock { id } => {
            session.delete_block(&BlockId::new(id)).await?;
            None
        }
        Command::SetBlock { id, field, text } => {
            blocks
                .update_block_field_by_name(&BlockId::new(id), &field, &text.join(" "))
                .await?;
            None
        }
        Command::AddProject => Some(projects.add_project().await?.to_string()),
        Command::RemoveProject { id } => {
            projects.remove_project(&ProjectId::new(id)).await?;
            None
        }
        Command::SetProject { id, path, text } => {
            projects
                .update_project_field_by_path(&ProjectId::new(id), &path, &text.join(" "))
                .await?;
            None
        }
        Command::Link { project, block, at } => {
            let project = ProjectId::new(project);
            let block_id = BlockId::new(block);
            match at {
                Some(to_index) => {
                    session
                        .apply_move(&project, BlockMove::FromLibrary { block_id, to_index })
                        .await?
                }
                None => projects.add_block_id_to_project(&project, block_id, None).await?,
            }
            None
        }
        Command::Unlink { project, block } => {
            projects
                .remove_block_id_from_project(&ProjectId::new(project), &BlockId::new(block))
                .await?;
            None
        }
        Command::Move { project, from, to } => {
            session
                .apply_move(
                    &ProjectId::new(project),
                    BlockMove::WithinProject {
                        from_index: from,
                        to_index: to,
                    },
                )
                .await?;
            None
        }
        Command::Activate { project } => {
            projects
                .assign_active_project_id(project.map(ProjectId::new))
                .await?;
            None
        }
        Command::Show => Some(
            serde_json::to_string_pretty(&session.state()).context("failed to encode state")?,
        ),
    };
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_line("  ").unwrap(), None);
        assert_eq!(parse_line("# note").unwrap(), None);
        assert_eq!(parse_line("add-project").unwrap(), Some(Command::AddProject));
        assert_eq!(
            parse_line("set-block b1 title Hello   there world").unwrap(),
            Some(Command::SetBlock {
                id: "b1".into(),
                field: "title".into(),
                text: vec!["Hello   there world".into()],
            })
        );
        assert_eq!(
            parse_line("set-project p\tmeta.desc  two\tspaced  words").unwrap(),
            Some(Command::SetProject {
                id: "p".into(),
                path: "meta.desc".into(),
                text: vec!["two\tspaced  words".into()],
            })
        );
        assert_eq!(
            parse_line("link p b --at 2").unwrap(),
            Some(Command::Link {
                project: "p".into(),
                block: "b".into(),
                at: Some(2),
            })
        );
        assert_eq!(
            parse_line("activate").unwrap(),
            Some(Command::Activate { project: None })
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_line("frobnicate").is_err());
        assert!(parse_line("move p one two").is_err());
        assert!(parse_line("remove-block").is_err());
    }

    #[tokio::test]
    async fn test_execute_script() {
        let session = EditorSession::local();
        let project = execute(&session, Command::AddProject).await.unwrap().unwrap();
        let block = execute(&session, parse_line(&format!("add-block --to {project}")).unwrap().unwrap())
            .await
            .unwrap()
            .unwrap();

        let command = parse_line(&format!("set-block {block} body some text")).unwrap().unwrap();
        assert_eq!(execute(&session, command).await.unwrap(), None);
        let command = parse_line(&format!("set-project {project} meta.title Draft")).unwrap().unwrap();
        execute(&session, command).await.unwrap();

        let shown = execute(&session, Command::Show).await.unwrap().unwrap();
        let state: serde_json::Value = serde_json::from_str(&shown).unwrap();
        assert_eq!(state["blocks"][0]["body"], "some text");
        assert_eq!(state["projects"][0]["meta"]["title"], "Draft");
        assert_eq!(state["projects"][0]["blockIds"][0], block.as_str());
        assert_eq!(state["active_project"], project.as_str());
    }

    #[tokio::test]
    async fn test_failing_command_reports_error() {
        let session = EditorSession::local();
        let err = execute(&session, parse_line("move ghost 0 1").unwrap().unwrap())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("project not found"));
    }
}
