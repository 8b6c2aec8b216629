//! Interactive line-mode editing.
//!
//! Plain lines are appended to the body and re-render the preview once typing
//! pauses. Lines starting with `:` are commands.

use postwriter_editor_core::{DraftField, EditorAction, FormatKind, Range, RenderRequest};
use postwriter_publish::PostwriterError;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use web_time::Instant;

use crate::App;

const HELP: &str = "\
:set <field> <value>        set a text field
:fmt <kind> <from> [<to>]   bold, italic, code, link or heading over a range
:preview                    render now
:show                       print the draft
:quit                       leave the session
anything else               appended to the body";

/// One parsed input line.
#[derive(Debug, PartialEq)]
enum SessionInput {
    Append(String),
    Action(EditorAction),
    Preview,
    Show,
    Help,
    Quit,
    Invalid(String),
}

fn parse_line(line: &str) -> SessionInput {
    let Some(command) = line.strip_prefix(':') else {
        return SessionInput::Append(line.to_owned());
    };
    let mut words = command.splitn(2, ' ');
    let name = words.next().unwrap_or_default();
    let rest = words.next().unwrap_or_default().trim();
    match name {
        "q" | "quit" => SessionInput::Quit,
        "preview" => SessionInput::Preview,
        "show" => SessionInput::Show,
        "help" | "h" => SessionInput::Help,
        "set" => {
            let (field, value) = rest.split_once(' ').unwrap_or((rest, ""));
            match field.parse::<DraftField>() {
                Ok(field) => SessionInput::Action(EditorAction::SetField {
                    field,
                    value: value.to_owned(),
                }),
                Err(e) => SessionInput::Invalid(e.to_string()),
            }
        }
        "fmt" => parse_format(rest),
        other => SessionInput::Invalid(format!("unknown command :{other}")),
    }
}

fn parse_format(args: &str) -> SessionInput {
    let mut parts = args.split_whitespace();
    let kind = match parts.next().map(str::parse::<FormatKind>) {
        Some(Ok(kind)) => kind,
        Some(Err(e)) => return SessionInput::Invalid(e),
        None => return SessionInput::Invalid("usage: :fmt <kind> <from> [<to>]".into()),
    };
    let offsets: Result<Vec<usize>, _> = parts.map(str::parse).collect();
    match offsets.as_deref() {
        Ok([from]) => SessionInput::Action(EditorAction::Format {
            kind,
            range: Range::caret(*from),
        }),
        Ok([from, to]) => SessionInput::Action(EditorAction::Format {
            kind,
            range: Range::new(*from, *to),
        }),
        _ => SessionInput::Invalid("usage: :fmt <kind> <from> [<to>]".into()),
    }
}

/// Write preview HTML to `out`, or stdout when `None`.
pub(crate) async fn write_preview(out: Option<&Path>, html: &str) -> Result<(), PostwriterError> {
    match out {
        Some(path) => {
            tokio::fs::write(path, html)
                .await
                .map_err(|source| PostwriterError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
            tracing::debug!(path = %path.display(), size = html.len(), "preview written");
        }
        None => println!("{html}"),
    }
    Ok(())
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => {
            tokio::time::sleep(deadline.saturating_duration_since(Instant::now())).await
        }
        None => std::future::pending().await,
    }
}

pub(crate) async fn run(app: &mut App, out: Option<PathBuf>) -> Result<(), PostwriterError> {
    println!("→ Editing \"{}\". :help lists commands.", app.editor.draft().title);
    let out = out.as_deref();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let deadline = app.editor.render_deadline();
        tokio::select! {
            line = lines.next_line() => {
                let line = line.map_err(|source| PostwriterError::Io {
                    path: PathBuf::from("<stdin>"),
                    source,
                })?;
                let Some(line) = line else { break };

                let action = match parse_line(&line) {
                    SessionInput::Quit => break,
                    SessionInput::Append(text) => {
                        let mut body = app.editor.draft().markdown_body.clone();
                        body.push_str(&text);
                        body.push('\n');
                        EditorAction::SetField {
                            field: DraftField::MarkdownBody,
                            value: body,
                        }
                    }
                    SessionInput::Action(action) => action,
                    SessionInput::Preview => {
                        write_preview(out, &app.editor.render_preview()).await?;
                        continue;
                    }
                    SessionInput::Show => {
                        crate::show(app);
                        continue;
                    }
                    SessionInput::Help => {
                        println!("{HELP}");
                        continue;
                    }
                    SessionInput::Invalid(message) => {
                        eprintln!("⚠ {message}");
                        continue;
                    }
                };

                if app.dispatch(action).render == RenderRequest::Now {
                    write_preview(out, &app.editor.render_preview()).await?;
                }
            }
            _ = sleep_until(deadline) => {
                if let Some(html) = app.editor.poll_render(Instant::now()) {
                    write_preview(out, &html).await?;
                }
            }
        }
    }

    if app.editor.render_deadline().is_some() {
        write_preview(out, &app.editor.render_preview()).await?;
    }
    println!("✓ Draft saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lines_append() {
        assert_eq!(parse_line("hello"), SessionInput::Append("hello".into()));
        assert_eq!(parse_line(""), SessionInput::Append(String::new()));
    }

    #[test]
    fn commands_parse() {
        assert_eq!(parse_line(":q"), SessionInput::Quit);
        assert_eq!(parse_line(":preview"), SessionInput::Preview);
        assert_eq!(
            parse_line(":set title My Post"),
            SessionInput::Action(EditorAction::SetField {
                field: DraftField::Title,
                value: "My Post".into(),
            })
        );
        assert_eq!(
            parse_line(":fmt bold 2 5"),
            SessionInput::Action(EditorAction::Format {
                kind: FormatKind::Bold,
                range: Range::new(2, 5),
            })
        );
        assert_eq!(
            parse_line(":fmt heading 0"),
            SessionInput::Action(EditorAction::Format {
                kind: FormatKind::Heading,
                range: Range::caret(0),
            })
        );
    }

    #[test]
    fn bad_commands_are_reported() {
        assert!(matches!(parse_line(":nope"), SessionInput::Invalid(_)));
        assert!(matches!(parse_line(":set color red"), SessionInput::Invalid(_)));
        assert!(matches!(parse_line(":fmt bold x"), SessionInput::Invalid(_)));
        assert!(matches!(parse_line(":fmt"), SessionInput::Invalid(_)));
    }
}
