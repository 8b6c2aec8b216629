use clap::{Parser, Subcommand};
use miette::Result;
use postwriter_common::config::{Config, FileStore};
use postwriter_common::telemetry::{self, TelemetryConfig};
use postwriter_common::JsonFileStore;
use postwriter_editor_core::text_helpers::alt_from;
use postwriter_editor_core::{
    BinaryAsset, Dispatched, DraftField, Editor, EditorAction, FormatKind, PersistencePolicy,
    Range,
};
use postwriter_publish::{
    Credentials, GitHubClient, HttpFetcher, PostwriterError, PublishError, PublishOptions,
    PublishPipeline, ScaffoldLoader, ScaffoldLocation, TOKEN_ENV, export_archive, fetch_featured,
    fetch_inline, load_optional_scaffold,
};
use std::path::{Path, PathBuf};
use web_time::{Duration, Instant};

mod session;

#[derive(Parser)]
#[command(version, about = "postwriter - compose, preview, export and publish markdown posts", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to config file (.toml or .json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the draft store file
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current draft
    Show,
    /// Set a text field (title, youtube, date, profile, body, featured-url)
    Set { field: DraftField, value: String },
    /// Replace or extend the markdown body; prints it when no input is given
    Body {
        /// New body text
        text: Option<String>,

        /// Read the new body from a file
        #[arg(long, conflicts_with_all = ["text", "append"])]
        file: Option<PathBuf>,

        /// Append a line to the body
        #[arg(long, conflicts_with = "text")]
        append: Option<String>,
    },
    /// Set the featured image from a file or URL
    Featured {
        source: Option<String>,

        /// Remove the featured image
        #[arg(long, conflicts_with = "source")]
        clear: bool,
    },
    /// Manage inline images
    Image {
        #[command(subcommand)]
        command: ImageCommand,
    },
    /// Apply a formatting tool (bold, italic, code, link, heading) to a body range
    Format {
        kind: FormatKind,

        /// Start offset in characters
        #[arg(long)]
        from: usize,

        /// End offset in characters, defaults to `--from`
        #[arg(long)]
        to: Option<usize>,
    },
    /// Render the preview HTML
    Preview {
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Export the post as a zip archive
    Export {
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Publish the post to a GitHub repository
    Publish {
        #[arg(long, env = TOKEN_ENV, hide_env_values = true)]
        token: Option<String>,

        /// Repository owner, defaults to the saved owner
        #[arg(long)]
        owner: Option<String>,

        /// Repository name, defaults to the saved repository
        #[arg(long)]
        repo: Option<String>,

        /// Commit message, defaults to "New blog post: <title>"
        #[arg(long)]
        message: Option<String>,

        /// Save owner and repository to the config file
        #[arg(long)]
        remember: bool,
    },
    /// Discard the draft and every stored image
    Clear,
    /// Interactive editing; body lines re-render the preview after a pause
    Session {
        /// Write each preview render to this file
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ImageCommand {
    /// Insert an image from a file or URL at the end of the body or at `--at`
    Add {
        source: String,

        /// Character offset to insert at
        #[arg(long)]
        at: Option<usize>,

        /// Alt text, derived from the file name by default
        #[arg(long)]
        alt: Option<String>,
    },
    /// Remove an image and every reference to it
    Remove { name: String },
    /// List inline images
    List,
}

/// Loaded config, editor and shared HTTP client for one invocation.
pub(crate) struct App {
    config: Config,
    config_store: FileStore,
    editor: Editor<JsonFileStore>,
    http: reqwest::Client,
}

impl App {
    fn open(cli: &Cli) -> Result<Self, PostwriterError> {
        let config_store = cli.config.as_ref().map(FileStore::new).unwrap_or_default();
        let mut config = Config::load(&config_store)?;
        if let Some(store) = &cli.store {
            config.store_path = Some(store.clone());
        }

        let store = JsonFileStore::open(config.resolved_store_path())?;
        let editor = Editor::open(
            store,
            PersistencePolicy::new(config.max_asset_bytes),
            Duration::from_millis(config.debounce_ms()),
        )?;

        Ok(Self {
            config,
            config_store,
            editor,
            http: reqwest::Client::new(),
        })
    }

    /// Dispatch an action and report its warnings.
    pub(crate) fn dispatch(&mut self, action: EditorAction) -> Dispatched {
        let dispatched = self.editor.dispatch(action, Instant::now());
        for warning in &dispatched.warnings {
            eprintln!("{:?}", miette::Report::new(warning.clone()));
        }
        dispatched
    }

    /// Read an image from a path or fetch it from a URL.
    ///
    /// Returns the asset and, for URLs, the source URL.
    async fn load_image(
        &self,
        source: &str,
        featured: bool,
    ) -> Result<(BinaryAsset, Option<String>), PostwriterError> {
        if is_url(source) {
            let fetcher = HttpFetcher::new(self.http.clone());
            let asset = if featured {
                fetch_featured(&fetcher, source).await?
            } else {
                fetch_inline(&fetcher, source).await?
            };
            return Ok((asset, Some(source.to_owned())));
        }
        let path = Path::new(source);
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| io_error(path, e))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        Ok((BinaryAsset::from_file(name, bytes), None))
    }

    fn scaffold(&self) -> ScaffoldLoader {
        ScaffoldLoader::new(ScaffoldLocation::parse(&self.config.scaffold), self.http.clone())
    }
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

fn io_error(path: &Path, source: std::io::Error) -> PostwriterError {
    PostwriterError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_miette();

    let cli = Cli::parse();
    telemetry::init(TelemetryConfig::from_env("postwriter").verbose(cli.verbose));

    run(cli).await?;
    Ok(())
}

async fn run(cli: Cli) -> Result<(), PostwriterError> {
    let mut app = App::open(&cli)?;

    match cli.command {
        Commands::Show => show(&app),
        Commands::Set { field, value } => {
            app.dispatch(EditorAction::SetField { field, value });
            println!("✓ {field} updated");
        }
        Commands::Body { text, file, append } => {
            let value = match (text, file, append) {
                (Some(text), _, _) => Some(text),
                (_, Some(path), _) => Some(
                    tokio::fs::read_to_string(&path)
                        .await
                        .map_err(|e| io_error(&path, e))?,
                ),
                (_, _, Some(line)) => {
                    let mut body = app.editor.draft().markdown_body.clone();
                    if !body.is_empty() && !body.ends_with('\n') {
                        body.push('\n');
                    }
                    body.push_str(&line);
                    Some(body)
                }
                _ => None,
            };
            match value {
                Some(value) => {
                    app.dispatch(EditorAction::SetField {
                        field: DraftField::MarkdownBody,
                        value,
                    });
                    println!("✓ body updated");
                }
                None => print!("{}", app.editor.draft().markdown_body),
            }
        }
        Commands::Featured { source, clear } => match source {
            _ if clear => {
                app.dispatch(EditorAction::ClearFeatured);
                println!("✓ featured image cleared");
            }
            Some(source) => {
                let (asset, source_url) = app.load_image(&source, true).await?;
                let name = asset.name().to_owned();
                app.dispatch(EditorAction::SetFeatured { asset, source_url });
                println!("✓ featured image set: {name}");
            }
            None => match app.editor.assets().featured() {
                Some(asset) => println!("{} ({}, {} bytes)", asset.name(), asset.mime_type(), asset.len()),
                None => println!("no featured image"),
            },
        },
        Commands::Image { command } => image(&mut app, command).await?,
        Commands::Format { kind, from, to } => {
            let range = Range::new(from, to.unwrap_or(from));
            app.dispatch(EditorAction::Format { kind, range });
            println!("✓ applied {kind}");
        }
        Commands::Preview { out } => {
            let html = app.editor.render_preview();
            session::write_preview(out.as_deref(), &html).await?;
        }
        Commands::Export { out_dir } => export(&app, &out_dir).await?,
        Commands::Publish {
            token,
            owner,
            repo,
            message,
            remember,
        } => {
            let credentials = Credentials {
                token: token.unwrap_or_default(),
                owner: owner.or_else(|| app.config.owner.clone()).unwrap_or_default(),
                repo: repo.or_else(|| app.config.repo.clone()).unwrap_or_default(),
                message: message.unwrap_or_default(),
            };
            publish(&mut app, credentials, remember).await?;
        }
        Commands::Clear => {
            app.dispatch(EditorAction::ClearAll);
            println!("✓ draft and images cleared");
        }
        Commands::Session { out } => session::run(&mut app, out).await?,
    }

    Ok(())
}

fn show(app: &App) {
    let draft = app.editor.draft();
    for field in DraftField::ALL {
        if field != DraftField::MarkdownBody {
            println!("{:>12}: {}", field, draft.field(field));
        }
    }
    match app.editor.assets().featured() {
        Some(asset) => println!("{:>12}: {} ({} bytes)", "featured", asset.name(), asset.len()),
        None => println!("{:>12}: -", "featured"),
    }
    for asset in app.editor.assets().inline() {
        println!("{:>12}: {} ({} bytes)", "image", asset.name(), asset.len());
    }
    println!();
    println!("{}", draft.markdown_body);
}

async fn image(app: &mut App, command: ImageCommand) -> Result<(), PostwriterError> {
    match command {
        ImageCommand::Add { source, at, alt } => {
            let (asset, _) = app.load_image(&source, false).await?;
            let alt = alt.unwrap_or_else(|| alt_from(&source));
            if let Some(at) = at {
                app.dispatch(EditorAction::SetSelection(Range::caret(at)));
            }
            let name = asset.name().to_owned();
            app.dispatch(EditorAction::InsertInlineImage { asset, alt });
            println!("✓ inserted ![..]({name})");
        }
        ImageCommand::Remove { name } => {
            app.dispatch(EditorAction::RemoveInlineImage { name: name.as_str().into() });
            println!("✓ removed {name}");
        }
        ImageCommand::List => {
            for asset in app.editor.assets().inline() {
                println!("{} ({}, {} bytes)", asset.name(), asset.mime_type(), asset.len());
            }
        }
    }
    Ok(())
}

async fn export(app: &App, out_dir: &Path) -> Result<(), PostwriterError> {
    println!("→ Building archive...");
    let scaffold = load_optional_scaffold(&app.scaffold()).await;
    if scaffold.is_none() {
        println!("⚠ Scaffold page not found, exporting without index.html");
    }
    let archive = export_archive(
        app.editor.draft(),
        app.editor.registry(),
        scaffold.as_deref(),
    )?;

    tokio::fs::create_dir_all(out_dir)
        .await
        .map_err(|e| io_error(out_dir, e))?;
    let path = out_dir.join(&archive.file_name);
    tokio::fs::write(&path, &archive.bytes)
        .await
        .map_err(|e| io_error(&path, e))?;
    println!("✓ Exported {}", path.display());
    Ok(())
}

async fn publish(
    app: &mut App,
    credentials: Credentials,
    remember: bool,
) -> Result<(), PostwriterError> {
    if !credentials.is_ready() {
        return Err(PublishError::NotReady.into());
    }
    if remember {
        app.config.owner = Some(credentials.owner.trim().to_owned());
        app.config.repo = Some(credentials.repo.trim().to_owned());
        app.config.save(&app.config_store)?;
        tracing::debug!(path = %app.config_store.path().display(), "saved repository to config");
    }

    app.editor.begin_publish()?;
    println!(
        "→ Publishing to {}/{} ({})...",
        credentials.owner.trim(),
        credentials.repo.trim(),
        app.config.branch
    );

    let api = GitHubClient::new(app.http.clone(), &app.config.api_base, &credentials);
    let mut pipeline = PublishPipeline::new(api, app.scaffold(), PublishOptions::from(&app.config));
    let result = pipeline
        .publish(&credentials, app.editor.draft(), app.editor.registry())
        .await;
    app.editor.finish_publish(result.is_ok())?;

    let receipt = result?;
    println!("✓ Published {}", receipt.slug);
    println!("✓ {}", receipt.url);
    Ok(())
}

fn init_miette() {
    let installed = miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }));
    if installed.is_err() {
        eprintln!("error reporter already installed");
    }
    miette::set_panic_hook();
}
