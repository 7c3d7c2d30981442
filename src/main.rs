use std::io::BufRead;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use forum_client::config::{Config, ConfigArgs};
use forum_client::models::{Comment, CommentId, Post, PostId};
use forum_client::views::{AuthMode, Notice, PostEditor};
use forum_client::{ClientResult, Forum, ResourceKey, Screen};

#[derive(Parser, Debug)]
#[command(name = "forum", about = "Command-line client for a minimal Reddit-like forum")]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and store the returned token
    Login(CredentialArgs),
    /// Create an account and store the returned token
    Register(CredentialArgs),
    /// Forget the stored token
    Logout,
    /// Show whether a token is stored
    Status,
    /// List posts
    Posts,
    /// Create, edit or delete a post
    Post {
        #[command(subcommand)]
        action: PostAction,
    },
    /// Upvote a post
    Upvote { id: String },
    /// Downvote a post
    Downvote { id: String },
    /// List comments on a post
    Comments { post_id: String },
    /// Add or delete a comment
    Comment {
        #[command(subcommand)]
        action: CommentAction,
    },
    /// Run the development proxy
    Proxy {
        /// Address to listen on
        #[arg(long)]
        listen: Option<String>,
        /// Remote deployment to forward to
        #[arg(long)]
        target: Option<String>,
    },
}

#[derive(Args, Debug)]
struct CredentialArgs {
    #[arg(short, long)]
    username: String,

    /// Password; prefer FORUM_PASSWORD or --password-stdin to keep it out of ps
    #[arg(
        short,
        long,
        env = "FORUM_PASSWORD",
        hide_env_values = true,
        required_unless_present = "password_stdin"
    )]
    password: Option<String>,

    /// Read the password from the first line of stdin
    #[arg(long)]
    password_stdin: bool,
}

impl CredentialArgs {
    fn password(&self) -> anyhow::Result<String> {
        if self.password_stdin {
            return read_password(std::io::stdin().lock());
        }
        self.password
            .clone()
            .ok_or_else(|| anyhow::anyhow!("A password is required"))
    }
}

fn read_password(mut input: impl BufRead) -> anyhow::Result<String> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

#[derive(Subcommand, Debug)]
enum PostAction {
    Create {
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        body: String,
    },
    /// Edit a post; omitted fields keep their current value
    Edit {
        id: String,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        body: Option<String>,
    },
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum CommentAction {
    Add {
        post_id: String,
        #[arg(short, long)]
        body: String,
    },
    Delete { post_id: String, comment_id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Quiet by default so command output stays readable; the proxy logs requests
    let default_level = match cli.command {
        Command::Proxy { .. } => "info",
        _ => "warn",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut config = Config::load(&cli.config)?;

    if let Command::Proxy { listen, target } = cli.command {
        if let Some(listen) = listen {
            config.proxy.listen = listen;
        }
        if let Some(target) = target {
            config.proxy.target = target;
        }
        forum_client::proxy::serve(&config.proxy).await?;
        return Ok(ExitCode::SUCCESS);
    }

    let mut forum = Forum::open(&config)?;
    run(&mut forum, cli.command).await
}

async fn run(forum: &mut Forum, command: Command) -> anyhow::Result<ExitCode> {
    match command {
        Command::Login(credentials) => authenticate(forum, AuthMode::Login, credentials).await,
        Command::Register(credentials) => {
            authenticate(forum, AuthMode::Register, credentials).await
        }
        Command::Logout => {
            forum.sign_out()?;
            println!("Signed out.");
            Ok(ExitCode::SUCCESS)
        }
        Command::Status => {
            match forum.screen() {
                Screen::Posts => println!("Logged in."),
                Screen::Auth => println!("Not logged in."),
            }
            Ok(ExitCode::SUCCESS)
        }
        command => {
            if forum.screen() == Screen::Auth {
                eprintln!("Not logged in. Run `forum login` first.");
                return Ok(ExitCode::FAILURE);
            }
            run_signed_in(forum, command).await
        }
    }
}

async fn run_signed_in(forum: &mut Forum, command: Command) -> anyhow::Result<ExitCode> {
    match command {
        Command::Posts => {
            let posts = load_posts(forum).await?;
            if posts.is_empty() {
                println!("No posts yet.");
            }
            for post in &posts {
                print_post(post);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Post { action } => {
            let mut editor = forum.post_editor();
            let result = match action {
                PostAction::Create { title, body } => {
                    editor.set_title(title);
                    editor.set_body(body);
                    editor.submit().await
                }
                PostAction::Edit { id, title, body } => {
                    let id = PostId::new(id);
                    let Some(post) = load_posts(forum).await?.into_iter().find(|p| p.id == id)
                    else {
                        eprintln!("Error: Post not found");
                        return Ok(ExitCode::FAILURE);
                    };
                    editor.start_edit(&post);
                    if let Some(title) = title {
                        editor.set_title(title);
                    }
                    if let Some(body) = body {
                        editor.set_body(body);
                    }
                    editor.submit().await
                }
                PostAction::Delete { id } => editor.delete_post(&PostId::new(id)).await,
            };
            Ok(finish(result, editor.notice()))
        }
        Command::Upvote { id } => {
            vote(forum.post_editor(), PostId::new(id), true).await;
            Ok(ExitCode::SUCCESS)
        }
        Command::Downvote { id } => {
            vote(forum.post_editor(), PostId::new(id), false).await;
            Ok(ExitCode::SUCCESS)
        }
        Command::Comments { post_id } => {
            let editor = forum.comment_editor(PostId::new(post_id));
            let mut comments = editor.comments();
            let entry = comments.settled().await;
            if let Some(error) = &entry.error {
                eprintln!("Failed to load comments: {}", error);
                return Ok(ExitCode::FAILURE);
            }
            let comments: Vec<Comment> = entry.data()?.unwrap_or_default();
            if comments.is_empty() {
                println!("No comments yet.");
            }
            for comment in &comments {
                println!("[{}] {}  (by {})", comment.id, comment.body, comment.author_username());
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Comment { action } => {
            let (editor, result) = match action {
                CommentAction::Add { post_id, body } => {
                    let mut editor = forum.comment_editor(PostId::new(post_id));
                    editor.set_body(body);
                    let result = editor.submit().await;
                    (editor, result)
                }
                CommentAction::Delete {
                    post_id,
                    comment_id,
                } => {
                    let mut editor = forum.comment_editor(PostId::new(post_id));
                    let result = editor.delete_comment(&CommentId::new(comment_id)).await;
                    (editor, result)
                }
            };
            let code = finish(result, editor.notice());
            // Let the refetch land so the new list is printed
            let entry = editor.comments().settled().await;
            if let Ok(Some(comments)) = entry.data::<Vec<Comment>>() {
                println!("{} comment(s) on post {}", comments.len(), editor.post_id());
            }
            Ok(code)
        }
        Command::Login(_)
        | Command::Register(_)
        | Command::Logout
        | Command::Status
        | Command::Proxy { .. } => Ok(ExitCode::SUCCESS),
    }
}

async fn authenticate(
    forum: &mut Forum,
    mode: AuthMode,
    credentials: CredentialArgs,
) -> anyhow::Result<ExitCode> {
    let password = credentials.password()?;
    let mut form = forum.auth_form();
    if form.mode() != mode {
        form.toggle_mode();
    }
    form.username = credentials.username;
    form.password = password;
    let result = forum.submit_auth(&mut form).await;
    Ok(finish(result, form.notice()))
}

async fn vote(editor: PostEditor, id: PostId, up: bool) {
    if up {
        editor.upvote(&id).await;
    } else {
        editor.downvote(&id).await;
    }
    // Failures are silent; show whatever the list now says
    let entry = editor.posts().settled().await;
    if let Ok(Some(posts)) = entry.data::<Vec<Post>>() {
        if let Some(post) = posts.iter().find(|p| p.id == id) {
            println!("Votes: {}", post.vote_count);
        }
    }
}

async fn load_posts(forum: &Forum) -> anyhow::Result<Vec<Post>> {
    let value = forum
        .cache()
        .load(&ResourceKey::posts())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load posts: {}", e))?;
    Ok(serde_json::from_value(value.as_ref().clone())?)
}

fn print_post(post: &Post) {
    println!("[{}] {}", post.id, post.title);
    println!("    {}", post.body);
    println!(
        "    By: {}  Votes: {}",
        post.author_username(),
        post.vote_count
    );
}

fn finish(result: ClientResult<()>, notice: Option<&Notice>) -> ExitCode {
    if let Some(notice) = notice {
        if notice.is_error() {
            eprintln!("{}", notice.text);
        } else {
            println!("{}", notice.text);
        }
    }
    if result.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
