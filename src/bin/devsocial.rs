//! devsocial: command-line client for the DevSocial API
//!
//! Every command prints the response payload as pretty JSON.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use devsocial::{
    ApiResponse, ClientConfig, DevSocial, ImageUpload, LeaderboardQuery, NewPost, Period,
    PostQuery, ProfileUpdate, Secrets, SocialApi,
};
use serde::Serialize;

/// DevSocial CLI client
#[derive(Parser)]
#[command(name = "devsocial")]
#[command(version = devsocial::PKG_VERSION)]
#[command(about = "DevSocial API client")]
struct Args {
    /// Config file (default: $DEVSOCIAL_CONFIG or ~/.devsocial/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API base URL (overrides the config file)
    #[arg(short, long, env = "DEVSOCIAL_BASE_URL")]
    base_url: Option<String>,

    /// Bearer token (default: ~/.devsocial/secrets.toml or $DEVSOCIAL_TOKEN)
    #[arg(long)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the signed-in user's profile
    Profile {
        /// New display name
        #[arg(long)]
        name: Option<String>,
        /// New bio
        #[arg(long)]
        bio: Option<String>,
    },

    /// Show another user's profile
    User { username: String },

    /// List feed posts
    Posts {
        #[arg(short, long, default_value_t = 1)]
        page: u32,
        #[arg(short, long, default_value_t = 10)]
        limit: u32,
        /// Only posts by this user
        #[arg(long)]
        author: Option<String>,
        /// Only posts with this tag
        #[arg(long)]
        tag: Option<String>,
    },

    /// Show a single post
    Post { id: String },

    /// List comments on a post
    Comments { post_id: String },

    /// Trending posts, tags and users
    Trending {
        /// today, week, month or all
        #[arg(short, long, default_value = "today")]
        period: Period,
    },

    /// XP leaderboard
    Leaderboard {
        #[arg(short, long, default_value = "week")]
        period: Period,
        #[arg(short, long, default_value_t = 10)]
        limit: u32,
    },

    /// Personal dashboard
    Dashboard,

    /// Toggle a like on a post
    Like { post_id: String },

    /// Follow a user
    Follow { user_id: String },

    /// Unfollow a user
    Unfollow { user_id: String },

    /// Comment on a post
    Comment {
        post_id: String,
        /// Comment text (or omit to read from stdin)
        content: Option<String>,
    },

    /// Publish a new post
    Publish {
        /// Post text (or omit to read from stdin)
        content: Option<String>,
        /// Tags to attach
        #[arg(short, long)]
        tag: Vec<String>,
        /// Image URL (e.g. from `upload`)
        #[arg(long)]
        image_url: Option<String>,
    },

    /// Upload an image
    Upload {
        path: PathBuf,
        /// MIME type (default: guessed from the extension)
        #[arg(long)]
        mime: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let config = ClientConfig::load(args.config.as_deref())?;
    let mut builder = DevSocial::builder().config(&config)?;
    if let Some(url) = args.base_url {
        builder = builder.base_url(url);
    }
    let token = match args.token {
        Some(token) => Some(token),
        None => Secrets::load()?.token(),
    };
    if let Some(token) = token {
        builder = builder.bearer_token(token);
    }
    let client = builder
        .on_unauthorized(|endpoint| eprintln!("{endpoint}: session expired, sign in again"))
        .build()?;

    match args.command {
        Command::Profile { name, bio } => {
            let mut update = ProfileUpdate::new();
            if let Some(name) = name {
                update = update.name(name);
            }
            if let Some(bio) = bio {
                update = update.bio(bio);
            }
            if update.is_empty() {
                print_response(client.get_profile().await?)?;
            } else {
                print_response(client.update_profile(&update).await?)?;
            }
        }

        Command::User { username } => print_response(client.get_user(&username).await?)?,

        Command::Posts {
            page,
            limit,
            author,
            tag,
        } => {
            let mut query = PostQuery::new().page(page).limit(limit);
            if let Some(author) = author {
                query = query.author(author);
            }
            if let Some(tag) = tag {
                query = query.tag(tag);
            }
            print_response(client.get_posts(&query).await?)?;
        }

        Command::Post { id } => print_response(client.get_post(&id).await?)?,

        Command::Comments { post_id } => print_response(client.get_comments(&post_id).await?)?,

        Command::Trending { period } => {
            print_response(client.get_trending_data(period).await?)?;
        }

        Command::Leaderboard { period, limit } => {
            let query = LeaderboardQuery::new().period(period).limit(limit);
            print_response(client.get_leaderboard(&query).await?)?;
        }

        Command::Dashboard => print_response(client.get_dashboard().await?)?,

        Command::Like { post_id } => print_response(client.toggle_post_like(&post_id).await?)?,

        Command::Follow { user_id } => print_response(client.follow_user(&user_id).await?)?,

        Command::Unfollow { user_id } => print_response(client.unfollow_user(&user_id).await?)?,

        Command::Comment { post_id, content } => {
            let content = resolve_text(content, "comment")?;
            print_response(client.add_comment(&post_id, &content).await?)?;
        }

        Command::Publish {
            content,
            tag,
            image_url,
        } => {
            let mut post = NewPost::new(resolve_text(content, "publish")?);
            for tag in tag {
                post = post.tag(tag);
            }
            if let Some(url) = image_url {
                post = post.image_url(url);
            }
            print_response(client.create_post(&post).await?)?;
        }

        Command::Upload { path, mime } => {
            let bytes = std::fs::read(&path)?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload".to_string());
            let mime = mime.unwrap_or_else(|| guess_mime(&file_name).to_string());
            print_response(
                client
                    .upload_image(ImageUpload::new(file_name, mime, bytes))
                    .await?,
            )?;
        }
    }

    Ok(())
}

fn print_response<T: Serialize>(response: ApiResponse<T>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(ref message) = response.message {
        eprintln!("{message}");
    }
    let data = response.into_result()?;
    println!("{}", serde_json::to_string_pretty(&data)?);
    Ok(())
}

fn guess_mime(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Resolve text input from an optional CLI argument and/or stdin.
///
/// - arg only → arg
/// - stdin only → stdin
/// - both → `"{arg}\n\n{stdin}"`
/// - neither → error
fn resolve_text(arg: Option<String>, command: &str) -> Result<String, Box<dyn std::error::Error>> {
    let stdin_text = if io::stdin().is_terminal() {
        None
    } else {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        let trimmed = buf.trim().to_string();
        (!trimmed.is_empty()).then_some(trimmed)
    };

    match (arg, stdin_text) {
        (Some(a), Some(s)) => Ok(format!("{a}\n\n{s}")),
        (Some(a), None) => Ok(a),
        (None, Some(s)) => Ok(s),
        (None, None) => {
            Err(format!("{command}: no input provided (pass text as argument or via stdin)").into())
        }
    }
}
