use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use secrecy::SecretString;
use std::path::{Path, PathBuf};

use gazette::admin::{AdminConsole, ArticleDraft};
use gazette::auth::{AdminGate, LocalIdentity};
use gazette::config::Config;
use gazette::contact::{send_contact, ContactForm, SubscriberEmail};
use gazette::content::{render_article_page, render_body};
use gazette::newsletter::{HttpMailer, NewsletterTemplate};
use gazette::storage::{ArticleFields, Database, DatabaseError, Role, SubscribeOutcome};
use gazette::uploads::{LocalBlobStore, UploadFile};
use gazette::util::format_publication_date;

/// Environment variable holding the password for privileged commands
const PASSWORD_ENV: &str = "GAZETTE_PASSWORD";

type Console = AdminConsole<LocalIdentity, LocalBlobStore, Option<HttpMailer>>;

/// Get the config directory path (~/.config/gazette/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("gazette"))
}

#[derive(Parser, Debug)]
#[command(name = "gazette", about = "Magazine content core: article rendering and admin CMS")]
struct Cli {
    /// Config file (default: ~/.config/gazette/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Admin account for privileged commands (password from GAZETTE_PASSWORD)
    #[arg(long = "as", global = true, value_name = "EMAIL")]
    admin_email: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a raw article body file to HTML
    Render {
        file: PathBuf,
        /// Media reference, in placeholder index order (repeatable)
        #[arg(long = "media", value_name = "URL")]
        media: Vec<String>,
        /// Wrap the fragment in a standalone HTML document
        #[arg(long)]
        page: bool,
    },
    /// Manage articles
    Article {
        #[command(subcommand)]
        action: ArticleCommand,
    },
    /// Subscribe an address to the newsletter
    Subscribe { email: String },
    /// List active subscribers (admin)
    Subscribers,
    /// Remove a subscriber (admin)
    Unsubscribe { id: i64 },
    /// Show or change the newsletter template
    Template {
        #[command(subcommand)]
        action: TemplateCommand,
    },
    /// Manage accounts
    Account {
        #[command(subcommand)]
        action: AccountCommand,
    },
    /// Email an article to every active subscriber (admin)
    Publish { article_id: i64 },
    /// Send a contact form message to the editors
    Contact {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long = "from", value_name = "EMAIL")]
        email: String,
        #[arg(long)]
        message: String,
    },
}

#[derive(Subcommand, Debug)]
enum ArticleCommand {
    /// List articles, newest first
    List,
    /// Print the rendered article page
    Show { id: i64 },
    /// Create an article (admin)
    Create(ArticleArgs),
    /// Replace an article's fields (admin)
    Update {
        id: i64,
        #[command(flatten)]
        fields: ArticleArgs,
    },
    /// Delete an article (admin)
    Delete { id: i64 },
}

#[derive(Args, Debug)]
struct ArticleArgs {
    #[arg(long)]
    title: String,
    /// File holding the raw body text
    #[arg(long, value_name = "FILE")]
    body_file: PathBuf,
    #[arg(long)]
    author: String,
    #[arg(long)]
    category: String,
    #[arg(long, default_value = "")]
    excerpt: String,
    #[arg(long, default_value = "")]
    read_time: String,
    /// Existing primary image URL
    #[arg(long, value_name = "URL")]
    image_url: Option<String>,
    /// Existing media URL (repeatable)
    #[arg(long = "media", value_name = "URL")]
    media: Vec<String>,
    /// Local image to upload as the primary image
    #[arg(long, value_name = "FILE")]
    cover: Option<PathBuf>,
    /// Local image or video to upload and append to the media list (repeatable)
    #[arg(long = "upload", value_name = "FILE")]
    uploads: Vec<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum TemplateCommand {
    /// Print the current template (admin)
    Show,
    /// Replace the template (admin)
    Save {
        #[arg(long)]
        subject: String,
        #[arg(long, value_name = "FILE")]
        body_file: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum AccountCommand {
    /// Create an account; the password is read from GAZETTE_PASSWORD
    Create {
        email: String,
        #[arg(long)]
        admin: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => get_config_dir()?.join("config.toml"),
    };
    let config_base = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?
        .with_env_overrides()
        .resolve_paths(&config_base);

    // Rendering is pure, so only the other commands open the database
    let db = || open_database(&config);

    match cli.command {
        Command::Render { file, media, page } => render_file(&file, &media, page)?,
        Command::Article { action } => {
            run_article(action, &cli.admin_email, &config, db().await?).await?
        }
        Command::Subscribe { email } => {
            let email = SubscriberEmail::parse(&email)?;
            match db().await?.subscribe(&email).await? {
                SubscribeOutcome::Subscribed(id) => println!("Subscribed {} (id {})", email, id),
                SubscribeOutcome::AlreadySubscribed => println!("{} is already subscribed", email),
            }
        }
        Command::Subscribers => {
            let mut console = admin_console(&cli.admin_email, &config, db().await?).await?;
            for s in console.list_subscribers().await? {
                println!(
                    "{:>5}  {}  {}",
                    s.id,
                    format_publication_date(s.subscribed_at),
                    s.email
                );
            }
        }
        Command::Unsubscribe { id } => {
            let mut console = admin_console(&cli.admin_email, &config, db().await?).await?;
            console.delete_subscriber(id).await?;
            println!("Subscriber {} removed", id);
        }
        Command::Template { action } => {
            let mut console = admin_console(&cli.admin_email, &config, db().await?).await?;
            match action {
                TemplateCommand::Show => {
                    let template = console.template().await?;
                    println!("Subject: {}\n\n{}", template.subject, template.body);
                }
                TemplateCommand::Save { subject, body_file } => {
                    let body = read_text(&body_file)?;
                    console
                        .save_template(&NewsletterTemplate { subject, body })
                        .await?;
                    println!("Template saved");
                }
            }
        }
        Command::Account {
            action: AccountCommand::Create { email, admin },
        } => {
            let email = SubscriberEmail::parse(&email)?;
            let password = std::env::var(PASSWORD_ENV)
                .with_context(|| format!("{} must hold the new account's password", PASSWORD_ENV))?;
            let role = if admin { Role::Admin } else { Role::User };
            let id = LocalIdentity::new(db().await?)
                .register(email.as_str(), &password, role)
                .await
                .context("Failed to create account")?;
            println!("Created {} account {} (id {})", role.as_str(), email, id);
        }
        Command::Publish { article_id } => {
            let mut console = admin_console(&cli.admin_email, &config, db().await?).await?;
            let report = console.publish_newsletter(article_id).await?;
            println!("Sent to {} subscriber(s)", report.sent);
            if !report.failed.is_empty() {
                eprintln!("Failed: {}", report.failed.join(", "));
            }
        }
        Command::Contact {
            first_name,
            last_name,
            email,
            message,
        } => {
            let contact_address = config
                .contact_address
                .as_deref()
                .context("contact_address is not configured")?;
            let form = ContactForm {
                first_name,
                last_name,
                email,
                message,
            };
            send_contact(&build_mailer(&config)?, contact_address, &form).await?;
            println!("Message sent");
        }
    }

    Ok(())
}

fn render_file(file: &Path, media: &[String], page: bool) -> Result<()> {
    let text = read_text(file)?;
    let body = render_body(&text, media);
    if page {
        println!(
            "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\" /></head>\n<body>\n{}</body>\n</html>",
            body
        );
    } else {
        print!("{}", body);
    }
    Ok(())
}

async fn run_article(
    action: ArticleCommand,
    admin_email: &Option<String>,
    config: &Config,
    db: Database,
) -> Result<()> {
    match action {
        ArticleCommand::List => {
            for article in db.list_articles().await? {
                println!(
                    "{:>5}  {:<16}  {:<17}  {}",
                    article.id,
                    format_publication_date(article.created_at),
                    article.category,
                    article.title
                );
            }
        }
        ArticleCommand::Show { id } => {
            let article = db
                .get_article(id)
                .await?
                .with_context(|| format!("Article {} not found", id))?;
            let body = render_body(&article.body, &article.media_urls);
            print!("{}", render_article_page(&article, &body));
        }
        ArticleCommand::Create(args) => {
            let draft = build_draft(args).await?;
            let mut console = admin_console(admin_email, config, db).await?;
            let id = console.create_article(draft).await?;
            println!("Created article {}", id);
        }
        ArticleCommand::Update { id, fields } => {
            let draft = build_draft(fields).await?;
            let mut console = admin_console(admin_email, config, db).await?;
            console.update_article(id, draft).await?;
            println!("Updated article {}", id);
        }
        ArticleCommand::Delete { id } => {
            let mut console = admin_console(admin_email, config, db).await?;
            console.delete_article(id).await?;
            println!("Deleted article {}", id);
        }
    }
    Ok(())
}

async fn build_draft(args: ArticleArgs) -> Result<ArticleDraft> {
    let body = read_text(&args.body_file)?;

    let cover_image = match &args.cover {
        Some(path) => Some(
            UploadFile::from_path(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?,
        ),
        None => None,
    };
    let mut media_files = Vec::with_capacity(args.uploads.len());
    for path in &args.uploads {
        media_files.push(
            UploadFile::from_path(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?,
        );
    }

    Ok(ArticleDraft {
        fields: ArticleFields {
            title: args.title,
            excerpt: args.excerpt,
            body,
            author: args.author,
            category: args.category,
            image_url: args.image_url,
            media_urls: args.media,
            read_time: args.read_time,
        },
        cover_image,
        media_files,
    })
}

async fn open_database(config: &Config) -> Result<Database> {
    if let Some(parent) = config.database_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory {}", parent.display())
            })?;
        }
    }

    let db_path = config
        .database_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    match Database::open(db_path).await {
        Ok(db) => Ok(db),
        Err(DatabaseError::Locked) => {
            eprintln!("Error: The database is in use by another process. Please close it and try again.");
            std::process::exit(1);
        }
        Err(e) => Err(anyhow::anyhow!("Failed to open database: {}", e)),
    }
}

fn build_mailer(config: &Config) -> Result<Option<HttpMailer>> {
    config
        .mailer_endpoint
        .as_deref()
        .map(|endpoint| {
            HttpMailer::new(
                endpoint,
                config.mailer_api_key.clone().map(SecretString::from),
            )
            .context("Invalid mailer configuration")
        })
        .transpose()
}

/// Build the console and sign in with `--as` and `GAZETTE_PASSWORD`
async fn admin_console(email: &Option<String>, config: &Config, db: Database) -> Result<Console> {
    let email = email
        .as_deref()
        .context("This command requires --as <EMAIL> for an admin account")?;
    let password = std::env::var(PASSWORD_ENV)
        .with_context(|| format!("{} must be set for admin commands", PASSWORD_ENV))?;

    let gate = AdminGate::new(LocalIdentity::new(db.clone()));
    let store = LocalBlobStore::new(&config.upload_dir, &config.public_base_url);
    let mut console = AdminConsole::new(gate, db, store, build_mailer(config)?, &config.site_url);

    console
        .sign_in(email, &password)
        .await
        .context("Admin sign-in failed")?;
    tracing::debug!(email = %email, "Signed in as admin");
    Ok(console)
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
