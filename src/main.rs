//! unilib CLI entry point.

use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use unilib::activity::{ActivityKind, ActivityMetadata, NewActivity, relative_time};
use unilib::api::MaterialUpload;
use unilib::app::App;
use unilib::auth::User;
use unilib::config::{Cli, Command, Config, MaterialCommand};
use unilib::feedback::{Attachment, FeedbackForm};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "unilib=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Find or load config
    let config_path = cli.config.clone().or_else(Config::find_config_file);

    let config = if let Some(ref path) = config_path {
        Config::load(path)?
    } else {
        Config::default()
    };

    match cli.command {
        Command::Init { force } => cmd_init(force),
        Command::Login { email } => cmd_login(config, email).await,
        Command::Verify { email, otp } => cmd_verify(config, email, otp).await,
        Command::Register { email } => cmd_register(config, email).await,
        Command::Logout => cmd_logout(config),
        Command::Status => cmd_status(config),
        Command::Material { action } => cmd_material(config, action).await,
        Command::Activity => cmd_activity(config),
        Command::Dashboard => cmd_dashboard(config),
        Command::Feedback {
            message,
            category,
            rating,
            email,
            attach,
        } => cmd_feedback(config, message, category, rating, email, attach).await,
    }
}

/// Create a default config file.
fn cmd_init(force: bool) -> anyhow::Result<()> {
    let config_path = PathBuf::from("unilib.toml");

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(&config_path, Config::generate_default())?;
    println!("Created config file: {}", config_path.display());

    let config = Config::default();
    std::fs::create_dir_all(&config.storage.data_dir)?;
    println!("Data directory: {}", config.storage.data_dir.display());

    println!("\nThen run: unilib login <email> to request a passcode.");

    Ok(())
}

/// Request a one-time passcode.
async fn cmd_login(config: Config, email: String) -> anyhow::Result<()> {
    let app = App::new(config)?;

    let response = app.api.request_otp(&email).await?;
    println!("{}", response.message);
    println!("Check your inbox, then run: unilib verify {} --otp <code>", email);

    Ok(())
}

/// Verify the passcode and start a session.
async fn cmd_verify(config: Config, email: String, otp: Option<String>) -> anyhow::Result<()> {
    let app = App::new(config)?;

    let otp = match otp {
        Some(o) => o,
        None => prompt("OTP: ")?,
    };

    let session = app.api.verify_otp(&email, &otp).await?;

    app.auth.login(User {
        id: Some(session.user.id),
        email: session.user.email.clone(),
        token: Some(session.token),
    });

    // Per-user stores become loadable once the session is persisted.
    app.activity.init();
    app.dashboard.init();

    println!("Logged in as {}", session.user.email);

    Ok(())
}

/// Register a new account.
async fn cmd_register(config: Config, email: String) -> anyhow::Result<()> {
    let app = App::new(config)?;

    let response = app.api.register(&email).await?;
    println!("{}", response.message);

    Ok(())
}

/// End the current session.
fn cmd_logout(config: Config) -> anyhow::Result<()> {
    let app = App::new(config)?;
    app.startup();

    app.auth.logout();
    println!("Logged out.");

    Ok(())
}

/// Show session and cache status.
fn cmd_status(config: Config) -> anyhow::Result<()> {
    let app = App::new(config)?;
    app.startup();

    let state = app.auth.current();
    let authenticated = state.is_authenticated;
    if let Some(user) = state.user.filter(|_| authenticated) {
        println!("Logged in as {}", user.email);
    } else {
        println!("Not logged in.");
    }

    println!("Cached materials: {}", app.materials.len());
    println!("Activity entries: {}", app.activity.entries().len());
    println!("Data directory: {}", app.config.storage.data_dir.display());

    Ok(())
}

/// Material commands.
async fn cmd_material(config: Config, action: MaterialCommand) -> anyhow::Result<()> {
    let app = App::new(config)?;
    app.startup();

    match action {
        MaterialCommand::List {
            refresh,
            category,
            level,
        } => {
            if refresh || app.materials.is_empty() {
                app.materials.fetch_all().await;
            }

            let materials: Vec<_> = app
                .materials
                .all()
                .into_iter()
                .filter(|m| {
                    category
                        .as_ref()
                        .is_none_or(|c| m.category.eq_ignore_ascii_case(c))
                })
                .filter(|m| level.as_ref().is_none_or(|l| m.level == *l))
                .collect();

            if materials.is_empty() {
                println!("No materials found.");
                return Ok(());
            }

            println!(
                "{:<26} {:<10} {:<6} {:<16} {:>5}  TITLE",
                "ID", "COURSE", "LEVEL", "CATEGORY", "DLS"
            );
            println!("{}", "-".repeat(100));
            for m in &materials {
                println!(
                    "{:<26} {:<10} {:<6} {:<16} {:>5}  {}",
                    m.id, m.course_code, m.level, m.category, m.downloads, m.title
                );
            }

            // The breakdown covers the whole collection, so only show
            // it for an unfiltered listing.
            let categories = app.materials.categories();
            if category.is_none() && level.is_none() && !categories.is_empty() {
                let summary: Vec<String> = categories
                    .iter()
                    .map(|c| format!("{} {} ({:.0}%)", c.count, c.name, c.percentage))
                    .collect();
                println!("\n{} materials: {}", materials.len(), summary.join(", "));
            }
        }

        MaterialCommand::Show { id } => {
            let material = match app.materials.get(&id) {
                Some(m) => m,
                None => app.api.get_material(&id).await?,
            };

            println!("Title:       {}", material.title);
            println!("Course:      {}", material.course_code);
            println!("Level:       {}", material.level);
            println!("Category:    {}", material.category);
            println!("Downloads:   {}", material.downloads);
            println!("Added:       {}", material.created_at.format("%Y-%m-%d"));
            if !material.description.is_empty() {
                println!("\n{}", material.description);
            }
        }

        MaterialCommand::Download { id, output } => {
            let Some(token) = app.auth.token() else {
                anyhow::bail!("Not logged in. Run: unilib login <email>");
            };

            let file = app.api.download_material(&id, &token).await?;

            let path = output.unwrap_or_else(|| PathBuf::from(&file.filename));
            std::fs::write(&path, &file.bytes)?;

            // Optimistic updates; the next full refresh is authoritative.
            app.materials.increment_downloads(&id);
            app.dashboard.increment_downloads(&id);

            let cached = app.materials.get(&id);
            let title = cached
                .as_ref()
                .map(|m| m.title.clone())
                .unwrap_or_else(|| file.filename.clone());
            app.activity.add(NewActivity {
                kind: ActivityKind::Download,
                title,
                description: format!("Downloaded {}", file.filename),
                metadata: cached.map(|m| ActivityMetadata {
                    course_code: Some(m.course_code),
                    level: Some(m.level),
                    downloads: Some(m.downloads),
                    ..Default::default()
                }),
            });

            println!("Saved {} ({} bytes)", path.display(), file.bytes.len());
        }

        MaterialCommand::Upload {
            file,
            level,
            course_code,
            course_title,
            description,
        } => {
            let Some(token) = app.auth.token() else {
                anyhow::bail!("Not logged in. Run: unilib login <email>");
            };

            let contents = std::fs::read(&file)?;
            let file_name = file
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("material")
                .to_string();

            let created = app
                .api
                .upload_material(
                    MaterialUpload {
                        level,
                        course_code,
                        course_title,
                        description,
                        file_name,
                        contents,
                    },
                    &token,
                )
                .await?;

            app.materials.add(created.clone());
            app.dashboard.add_material(&created);
            app.activity.add(NewActivity {
                kind: ActivityKind::Upload,
                title: created.title.clone(),
                description: format!("Uploaded {}", created.course_code),
                metadata: Some(ActivityMetadata {
                    course_code: Some(created.course_code.clone()),
                    level: Some(created.level.clone()),
                    ..Default::default()
                }),
            });

            println!("Uploaded {} ({})", created.title, created.id);
        }
    }

    Ok(())
}

/// Show recent activity.
fn cmd_activity(config: Config) -> anyhow::Result<()> {
    let app = App::new(config)?;
    app.startup();

    let entries = app.activity.entries();
    if entries.is_empty() {
        println!("No activity recorded.");
        return Ok(());
    }

    let now = chrono::Utc::now();
    for entry in entries {
        println!(
            "{:<12} {:<10} {} - {}",
            relative_time(entry.timestamp, now),
            format!("{:?}", entry.kind).to_lowercase(),
            entry.title,
            entry.description
        );
    }

    Ok(())
}

/// Show the dashboard aggregates.
fn cmd_dashboard(config: Config) -> anyhow::Result<()> {
    let app = App::new(config)?;
    app.startup();

    let data = app.dashboard.snapshot();

    println!("Materials:   {}", data.stats.total_materials);
    println!("Downloads:   {}", data.stats.total_downloads);
    println!("Uploads:     {}", data.stats.uploads);
    println!("This month:  {}", data.stats.active_this_month);

    if !data.categories.is_empty() {
        println!("\nCategories:");
        for category in &data.categories {
            println!(
                "  {:<20} {:>4} ({:.1}%)",
                category.name, category.count, category.percentage
            );
        }
    }

    if !data.materials.is_empty() {
        println!("\nRecent materials:");
        for preview in &data.materials {
            println!(
                "  {:<10} {:<6} {} ({} downloads)",
                preview.course_code, preview.level, preview.title, preview.downloads
            );
        }
    }

    Ok(())
}

/// Send feedback.
async fn cmd_feedback(
    config: Config,
    message: String,
    category: String,
    rating: u8,
    email: Option<String>,
    attach: Option<PathBuf>,
) -> anyhow::Result<()> {
    let app = App::new(config)?;
    app.startup();

    let email = email.or_else(|| app.auth.current().user.map(|u| u.email));

    let attachment = match attach {
        Some(path) => {
            let contents = std::fs::read(&path)?;
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("attachment")
                .to_string();
            Some(Attachment {
                file_name,
                contents,
            })
        }
        None => None,
    };

    let receipt = app
        .feedback
        .submit(FeedbackForm {
            message,
            category: category.clone(),
            rating,
            email,
            attachment,
        })
        .await?;

    app.activity.add(NewActivity {
        kind: ActivityKind::Feedback,
        title: format!("Feedback: {}", category),
        description: format!("Rated {}/5", rating),
        metadata: None,
    });

    println!("{}", receipt.message);

    Ok(())
}

/// Prompt for a line of input.
fn prompt(label: &str) -> anyhow::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;

    Ok(line.trim().to_string())
}
