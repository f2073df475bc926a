use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgGroup, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fursa_client::models::{Credentials, ProfileUpdate, RegisterRequest};
use fursa_client::{Attachment, ClientError, Config, FursaClient};

#[derive(Parser)]
#[command(name = "fursa")]
#[command(about = "Fursa job portal client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new account
    Register {
        username: String,
        email: String,
        password: String,
    },
    /// Log in and store the session token
    Login { identifier: String, password: String },
    /// Forget the stored session token
    Logout,
    /// Show your profile
    Profile,
    /// Edit your profile; attaching a file sends the update as multipart
    #[command(group(
        ArgGroup::new("changes")
            .required(true)
            .multiple(true)
            .args(["name", "bio", "skills", "image", "resume"])
    ))]
    UpdateProfile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        /// Skill id from `fursa skills`; repeat to set several
        #[arg(long = "skill")]
        skills: Vec<i64>,
        #[arg(long)]
        image: Option<PathBuf>,
        #[arg(long)]
        resume: Option<PathBuf>,
    },
    /// List the skill catalog
    Skills,
    /// List open jobs
    Jobs,
    /// Show one job in full
    Job { id: i64 },
    /// Apply to a job with a resume
    Apply {
        job_id: i64,
        #[arg(long, default_value = "")]
        cover_letter: String,
        #[arg(long)]
        resume: Option<PathBuf>,
    },
    /// List your applications
    Applications,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("fursa={0},fursa_client={0}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    debug!("Fursa client v{} -> {}", env!("CARGO_PKG_VERSION"), config.api_base_url);

    let mut client = match FursaClient::connect(&config).await {
        Ok(c) => c,
        Err(e) => return Ok(report(&e)),
    };

    match run(&mut client, cli.command).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => Ok(report(&e)),
    }
}

/// Prints the single notification for a failed operation.
fn report(err: &ClientError) -> ExitCode {
    let n = err.notification();
    eprintln!("{}: {}", n.title, n.message);
    ExitCode::FAILURE
}

async fn run(client: &mut FursaClient, command: Commands) -> Result<(), ClientError> {
    match command {
        Commands::Register {
            username,
            email,
            password,
        } => {
            let message = client
                .register(&RegisterRequest {
                    username,
                    email,
                    password,
                })
                .await?;
            println!("{message}");
        }
        Commands::Login {
            identifier,
            password,
        } => {
            client
                .login(&Credentials::new(identifier, password))
                .await?;
            println!("You are now logged in.");
        }
        Commands::Logout => {
            client.logout().await?;
            println!("Logged out successfully!");
        }
        Commands::Profile => {
            let profile = client.fetch_profile().await?;
            println!("{} (#{})", display_or(&profile.name, "Unnamed"), profile.id);
            println!("{}", display_or(&profile.bio, "No bio yet."));
            let skills: Vec<&str> = profile.skills.iter().map(|s| s.name.as_str()).collect();
            println!("Skills: {}", display_or(&skills.join(", "), "none"));
            if let Some(resume) = &profile.resume {
                println!("Resume: {resume}");
            }
        }
        Commands::UpdateProfile {
            name,
            bio,
            skills,
            image,
            resume,
        } => {
            let update = ProfileUpdate {
                name,
                bio,
                skill_ids: (!skills.is_empty()).then_some(skills),
            };
            let image = match image {
                Some(path) => Some(Attachment::from_path(path).await?),
                None => None,
            };
            let resume = match resume {
                Some(path) => Some(Attachment::from_path(path).await?),
                None => None,
            };

            // the profile id comes from the server, so load it first
            client.fetch_profile().await?;
            let profile = client.update_profile(&update, image, resume).await?;
            info!("Updated profile {}", profile.id);
            println!("Your profile has been successfully updated!");
        }
        Commands::Skills => {
            for skill in client.fetch_skills_catalog().await? {
                println!("{:>4}  {}", skill.id, skill.name);
            }
        }
        Commands::Jobs => {
            for job in client.fetch_jobs().await? {
                println!("{:>4}  {} at {} ({})", job.id, job.title, job.company, job.location);
            }
        }
        Commands::Job { id } => {
            let job = client.fetch_job(id).await?;
            println!("{}\n{}\n{}\n", job.title, job.company, job.location);
            println!("{}\n", job.description);
            println!("Requirements:\n{}", job.requirements);
        }
        Commands::Apply {
            job_id,
            cover_letter,
            resume,
        } => {
            let resume = match resume {
                Some(path) => Some(Attachment::from_path(path).await?),
                None => None,
            };
            let application = client
                .submit_application(job_id, &cover_letter, resume)
                .await?;
            println!(
                "Applied to {} at {} (application #{})",
                application.job.title, application.job.company, application.id
            );
        }
        Commands::Applications => {
            for app in client.fetch_applications().await? {
                let when = app
                    .created_at
                    .map(|t| t.format("%Y-%m-%d").to_string())
                    .unwrap_or_default();
                let status = app.status.as_deref().unwrap_or("submitted");
                println!(
                    "{:>4}  {} at {}  {status}  {when}",
                    app.id, app.job.title, app.job.company
                );
            }
        }
    }
    Ok(())
}

fn display_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}
