use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Command-line client for a faculty e-library.
#[derive(Parser, Debug, Clone)]
#[command(name = "unilib")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file.
    #[arg(short, long, env = "UNILIB_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Request a one-time passcode for your institutional email.
    Login {
        /// Institutional email address.
        email: String,
    },

    /// Verify the emailed passcode and start a session.
    Verify {
        /// Institutional email address.
        email: String,
        /// The one-time passcode (will prompt if not provided).
        #[arg(short, long)]
        otp: Option<String>,
    },

    /// Register a new account.
    Register {
        /// Institutional email address.
        email: String,
    },

    /// End the current session.
    Logout,

    /// Show session and cache status.
    Status,

    /// Material commands.
    Material {
        /// Material subcommand action.
        #[command(subcommand)]
        action: MaterialCommand,
    },

    /// Show recent activity.
    Activity,

    /// Show the dashboard aggregates.
    Dashboard,

    /// Send feedback about the library.
    Feedback {
        /// The feedback text.
        message: String,
        /// Feedback category.
        #[arg(long, default_value = "General")]
        category: String,
        /// Rating, 1-5.
        #[arg(short, long, default_value_t = 5)]
        rating: u8,
        /// Reply address (defaults to the logged-in email).
        #[arg(short, long)]
        email: Option<String>,
        /// File to attach (max 10MB).
        #[arg(short, long)]
        attach: Option<PathBuf>,
    },

    /// Create a default config file.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
}

/// Material subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum MaterialCommand {
    /// List materials, from the cache or the backend.
    List {
        /// Refresh from the backend first.
        #[arg(short, long)]
        refresh: bool,
        /// Only show this category.
        #[arg(long)]
        category: Option<String>,
        /// Only show this level.
        #[arg(short, long)]
        level: Option<String>,
    },

    /// Show one material.
    Show {
        /// Material id.
        id: String,
    },

    /// Download a material's file.
    Download {
        /// Material id.
        id: String,
        /// Output path (defaults to the server-suggested filename).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Upload a material.
    Upload {
        /// File to upload.
        file: PathBuf,
        /// Study level, e.g. 200.
        #[arg(short, long)]
        level: String,
        /// Course code, e.g. CSC280.
        #[arg(long)]
        course_code: String,
        /// Course title.
        #[arg(long)]
        course_title: String,
        /// Description of the material.
        #[arg(short, long)]
        description: String,
    },
}

/// Main configuration from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backend API configuration.
    #[serde(default)]
    pub api: ApiConfig,

    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Feedback relay configuration.
    #[serde(default)]
    pub feedback: FeedbackConfig,

    /// Local storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Backend API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the e-library backend.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    "https://focbackend.emmanuelngoka.work/api/v1".to_string()
}

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Email domain accepted for accounts.
    #[serde(default = "default_email_domain")]
    pub email_domain: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            email_domain: default_email_domain(),
        }
    }
}

fn default_email_domain() -> String {
    "uniport.edu.ng".to_string()
}

/// Feedback relay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackConfig {
    /// Form relay endpoint feedback is posted to.
    #[serde(default = "default_feedback_endpoint")]
    pub endpoint: String,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            endpoint: default_feedback_endpoint(),
        }
    }
}

fn default_feedback_endpoint() -> String {
    "https://formsubmit.co/ajax/7dcd6f293b856a29d8866ab98c707aeb".to_string()
}

/// Local storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for the durable tier and downloaded files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|p| p.join("unilib"))
        .unwrap_or_else(|| PathBuf::from("data"))
}

impl Config {
    /// Load configuration from file.
    pub fn load(path: &PathBuf) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::AppError::Config(format!("Failed to read config file: {}", e))
        })?;

        toml::from_str(&content).map_err(|e| {
            crate::error::AppError::Config(format!("Failed to parse config file: {}", e))
        })
    }

    /// Find config file in default locations.
    pub fn find_config_file() -> Option<PathBuf> {
        let candidates = [
            PathBuf::from("unilib.toml"),
            dirs::config_dir()
                .map(|p| p.join("unilib").join("config.toml"))
                .unwrap_or_default(),
        ];

        candidates.into_iter().find(|p| p.exists())
    }

    /// Generate default config file content.
    pub fn generate_default() -> String {
        r#"# unilib configuration

[api]
# Base URL of the e-library backend
base_url = "https://focbackend.emmanuelngoka.work/api/v1"

[auth]
# Email domain accepted for accounts
email_domain = "uniport.edu.ng"

[feedback]
# Form relay endpoint feedback is posted to
endpoint = "https://formsubmit.co/ajax/7dcd6f293b856a29d8866ab98c707aeb"

[storage]
# Directory for the durable tier and downloaded files
# data_dir = "/home/me/.local/share/unilib"
"#
        .to_string()
    }
}
