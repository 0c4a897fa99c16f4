//! sealdrop: seal a file locally, share it through a link that self-destructs
//!
//! Commands:
//!   send <file>   - encrypt locally, upload ciphertext, print the share link
//!   fetch <link>  - download ciphertext, decrypt locally, write the file
//!
//! The decryption secret lives in the link's `#fragment` and never reaches
//! the server; losing the link before sharing it makes the upload
//! permanently unrecoverable.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};

use sealdrop_cli::{build_link, parse_link, safe_output_name, ApiClient};
use sealdrop_crypto::{decode_secret, encode_secret, hash_password, open, seal};

#[derive(Parser, Debug)]
#[command(
    name = "sealdrop",
    version,
    about = "zero-knowledge one-shot file sharing",
    long_about = "sealdrop: encrypt locally, share via a single link; the share \
self-destructs after its expiry or download limit, whichever comes first"
)]
struct Cli {
    /// Share server base URL (send only; fetch uses the link's host)
    #[arg(long, env = "SEALDROP_SERVER", default_value = "http://127.0.0.1:8320")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt a file locally and upload the ciphertext; prints the share link
    Send {
        /// File to share
        file: PathBuf,

        /// Minutes until the link expires
        #[arg(long, default_value_t = 15)]
        expires: i64,

        /// Successful downloads before the share self-destructs
        #[arg(long, default_value_t = 1)]
        max_downloads: u32,

        /// Prompt for a download password (empty input = no password)
        #[arg(long)]
        password: bool,

        /// Name shown to the receiver (default: the file's name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Download a share link and decrypt it locally
    Fetch {
        /// The full share link, including the #secret fragment
        link: String,

        /// Output path (default: the name reported by the server)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Prompt for the download password
        #[arg(long)]
        password: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Send {
            file,
            expires,
            max_downloads,
            password,
            name,
        } => send(&cli.server, &file, expires, max_downloads, password, name).await,
        Commands::Fetch {
            link,
            output,
            password,
        } => fetch(&link, output, password).await,
    }
}

async fn send(
    server: &str,
    file: &Path,
    expires_mins: i64,
    max_downloads: u32,
    password: bool,
    name: Option<String>,
) -> Result<()> {
    anyhow::ensure!(max_downloads >= 1, "--max-downloads must be at least 1");
    anyhow::ensure!(expires_mins >= 1, "--expires must be at least 1 minute");

    let filename = name.unwrap_or_else(|| {
        file.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".into())
    });

    let password_hash = if password {
        prompt_password("Download password (empty for none): ")?
    } else {
        None
    };

    let plaintext = tokio::fs::read(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;

    let spinner = transfer_spinner(&format!("sealing {filename}"));
    let sealed = seal(&plaintext)?;
    let token = encode_secret(&sealed.key, &sealed.nonce);
    drop(plaintext);

    spinner.set_message(format!("uploading {filename}"));
    let client = ApiClient::new(server);
    let expires_at = Utc::now() + Duration::minutes(expires_mins);
    let id = client
        .upload(
            sealed.ciphertext,
            expires_at,
            max_downloads,
            password_hash.as_deref(),
            &filename,
        )
        .await?;
    spinner.finish_and_clear();

    println!("{}", build_link(server, &id, &token));
    eprintln!(
        "expires {} · {} download{} · keep the part after '#' secret",
        expires_at.format("%Y-%m-%d %H:%M UTC"),
        max_downloads,
        if max_downloads == 1 { "" } else { "s" },
    );
    Ok(())
}

async fn fetch(link: &str, output: Option<PathBuf>, password: bool) -> Result<()> {
    let parsed = parse_link(link)?;
    let (key, nonce) = decode_secret(&parsed.token)?;

    let password_hash = if password {
        prompt_password("Download password: ")?
    } else {
        None
    };

    let spinner = transfer_spinner("downloading");
    let client = ApiClient::new(&parsed.server);
    let fetched = client
        .download(&parsed.id, password_hash.as_deref())
        .await?;

    spinner.set_message("opening");
    // generic failure on purpose: do not reveal whether key or payload was bad
    let plaintext = open(&fetched.ciphertext, &key, &nonce)
        .map_err(|_| anyhow::anyhow!("decryption failed — wrong link secret or corrupted payload"))?;
    spinner.finish_and_clear();

    let out = output.unwrap_or_else(|| {
        PathBuf::from(safe_output_name(
            fetched.original_name.as_deref().unwrap_or("file"),
        ))
    });
    write_atomically(&out, &plaintext).await?;

    println!("wrote {} ({} bytes)", out.display(), plaintext.len());
    Ok(())
}

/// Prompt for a password without echo. Empty input means "no password" —
/// an empty string is never hashed as a stand-in.
fn prompt_password(prompt: &str) -> Result<Option<String>> {
    let entered = SecretString::from(rpassword::prompt_password(prompt)?);
    if entered.expose_secret().is_empty() {
        return Ok(None);
    }
    Ok(Some(hash_password(entered.expose_secret()).to_hex()))
}

/// Write via temp+rename so a failure part-way leaves no partial plaintext.
async fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    let tmp = path.with_extension("sealdrop-partial");
    tokio::fs::write(&tmp, contents)
        .await
        .with_context(|| format!("writing {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("renaming into {}", path.display()))?;
    Ok(())
}

fn transfer_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}").expect("static spinner template"),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(std::time::Duration::from_millis(120));
    spinner
}
