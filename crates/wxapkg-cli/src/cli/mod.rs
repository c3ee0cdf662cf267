//! CLI for the wxapkg toolkit.

mod commands;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use wxapkg_core::config;

use commands::{
    run_checksum, run_completions, run_config, run_decrypt, run_info, run_man, run_scan,
    run_unpack, ScanArgs,
};

/// Top-level CLI for JaySenWxapkg.
#[derive(Debug, Parser)]
#[command(name = "wxapkg", version)]
#[command(about = "Decrypt, unpack and scan WeChat mini-program packages", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Unpack every package under a directory (or a single package) and scan it
    /// for API endpoints and sensitive data.
    Scan {
        /// Directory containing .wxapkg files, or one package file.
        path: PathBuf,
        /// Output root (one subdirectory per app id). Defaults to the configured output dir.
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Unpack worker threads per package.
        #[arg(long, value_name = "N")]
        threads: Option<usize>,
        /// App id to use for every package (needed for encrypted packages outside the client's layout).
        #[arg(long)]
        wxid: Option<String>,
        /// Skip the app info lookup.
        #[arg(long)]
        offline: bool,
        /// Keep previous output of each app instead of clearing it.
        #[arg(long)]
        no_clean: bool,
        /// Write the full report as JSON to FILE ("-" for stdout).
        #[arg(long, value_name = "FILE")]
        json: Option<PathBuf>,
        /// Print only the distinct API endpoints, one per line.
        #[arg(long)]
        apis_only: bool,
    },

    /// Unpack one package, decrypting it first when needed.
    Unpack {
        /// Path to the .wxapkg file.
        path: PathBuf,
        /// Target directory. Defaults to <output root>/<app id>.
        #[arg(long, short)]
        output: Option<PathBuf>,
        #[arg(long, value_name = "N")]
        threads: Option<usize>,
        /// App id used as the decryption key; read from the path when omitted.
        #[arg(long)]
        wxid: Option<String>,
    },

    /// Decrypt an encrypted (V1MMWX) package into a plain one.
    Decrypt {
        /// Path to the encrypted package.
        path: PathBuf,
        /// App id used as the key; read from the path when omitted.
        #[arg(long)]
        wxid: Option<String>,
        /// Output file. Defaults to <name>_dec.wxapkg next to the input.
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Override the 16-byte AES IV.
        #[arg(long)]
        iv: Option<String>,
        /// Override the PBKDF2 salt.
        #[arg(long)]
        salt: Option<String>,
    },

    /// Look up a mini-program's name and owner by app id.
    Info {
        /// App id (wx + 16 hex digits).
        appid: String,
    },

    /// Compute SHA-256 of a file.
    Checksum {
        /// Path to the file.
        path: PathBuf,
        /// Expected digest (hex); exit non-zero on mismatch.
        #[arg(long, value_name = "SHA256")]
        expect: Option<String>,
    },

    /// Show or edit the configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Print shell completions.
    Completions {
        shell: clap_complete::Shell,
    },

    /// Print the man page (roff).
    Man,
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML.
    Show,
    /// Print the config file path.
    Path,
    /// Restore the built-in defaults.
    Reset,
    /// Update settings; rule lists use the same text forms as `show`.
    Set {
        /// API extraction regex.
        #[arg(long)]
        api_regex: Option<String>,
        /// File of `kind:regex` lines replacing the sensitive-data rules.
        #[arg(long, value_name = "FILE")]
        sensitive_file: Option<PathBuf>,
        /// Comma separated URL suffix blacklist, e.g. "js,png,wxss".
        #[arg(long)]
        suffixes: Option<String>,
        /// Comma separated API prefix blacklist, e.g. "pages/,components/".
        #[arg(long)]
        prefixes: Option<String>,
        #[arg(long, value_name = "N")]
        threads: Option<usize>,
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
        /// App info endpoint URL.
        #[arg(long)]
        endpoint: Option<String>,
        /// Enable or disable the app info lookup.
        #[arg(long, value_name = "BOOL")]
        lookup: Option<bool>,
    },
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Completions { shell } => return run_completions(shell, Cli::command()),
            CliCommand::Man => return run_man(Cli::command()),
            _ => {}
        }

        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Scan {
                path,
                output,
                threads,
                wxid,
                offline,
                no_clean,
                json,
                apis_only,
            } => run_scan(
                &cfg,
                ScanArgs {
                    path,
                    output,
                    threads,
                    wxid,
                    offline,
                    clean: !no_clean,
                    json,
                    apis_only,
                },
            )?,
            CliCommand::Unpack {
                path,
                output,
                threads,
                wxid,
            } => run_unpack(&cfg, &path, output, threads, wxid)?,
            CliCommand::Decrypt {
                path,
                wxid,
                output,
                iv,
                salt,
            } => run_decrypt(&cfg, &path, wxid, output, iv, salt)?,
            CliCommand::Info { appid } => run_info(&cfg, &appid)?,
            CliCommand::Checksum { path, expect } => run_checksum(&path, expect.as_deref())?,
            CliCommand::Config { action } => run_config(cfg, action)?,
            CliCommand::Completions { .. } | CliCommand::Man => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
