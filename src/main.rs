use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use transvault::commands;
use transvault::commands::extract::ExtractArgs;
use transvault::commands::language::LanguageAction;
use transvault::config::Config;
use transvault::extractor::SortField;
use transvault::logging::{self, LogLevel};
use transvault::pack::PackFormat;
use transvault::store::BulkAction;

#[derive(Parser)]
#[command(name = "transvault")]
#[command(author, version, about = "Translation key extraction, review workflow and language packs", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract translation keys from source files
    Extract {
        /// Files or directories to scan (overrides config input)
        paths: Vec<PathBuf>,

        /// Only keep keys starting with this prefix
        #[arg(long)]
        namespace: Option<String>,

        /// Sort field: key, file, line, type
        #[arg(long, value_parser = parse_sort_field)]
        sort_by: Option<SortField>,

        /// Keep every occurrence instead of the first per key
        #[arg(long)]
        no_dedupe: bool,

        /// Write occurrences as json, php, csv or pot
        #[arg(short, long, value_parser = parse_format)]
        format: Option<PackFormat>,

        /// Directory for the written file (default: current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Create pending translations for keys missing from the store
        #[arg(long)]
        create_missing: bool,

        /// Tag stored translations whose key was not found
        #[arg(long)]
        mark_unused: bool,

        /// Language to reconcile (default: config defaultLanguage)
        #[arg(short, long)]
        language: Option<String>,

        /// Store every key under this group instead of its namespace
        #[arg(short, long)]
        group: Option<String>,

        /// Fail on warnings
        #[arg(long)]
        fail_on_warnings: bool,
    },

    /// Export a language pack
    Export {
        language: String,

        /// json or php
        #[arg(short, long, value_parser = parse_format, default_value = "json")]
        format: PackFormat,

        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only export completed translations
        #[arg(long)]
        completed_only: bool,
    },

    /// Import a language pack
    Import {
        language: String,

        file: PathBuf,

        /// json or php (default: from the file extension)
        #[arg(short, long, value_parser = parse_format)]
        format: Option<PackFormat>,

        /// Replace existing values
        #[arg(long)]
        overwrite: bool,
    },

    /// Show completion per language, or details for one language
    Status { language: Option<String> },

    /// Manage languages
    Language {
        #[command(subcommand)]
        action: LanguageCommand,
    },

    /// Create or update a translation
    Set {
        language: String,
        group: String,
        key: String,
        value: String,

        /// Translator-facing note
        #[arg(long)]
        context: Option<String>,

        #[arg(long)]
        translator: Option<String>,
    },

    /// Resolve a translation through the fallback chain
    Get {
        language: String,
        group: String,
        key: String,

        /// Pick the plural form for this count
        #[arg(long)]
        count: Option<u64>,

        /// Explicit fallback languages, in order
        #[arg(long, value_delimiter = ',')]
        fallback: Vec<String>,
    },

    /// Apply a review action to translations by id
    Review {
        /// approve, reject, delete, fuzzy or outdated
        #[arg(value_parser = parse_action)]
        action: BulkAction,

        #[arg(required = true)]
        ids: Vec<u64>,

        #[arg(long, default_value = "cli")]
        reviewer: String,

        #[arg(long)]
        comment: Option<String>,
    },
}

#[derive(Subcommand)]
enum LanguageCommand {
    /// List registered languages
    List,
    /// Register a language
    Add {
        code: String,
        #[arg(long)]
        locale: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        native_name: Option<String>,
        /// Right-to-left script
        #[arg(long)]
        rtl: bool,
    },
    /// Make a language the default
    SetDefault { code: String },
    /// Make a language the fallback
    SetFallback { code: String },
    /// Activate or deactivate a language
    Toggle { code: String },
    /// Delete a language and its translations
    Delete { code: String },
}

fn parse_format(value: &str) -> Result<PackFormat, String> {
    value.parse().map_err(|e: transvault::TranslationError| e.to_string())
}

fn parse_sort_field(value: &str) -> Result<SortField, String> {
    value.parse().map_err(|e: transvault::TranslationError| e.to_string())
}

fn parse_action(value: &str) -> Result<BulkAction, String> {
    value.parse().map_err(|e: transvault::TranslationError| e.to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = LogLevel::parse(&cli.log_level)
        .ok_or_else(|| anyhow!("Unknown log level: {}", cli.log_level))?;
    logging::init(level)?;

    // Load configuration
    let config = Config::load_or_default(cli.config.as_ref())?;

    match cli.command {
        Commands::Extract {
            paths,
            namespace,
            sort_by,
            no_dedupe,
            format,
            output,
            create_missing,
            mark_unused,
            language,
            group,
            fail_on_warnings,
        } => {
            let args = ExtractArgs {
                paths,
                namespace,
                sort_by,
                no_dedupe,
                format,
                output,
                create_missing,
                mark_unused,
                language,
                group,
                fail_on_warnings,
            };
            commands::extract::run(&config, args)?;
        }
        Commands::Export {
            language,
            format,
            output,
            completed_only,
        } => {
            commands::export::run(&config, &language, format, output, completed_only)?;
        }
        Commands::Import {
            language,
            file,
            format,
            overwrite,
        } => {
            commands::import::run(&config, &language, &file, format, overwrite)?;
        }
        Commands::Status { language } => {
            commands::status::run(&config, language)?;
        }
        Commands::Language { action } => {
            let action = match action {
                LanguageCommand::List => LanguageAction::List,
                LanguageCommand::Add {
                    code,
                    locale,
                    name,
                    native_name,
                    rtl,
                } => LanguageAction::Add {
                    code,
                    locale,
                    name,
                    native_name,
                    rtl,
                },
                LanguageCommand::SetDefault { code } => LanguageAction::SetDefault(code),
                LanguageCommand::SetFallback { code } => LanguageAction::SetFallback(code),
                LanguageCommand::Toggle { code } => LanguageAction::Toggle(code),
                LanguageCommand::Delete { code } => LanguageAction::Delete(code),
            };
            commands::language::run(&config, action)?;
        }
        Commands::Set {
            language,
            group,
            key,
            value,
            context,
            translator,
        } => {
            commands::translate::set(&config, &language, &group, &key, &value, context, translator)?;
        }
        Commands::Get {
            language,
            group,
            key,
            count,
            fallback,
        } => {
            commands::translate::get(&config, &language, &group, &key, count, &fallback)?;
        }
        Commands::Review {
            action,
            ids,
            reviewer,
            comment,
        } => {
            commands::review::run(&config, action, &ids, &reviewer, comment.as_deref())?;
        }
    }

    Ok(())
}
