use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use dictag::config::AppConfig;
use dictag::core::context::CallContext;
use dictag::core::dictionary::{Dictionary, MatchType, SearchDictionary};
use dictag::core::search::{ElasticClient, MemoryBackend, SearchBackend};

#[derive(Parser)]
#[command(name = "dictag")]
#[command(about = "Tag texts against vocabulary dictionaries stored in a search service")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.config/dictag/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use a throwaway in-process store instead of the search service.
    /// It lives only for this one command, so vocabulary added by one
    /// invocation is gone by the next.
    #[arg(long, global = true)]
    memory: bool,

    /// Dictionary language
    #[arg(short, long, global = true, default_value = "english")]
    lang: String,

    /// Give up after this many seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add comma-separated vocabulary to a dictionary
    Add {
        /// Dictionary name
        #[arg(short, long)]
        dic: String,

        /// Vocabulary, e.g. "new york,chicago"
        vocs: String,
    },

    /// List vocabulary of the given dictionaries (all when omitted)
    Get {
        /// Comma-separated dictionary names
        #[arg(short, long, default_value = "")]
        dics: String,
    },

    /// Remove whole dictionaries
    RemoveDic {
        /// Comma-separated dictionary names
        dics: String,
    },

    /// Remove vocabulary from a dictionary
    RemoveVoc {
        #[arg(short, long)]
        dic: String,

        /// Comma-separated vocabulary
        vocs: String,
    },

    /// Tag texts, printing the rewritten text and per-dictionary counts
    Tag {
        /// Comma-separated dictionary names (all when omitted)
        #[arg(short, long, default_value = "")]
        dics: String,

        /// exact or broad
        #[arg(short, long, default_value = "broad")]
        match_type: MatchType,

        /// Texts to tag
        #[arg(required = true)]
        texts: Vec<String>,
    },

    /// Print the languages with a dedicated analyzer
    Languages,

    /// Check that the search service answers
    Health,
}

/// Split a comma-separated argument into trimmed, lower-cased, non-empty items.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim().to_lowercase())
        .filter(|item| !item.is_empty())
        .collect()
}

/// A single dictionary name, cased like the ones from [`split_list`].
fn canonical_dic(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AppConfig::load(),
    };
    let _log_guard = dictag::core::logging::init(&config.logging);
    log::info!("{} v{} starting", dictag::NAME, dictag::VERSION);

    let backend: Arc<dyn SearchBackend> = if cli.memory {
        Arc::new(MemoryBackend::new())
    } else {
        Arc::new(ElasticClient::new(
            &config.search.endpoint,
            config.search.request_timeout(),
        )?)
    };
    let engine = SearchDictionary::from_config(backend, &config);

    let (mut ctx, cancel) = CallContext::background().with_cancel();
    if let Some(secs) = cli.timeout {
        ctx = ctx.with_timeout(Duration::from_secs(secs));
    }
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted; cancelling");
            cancel.cancel();
        }
    });

    let lang = cli.lang.trim().to_lowercase();
    match cli.command {
        Commands::Add { dic, vocs } => {
            let stats = engine
                .add_voc(&ctx, &split_list(&vocs), &canonical_dic(&dic), &lang)
                .await?;
            print_json(&stats)
        }
        Commands::Get { dics } => {
            let listing = engine.get_voc(&ctx, &split_list(&dics), &lang).await?;
            print_json(&listing)
        }
        Commands::RemoveDic { dics } => {
            let outcomes = engine.remove_dic(&ctx, &split_list(&dics), &lang).await?;
            print_json(&outcomes)
        }
        Commands::RemoveVoc { dic, vocs } => {
            let stats = engine
                .remove_voc(&ctx, &canonical_dic(&dic), &split_list(&vocs), &lang)
                .await?;
            print_json(&stats)
        }
        Commands::Tag {
            dics,
            match_type,
            texts,
        } => {
            let results = engine
                .tag(&ctx, &texts, &split_list(&dics), &lang, match_type)
                .await?;
            print_json(&results)
        }
        Commands::Languages => print_json(&engine.supported_languages()),
        Commands::Health => {
            let up = engine.health(&ctx).await;
            print_json(&serde_json::json!({
                "backend": config.search.endpoint,
                "healthy": up,
            }))?;
            if !up {
                anyhow::bail!("search service is not reachable");
            }
            Ok(())
        }
    }
}
