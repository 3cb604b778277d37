use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use env_flags::env_flags;
use once_cell::sync::OnceCell;

use agentport::config::{
    LoggingCfg, TranslateCfg, agentport_home, expand_home, load_user_config, parse_flag, pick,
};
use agentport::modelmap::{load_default, load_from_file};
use agentport::parser::parse_definition_file;
use agentport::profile::Profile;
use agentport::prompts::FixtureTable;
use agentport::{TranslateOptions, Translator};

fn init_tracing(home: &Path, logging: Option<&LoggingCfg>) {
    env_flags! {
        /// Tracing filter, e.g. "info", "debug", or targets format.
        RUST_LOG: &str = "info";
        /// Preferred filter env (alias). If set, overrides RUST_LOG.
        TRACING_FILTER: &str = "";
        /// Pretty formatting for logs (ignored if TRACING_JSON=true).
        TRACING_PRETTY: bool = false;
        /// Compact single-line formatting for logs (ignored if TRACING_JSON=true)
        TRACING_COMPACT: bool = true;
        /// JSON formatting for logs
        TRACING_JSON: bool = false;
        /// If true, also log to file under <AGENTPORT_HOME>/logs or LOG_DIR
        LOG_TO_FILE: bool = false;
        /// Optional explicit log directory (absolute). Defaults to <AGENTPORT_HOME>/logs
        LOG_DIR: &str = "";
    }

    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, prelude::*};

    let env_set = |k: &str| std::env::var_os(k).is_some();

    // TRACING_FILTER first, then RUST_LOG, then the user config.
    let mut rust_log = if !(*TRACING_FILTER).is_empty() {
        (*TRACING_FILTER).to_string()
    } else {
        (*RUST_LOG).to_string()
    };
    let mut tracing_json = *TRACING_JSON;
    let mut tracing_compact = *TRACING_COMPACT;
    let mut tracing_pretty = *TRACING_PRETTY;
    let mut log_to_file = *LOG_TO_FILE;
    let mut log_dir: Option<PathBuf> = if !(*LOG_DIR).is_empty() {
        Some(PathBuf::from((*LOG_DIR).to_string()))
    } else {
        None
    };

    if let Some(cfg) = logging {
        if !(env_set("TRACING_FILTER") || env_set("RUST_LOG"))
            && let Some(level) = cfg.level.as_ref()
        {
            rust_log = level.clone();
        }
        if !env_set("TRACING_JSON")
            && let Some(v) = cfg.json
        {
            tracing_json = v;
        }
        if !env_set("TRACING_COMPACT")
            && let Some(v) = cfg.compact
        {
            tracing_compact = v;
        }
        if !env_set("TRACING_PRETTY")
            && let Some(v) = cfg.pretty
        {
            tracing_pretty = v;
        }
        if !env_set("LOG_TO_FILE")
            && let Some(v) = cfg.to_file
        {
            log_to_file = v;
        }
        if !env_set("LOG_DIR")
            && let Some(dir) = cfg.dir.as_ref()
        {
            log_dir = Some(expand_home(dir));
        }
    }

    let filter = EnvFilter::try_new(rust_log).unwrap_or_else(|_| EnvFilter::new("info"));

    static FILE_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();
    let file_writer = if log_to_file {
        let dir = log_dir.unwrap_or_else(|| home.join("logs"));
        match std::fs::create_dir_all(&dir) {
            Ok(()) => {
                let appender = tracing_appender::rolling::daily(dir, "agentport.log");
                let (nb, guard) = tracing_appender::non_blocking(appender);
                let _ = FILE_GUARD.set(guard);
                Some(nb)
            }
            Err(e) => {
                eprintln!("failed to create log dir {}: {}", dir.display(), e);
                None
            }
        }
    } else {
        None
    };

    // Stderr keeps stdout free for the generated file listing.
    macro_rules! install {
        ($($style:ident)?) => {{
            let stderr_layer = tracing_subscriber::fmt::layer()
                .with_file(false)
                .with_line_number(false)
                .with_target(true)
                .with_ansi(true)
                .with_writer(std::io::stderr)
                $(.$style())?;
            let file_layer = file_writer.map(|nb| {
                tracing_subscriber::fmt::layer()
                    .with_file(false)
                    .with_line_number(false)
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(nb)
                    $(.$style())?
            });
            let subscriber = tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(file_layer);
            if let Err(e) = subscriber.try_init() {
                tracing::debug!("tracing already set: {:?}", e);
            }
        }};
    }

    if tracing_json {
        install!(json);
    } else if tracing_compact {
        install!(compact);
    } else if tracing_pretty {
        install!(pretty);
    } else {
        install!();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_flags! {
        /// agentport home directory (absolute). Defaults to $HOME/.agentport
        AGENTPORT_HOME: &str = "";
        /// Agent definition file (.json, .yaml or .yml); the first argument wins.
        AGENTPORT_DEFINITION: &str = "";
        /// Directory the generated files are written to. Defaults to ./agentport_output
        AGENTPORT_OUTPUT_DIR: &str = "";
        /// Target profile: "langgraph" (default) or "strands"
        AGENTPORT_PROFILE: &str = "";
        /// Serve function-backed action groups through a gateway. Empty uses the definition.
        AGENTPORT_GATEWAY: &str = "";
        /// Optional model map TOML extending the built-in provider table
        AGENTPORT_MODEL_MAP_FILE: &str = "";
        /// Optional TOML file overriding prompt fixtures
        AGENTPORT_FIXTURES_FILE: &str = "";
    }

    let home = agentport_home(*AGENTPORT_HOME);
    let user_cfg = load_user_config(&home)?.unwrap_or_default();
    init_tracing(&home, user_cfg.logging.as_ref());
    let file_cfg: TranslateCfg = user_cfg.translate.unwrap_or_default();

    let definition_path = std::env::args()
        .nth(1)
        .or_else(|| pick(*AGENTPORT_DEFINITION, file_cfg.definition.as_ref()))
        .map(|p| expand_home(&p))
        .ok_or_else(|| anyhow!("no agent definition given: pass a path or set AGENTPORT_DEFINITION"))?;
    let output_dir = pick(*AGENTPORT_OUTPUT_DIR, file_cfg.output_dir.as_ref())
        .map(|p| expand_home(&p))
        .unwrap_or_else(|| PathBuf::from("agentport_output"));
    let profile: Profile = pick(*AGENTPORT_PROFILE, file_cfg.profile.as_ref())
        .map(|p| p.parse::<Profile>().map_err(|e| anyhow!(e)))
        .transpose()?
        .unwrap_or_default();
    let gateway = parse_flag(*AGENTPORT_GATEWAY)
        .context("invalid AGENTPORT_GATEWAY")?
        .or(file_cfg.gateway);

    let providers = match pick(*AGENTPORT_MODEL_MAP_FILE, file_cfg.model_map_file.as_ref()) {
        Some(path) => load_from_file(&expand_home(&path))?,
        None => load_default(),
    };
    let fixtures = match pick(*AGENTPORT_FIXTURES_FILE, file_cfg.fixtures_file.as_ref()) {
        Some(path) => FixtureTable::load(&expand_home(&path)).context("loading prompt fixtures")?,
        None => FixtureTable::built_in(),
    };

    tracing::info!(
        "agentport {}: {} -> {} (profile={})",
        env!("CARGO_PKG_VERSION"),
        definition_path.display(),
        output_dir.display(),
        profile
    );
    let definition = parse_definition_file(&definition_path)?;

    let options = TranslateOptions {
        profile,
        fixtures,
        providers,
        gateway,
    };
    let output = Translator::new(options)
        .translate(&definition)
        .await
        .with_context(|| format!("translating {}", definition_path.display()))?;
    output
        .write(&output_dir)
        .await
        .with_context(|| format!("writing output to {}", output_dir.display()))?;

    for file in &output.files {
        println!("{}", output_dir.join(&file.path).display());
    }
    Ok(())
}
