use anyhow::Context;
use clap::Parser;
use kfc_core::EnvConfig;
use kfc_rag::StreamKind;
use std::path::PathBuf;

mod app;
mod commands;
mod logging;

use app::App;
use commands::{handle_command, Commands};

#[derive(Parser, Debug)]
#[command(author, version, about = "KFC reading shelf client", long_about = None)]
pub struct Cli {
    /// API base URL
    #[arg(long)]
    api_url: Option<String>,
    /// Answer everything from local mock data
    #[arg(long, conflicts_with = "live")]
    mock: bool,
    /// Talk to the real API and RAG service
    #[arg(long)]
    live: bool,
    /// Ask RAGFlow directly instead of going through API datasets
    #[arg(long)]
    ragflow_direct: bool,
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Public prefix local image paths are mapped to
    #[arg(long)]
    image_prefix: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Flags win over the environment.
    fn resolve_config(&self, mut config: EnvConfig) -> EnvConfig {
        if let Some(url) = &self.api_url {
            config = config.with_api_url(url.clone());
        }
        if self.mock {
            config = config.with_mock_data(true).with_mock_service(true);
        }
        if self.live {
            config = config.with_mock_data(false).with_mock_service(false);
        }
        if let Some(dir) = &self.data_dir {
            config = config.with_data_dir(dir.clone());
        }
        if let Some(prefix) = &self.image_prefix {
            config = config.with_public_image_path(Some(prefix.clone()));
        }
        config
    }

    fn stream_kind(&self, config: &EnvConfig) -> StreamKind {
        if self.ragflow_direct && !config.use_mock_service {
            StreamKind::RagflowDirect
        } else {
            StreamKind::from_mock_flag(config.use_mock_service)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config(EnvConfig::from_env());
    logging::init_logging(config.show_debug_info);
    if config.show_debug_info {
        config.log_summary();
    }

    let stream_kind = cli.stream_kind(&config);
    let app = App::compose(config, stream_kind)
        .await
        .context("Failed to start the KFC client")?;
    handle_command(cli.command, &app).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_environment() {
        let env = EnvConfig::default().with_api_url("http://env:8000/api/v1");
        let cli = Cli::try_parse_from([
            "kfc",
            "--live",
            "--api-url",
            "http://flag:9000/api/v1",
            "--image-prefix",
            "https://cdn.example.com/img",
            "trending",
            "--period",
            "day",
        ])
        .unwrap();

        let config = cli.resolve_config(env);
        assert_eq!(config.api_url, "http://flag:9000/api/v1");
        assert!(!config.use_mock_data);
        assert!(!config.use_mock_service);
        assert_eq!(config.public_image_path.as_deref(), Some("https://cdn.example.com/img"));
        assert_eq!(cli.stream_kind(&config), StreamKind::Dataset);
        assert!(matches!(
            cli.command,
            Commands::Trending {
                period: Some(kfc_core::TrendingPeriod::Day)
            }
        ));
    }

    #[test]
    fn test_ragflow_direct_needs_live_service() {
        let cli = Cli::try_parse_from(["kfc", "--ragflow-direct", "ask", "什么是深度学习"]).unwrap();
        let config = cli.resolve_config(EnvConfig::default());
        assert_eq!(cli.stream_kind(&config), StreamKind::Mock);

        let config = config.with_mock_service(false);
        assert_eq!(cli.stream_kind(&config), StreamKind::RagflowDirect);

        assert!(Cli::try_parse_from(["kfc", "--mock", "--live", "logout"]).is_err());
    }
}
