//! Command handlers

use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::{Cli, Commands, ConfigArgs};
use crate::output::{output_catalog, output_prompt, output_report, output_scores, output_verdict};
use dynbg_app::app::SceneEvent;
use dynbg_app::config::Config;
use dynbg_app::repository::{open_catalog_source, open_evaluator, open_evaluator_with};
use dynbg_domain::model::TagFilter;
use dynbg_domain::service::{build_catalog, TriggerDetector, UNKNOWN_SENTINEL};
use dynbg_judge::{parse_reply_with, PromptComposer, ReplayTransport};
use dynbg_types::{CandidateOption, ChatMessage, Error, MessageRole, Result};

/// Execute the CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::config_path()?,
    };
    let config = Config::load_from(&config_path)?;
    let output_format = cli.format.unwrap_or(config.output_format);

    match cli.command {
        Commands::Evaluate {
            user,
            character,
            role,
            character_tags,
            locked,
            reply,
        } => {
            let role = role.unwrap_or(if character.is_some() {
                MessageRole::Character
            } else {
                MessageRole::User
            });
            let mut history = vec![ChatMessage::user(user)];
            if let Some(text) = character {
                history.push(ChatMessage::character(text));
            }
            let event = SceneEvent::new(role, history)
                .with_character_tags(character_tags)
                .with_background_locked(locked);

            let evaluator = match reply {
                Some(reply) => open_evaluator_with(&config, Arc::new(ReplayTransport::new(reply)))?,
                None => open_evaluator(&config)?,
            };
            let report = evaluator.on_message_settled(event).await;
            output_report(output_format, &report)
        }

        Commands::Gate { text, level } => {
            let level = level.unwrap_or(config.regex_word_level);
            // The name lookup is optional here, gate without it when no source is set up
            let catalog = load_catalog(&config, &[]).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "gating without a catalog");
                Vec::new()
            });
            let verdict = TriggerDetector::new().evaluate(&text, level, &catalog);
            output_verdict(output_format, &verdict)
        }

        Commands::Catalog { character_tags } => {
            let catalog = load_catalog(&config, &character_tags)?;
            output_catalog(output_format, &catalog)
        }

        Commands::Prompt {
            scene,
            character_tags,
        } => {
            let catalog = load_catalog(&config, &character_tags)?;
            let names: Vec<&str> = catalog.iter().map(|o| o.display_name.as_str()).collect();
            let mut composer = PromptComposer::new(config.reply_marker);
            if config.unknown_sentinel {
                composer = composer.with_sentinel(UNKNOWN_SENTINEL);
            }
            let prompt = composer.compose(&names, &scene);
            output_prompt(output_format, composer.system_prompt(), &prompt)
        }

        Commands::Parse { reply, marker } => {
            let mut scores = parse_reply_with(&reply, marker.unwrap_or(config.reply_marker));
            scores.sort_by(|a, b| b.score.total_cmp(&a.score));
            output_scores(output_format, &scores)
        }

        Commands::Config(args) => cmd_config(config, config_path, args),
    }
}

/// Build the eligible catalog from the configured source
fn load_catalog(config: &Config, character_tags: &[String]) -> Result<Vec<CandidateOption>> {
    let source = open_catalog_source(config)?;
    let raw_labels = source.list_raw_labels()?;
    let filter = TagFilter::new(&config.tags, character_tags);
    build_catalog(&raw_labels, &filter).map_err(|e| Error::Catalog(e.to_string()))
}

fn cmd_config(mut config: Config, path: PathBuf, args: ConfigArgs) -> Result<()> {
    if args.reset {
        let config = Config::default();
        config.save_to(&path)?;
        println!("Configuration reset to defaults");
        println!("\n{}", config);
        return Ok(());
    }

    let mut modified = false;

    if let Some(enabled) = args.set_enabled {
        config.enabled = enabled;
        modified = true;
    }

    if let Some(fade) = args.set_fade {
        config.fade_enabled = fade;
        modified = true;
    }

    if let Some(ms) = args.set_fade_ms {
        config.fade_duration_ms = ms;
        modified = true;
    }

    if args.reset_threshold {
        config.reset_match_threshold();
        modified = true;
    } else if let Some(threshold) = args.set_threshold {
        config.set_match_threshold(threshold)?;
        modified = true;
    }

    if let Some(level) = args.set_level {
        config.set_regex_word_level(level)?;
        modified = true;
    }

    if let Some(tags) = args.set_tags {
        config.set_tags(&tags);
        modified = true;
    }

    if let Some(marker) = args.set_marker {
        config.reply_marker = marker;
        modified = true;
    }

    if let Some(sentinel) = args.set_unknown_sentinel {
        config.unknown_sentinel = sentinel;
        modified = true;
    }

    if let Some(command) = args.set_command {
        config.command = command;
        modified = true;
    }

    if let Some(flag) = args.set_system_prompt_flag {
        config.system_prompt_flag = Some(flag).filter(|f| !f.trim().is_empty());
        modified = true;
    }

    if let Some(secs) = args.set_timeout {
        config.set_timeout_secs(secs)?;
        modified = true;
    }

    if let Some(dir) = args.set_catalog_dir {
        config.catalog_dir = Some(dir);
        modified = true;
    }

    if let Some(file) = args.set_catalog_file {
        config.catalog_file = Some(file);
        modified = true;
    }

    if let Some(dir) = args.set_state_dir {
        config.state_dir = Some(dir);
        modified = true;
    }

    if let Some(output_format) = args.set_output {
        config.output_format = output_format;
        modified = true;
    }

    if modified {
        config.save_to(&path)?;
        println!("Configuration updated");
    }

    if args.show || !modified {
        println!("\n{}", config);
    }

    Ok(())
}
