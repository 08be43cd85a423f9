//! Output formatting module

use serde::Serialize;

use dynbg_app::app::{CycleOutcome, CycleReport};
use dynbg_domain::service::TriggerVerdict;
use dynbg_types::{CandidateOption, OutputFormat, Result, ScoredCandidate};

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    println!("{}", content);
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}

fn print_score_rows(scores: &[ScoredCandidate]) {
    if scores.is_empty() {
        println!("  (no valid entries)");
        return;
    }
    let width = scores.iter().map(|s| s.name.len()).max().unwrap_or(0);
    for score in scores {
        println!("  {:<width$}  {:>5.1}", score.name, score.score, width = width);
    }
}

fn print_verdict_rows(verdict: &TriggerVerdict) {
    println!("Movement:        {}", yes_no(verdict.movement));
    println!("Location:        {}", yes_no(verdict.location));
    println!(
        "Named in scene:  {}",
        verdict
            .default_option
            .as_ref()
            .map(|o| o.display_name.as_str())
            .unwrap_or("-")
    );
}

pub fn output_report(output_format: OutputFormat, report: &CycleReport) -> Result<()> {
    if output_format == OutputFormat::Json {
        return print_json(report);
    }

    println!("\nEvaluation Result");
    println!("=================");
    println!("Cycle:           {}", report.id);
    println!("Role:            {}", report.role);
    if !report.scene.is_empty() {
        println!("Scene:           {}", report.scene);
    }
    if let Some(verdict) = &report.verdict {
        print_verdict_rows(verdict);
    }
    if !report.scores.is_empty() {
        println!("\nScores:");
        print_score_rows(&report.scores);
        println!();
    }

    match &report.outcome {
        CycleOutcome::Skipped { reason } => println!("Outcome:         skipped ({})", reason),
        CycleOutcome::EmptyCatalog { message } => println!("Outcome:         {}", message),
        CycleOutcome::Decided { decision } => match decision.target() {
            Some(target) => println!(
                "Outcome:         {} -> {} ({})",
                decision.label(),
                target.display_name,
                target.handle
            ),
            None => println!("Outcome:         {}", decision.label()),
        },
        CycleOutcome::TransportFailed { error } => {
            println!("Outcome:         LLM call failed: {}", error)
        }
        CycleOutcome::Failed { error } => println!("Outcome:         failed: {}", error),
    }

    Ok(())
}

pub fn output_verdict(output_format: OutputFormat, verdict: &TriggerVerdict) -> Result<()> {
    if output_format == OutputFormat::Json {
        #[derive(Serialize)]
        struct GateOutput<'a> {
            should_evaluate: bool,
            #[serde(flatten)]
            verdict: &'a TriggerVerdict,
        }
        return print_json(&GateOutput {
            should_evaluate: verdict.should_evaluate(),
            verdict,
        });
    }

    println!("\nTrigger Gate");
    println!("============");
    print_verdict_rows(verdict);
    println!("Evaluate:        {}", yes_no(verdict.should_evaluate()));
    Ok(())
}

pub fn output_catalog(output_format: OutputFormat, catalog: &[CandidateOption]) -> Result<()> {
    if output_format == OutputFormat::Json {
        return print_json(catalog);
    }

    println!("\nBackgrounds ({})", catalog.len());
    println!("===============");
    let width = catalog.iter().map(|o| o.display_name.len()).max().unwrap_or(0);
    for option in catalog {
        let tags = if option.tags.is_empty() {
            String::new()
        } else {
            format!("[{}]", option.tags.join(", "))
        };
        println!("  {:<width$}  {}", option.display_name, tags, width = width);
    }
    Ok(())
}

pub fn output_prompt(output_format: OutputFormat, system_prompt: &str, prompt: &str) -> Result<()> {
    if output_format == OutputFormat::Json {
        #[derive(Serialize)]
        struct PromptOutput<'a> {
            system: &'a str,
            prompt: &'a str,
        }
        return print_json(&PromptOutput {
            system: system_prompt,
            prompt,
        });
    }

    println!("--- SYSTEM ---");
    println!("{}", system_prompt);
    println!("--- PROMPT ---");
    println!("{}", prompt);
    Ok(())
}

pub fn output_scores(output_format: OutputFormat, scores: &[ScoredCandidate]) -> Result<()> {
    if output_format == OutputFormat::Json {
        return print_json(scores);
    }

    println!("\nParsed Scores");
    println!("=============");
    print_score_rows(scores);
    Ok(())
}
