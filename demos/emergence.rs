use emergence_rs::{DetectorConfig, Engine, EngineOptions, ThresholdMode};
use std::env;
use std::fs;
use std::process::ExitCode;

/// Demo program: compress a file character-by-character and print the
/// MDL summary plus any emergence events along the induction trace.
///
/// Usage: cargo run --example emergence <filename>
fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    if args.len() != 2 {
        eprintln!("Usage: {} <filename>", args[0]);
        return ExitCode::FAILURE;
    }

    let text = match fs::read_to_string(&args[1]) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("Cannot read \"{}\": {}", args[1], err);
            return ExitCode::FAILURE;
        }
    };
    let tokens: Vec<char> = text.chars().collect();

    let options = EngineOptions {
        emergence: true,
        detector: DetectorConfig {
            mode: ThresholdMode::Adaptive,
            min_persistence: 1,
            ..DetectorConfig::default()
        },
        ..EngineOptions::default()
    };

    let result = match Engine::new().process(&tokens, &options) {
        Ok(result) => result,
        Err(err) => {
            eprintln!("Configuration error: {}", err);
            return ExitCode::FAILURE;
        }
    };

    println!("tokens:            {}", tokens.len());
    println!("compressed length: {}", result.compressed.len());
    println!("rules:             {}", result.rules.len());
    println!("mdl total:         {:.1} bits", result.mdl_total);
    println!("naive baseline:    {:.1} bits", result.naive_mdl);
    println!("compression ratio: {:.3}", result.compression_ratio);
    println!("coverage:          {:.3}", result.coverage);
    println!("lossless:          {}", result.valid_lossless);

    if let Some(events) = &result.events {
        println!("events:            {}", events.len());
        for event in events {
            let added: Vec<String> = event.rules_added.iter().map(|r| r.to_string()).collect();
            println!(
                "  step {:>4}  {:<11}  d2 {:+.4}  rules added: [{}]",
                event.index,
                event.kind.to_string(),
                event.magnitude,
                added.join(", ")
            );
        }
    }

    if !result.valid_lossless {
        eprintln!("reconstruction mismatch; treat results as corrupt");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
