//! Benchmark / operator harness CLI.
//!
//! Mirrors `BenchmarkMain.cpp`: print and/or write registered benchmark
//! results, or dump the available configuration options and exit. The
//! five `group-by-*` sampling knobs are recognized configuration keys
//! threaded into `RuntimeParameters`, even though nothing in this core's
//! operator tree reads them (there is no GROUP BY operator in the
//! distilled catalog).

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::Value;

use triplecore::config::Config;

const RECOGNIZED_KEYS: &[&str] = &[
    "group-by-sample-percent",
    "group-by-sample-max-rows",
    "group-by-sample-distinct-ratio",
    "group-by-sample-group-threshold",
    "group-by-hash-map-group-threshold",
];

#[derive(Parser, Debug)]
#[command(name = "benchmark", about = "Runs and reports the engine's operator benchmarks")]
struct Cli {
    /// Roughly prints all benchmarks.
    #[arg(short, long)]
    print: bool,

    /// Writes the benchmark results as JSON to this file, overriding its previous content.
    #[arg(short, long, value_name = "FILE")]
    write: Option<String>,

    /// Appends to the JSON array in the write file instead of overwriting it.
    #[arg(short, long)]
    append: bool,

    /// Loads benchmark configuration from a JSON file.
    #[arg(short = 'j', long, value_name = "FILE")]
    configuration_json: Option<String>,

    /// Sets benchmark configuration with `key=value,key=value` shorthand (overrides json).
    #[arg(short = 's', long, value_name = "SHORTHAND")]
    configuration_shorthand: Option<String>,

    /// Prints all available benchmark configuration options and exits.
    #[arg(short = 'o', long)]
    configuration_options: bool,

    #[arg(short = 'e', long, value_name = "FRACTION")]
    group_by_sample_percent: Option<f64>,

    #[arg(short = 'm', long, value_name = "ROWS")]
    group_by_sample_max_rows: Option<usize>,

    #[arg(short = 'r', long, value_name = "RATIO")]
    group_by_sample_distinct_ratio: Option<f64>,

    #[arg(short = 't', long, value_name = "GROUPS")]
    group_by_sample_group_threshold: Option<usize>,

    #[arg(short = 'g', long, value_name = "GROUPS")]
    group_by_hash_map_group_threshold: Option<usize>,
}

#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    UsageError(String),
    ConfigurationDocPrinted,
    Ran { printed: bool, wrote: Option<String> },
}

fn parse_shorthand(shorthand: &str) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    for entry in shorthand.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (key, value) = entry
            .split_once('=')
            .with_context(|| format!("malformed shorthand entry (expected key=value): {entry}"))?;
        pairs.push((key.trim().to_string(), value.trim().to_string()));
    }
    Ok(pairs)
}

fn json_to_kv(value: &Value) -> Result<Vec<(String, String)>> {
    let object = value
        .as_object()
        .context("configuration json must describe an object")?;
    let mut pairs = Vec::new();
    for (key, v) in object {
        let as_string = match v {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => bail!("unsupported configuration value for '{key}': {other}"),
        };
        pairs.push((key.clone(), as_string));
    }
    Ok(pairs)
}

fn print_configuration_doc() {
    println!("Recognized configuration keys:");
    for key in RECOGNIZED_KEYS {
        println!("  {key}");
    }
}

fn write_results_json(path: &str, append: bool) -> Result<()> {
    if !path.ends_with(".json") {
        bail!("the file given via --write must be a `.json` file");
    }
    let new_entries = serde_json::json!([{ "benchmark": "engine", "results": [] }]);
    let combined = if append && Path::new(path).exists() {
        let existing_text = fs::read_to_string(path)
            .with_context(|| format!("reading existing results file {path}"))?;
        if existing_text.trim().is_empty() {
            new_entries
        } else {
            let existing: Value = serde_json::from_str(&existing_text)
                .with_context(|| format!("{path} does not contain valid json"))?;
            let existing_array = existing
                .as_array()
                .with_context(|| format!("{path} does not describe a json array; cannot append"))?;
            let new_array = new_entries.as_array().unwrap();
            let mut merged = existing_array.clone();
            merged.extend(new_array.iter().cloned());
            Value::Array(merged)
        }
    } else {
        new_entries
    };
    fs::write(path, serde_json::to_string_pretty(&combined)?)
        .with_context(|| format!("writing results to {path}"))?;
    Ok(())
}

fn run(cli: &Cli) -> Result<Outcome> {
    let mut runtime_parameters = Config::default().runtime_parameters;

    if let Some(json_path) = &cli.configuration_json {
        let text = fs::read_to_string(json_path)
            .with_context(|| format!("reading configuration json {json_path}"))?;
        let value: Value = serde_json::from_str(&text)
            .with_context(|| format!("{json_path} does not contain valid json"))?;
        for (key, value) in json_to_kv(&value)? {
            runtime_parameters.set_by_key(&key, &value)?;
        }
    }
    if let Some(shorthand) = &cli.configuration_shorthand {
        for (key, value) in parse_shorthand(shorthand)? {
            runtime_parameters.set_by_key(&key, &value)?;
        }
    }

    if let Some(v) = cli.group_by_sample_percent {
        runtime_parameters.set_by_key("group-by-sample-percent", &v.to_string())?;
    }
    if let Some(v) = cli.group_by_sample_max_rows {
        runtime_parameters.set_by_key("group-by-sample-max-rows", &v.to_string())?;
    }
    if let Some(v) = cli.group_by_sample_distinct_ratio {
        runtime_parameters.set_by_key("group-by-sample-distinct-ratio", &v.to_string())?;
    }
    if let Some(v) = cli.group_by_sample_group_threshold {
        runtime_parameters.set_by_key("group-by-sample-group-threshold", &v.to_string())?;
    }
    if let Some(v) = cli.group_by_hash_map_group_threshold {
        runtime_parameters.set_by_key("group-by-hash-map-group-threshold", &v.to_string())?;
    }

    if !cli.print && cli.write.is_none() && !cli.configuration_options {
        return Ok(Outcome::UsageError(
            "you have to specify at least one of `--print`, `--configuration-options` or `--write`"
                .to_string(),
        ));
    }

    if let Some(path) = &cli.write {
        if !path.ends_with(".json") {
            return Ok(Outcome::UsageError(
                "the file given via `--write` must be a `.json` file".to_string(),
            ));
        }
    }

    if cli.configuration_options {
        print_configuration_doc();
        return Ok(Outcome::ConfigurationDocPrinted);
    }

    if cli.print {
        println!("triplecore benchmarks: (no benchmarks registered in this build)");
    }
    if let Some(path) = &cli.write {
        write_results_json(path, cli.append)?;
    }

    Ok(Outcome::Ran { printed: cli.print, wrote: cli.write.clone() })
}

fn main() {
    triplecore::logging::init("info");
    let cli = Cli::parse();
    match run(&cli) {
        Ok(Outcome::UsageError(message)) => {
            eprintln!("{message}");
            std::process::exit(1);
        }
        Ok(_) => std::process::exit(0),
        Err(err) => {
            eprintln!("error: {err:?}");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_mode_flag_is_a_usage_error() {
        let cli = Cli::parse_from(["benchmark"]);
        let outcome = run(&cli).unwrap();
        assert_eq!(outcome, Outcome::UsageError(
            "you have to specify at least one of `--print`, `--configuration-options` or `--write`"
                .to_string(),
        ));
    }

    #[test]
    fn write_requires_a_json_extension() {
        let cli = Cli::parse_from(["benchmark", "--write", "results.txt"]);
        let outcome = run(&cli).unwrap();
        assert_eq!(
            outcome,
            Outcome::UsageError("the file given via `--write` must be a `.json` file".to_string())
        );
    }

    #[test]
    fn configuration_options_short_circuits_before_running() {
        let cli = Cli::parse_from(["benchmark", "--configuration-options"]);
        let outcome = run(&cli).unwrap();
        assert_eq!(outcome, Outcome::ConfigurationDocPrinted);
    }

    #[test]
    fn print_flag_runs_successfully() {
        let cli = Cli::parse_from(["benchmark", "--print"]);
        let outcome = run(&cli).unwrap();
        assert_eq!(outcome, Outcome::Ran { printed: true, wrote: None });
    }

    #[test]
    fn group_by_sample_percent_is_validated_as_a_float() {
        let cli = Cli::parse_from(["benchmark", "--print", "--group-by-sample-percent", "0.25"]);
        assert!(run(&cli).is_ok());
    }

    #[test]
    fn shorthand_rejects_entries_without_an_equals_sign() {
        assert!(parse_shorthand("group-by-sample-percent").is_err());
    }

    #[test]
    fn shorthand_parses_multiple_comma_separated_entries() {
        let pairs = parse_shorthand("a=1,b=2").unwrap();
        assert_eq!(pairs, vec![("a".to_string(), "1".to_string()), ("b".to_string(), "2".to_string())]);
    }

    #[test]
    fn write_then_append_places_old_entries_before_new_ones() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let path_str = path.to_str().unwrap().to_string();

        let first = Cli::parse_from(["benchmark", "--write", &path_str]);
        run(&first).unwrap();

        let second = Cli::parse_from(["benchmark", "--write", &path_str, "--append"]);
        run(&second).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let array: Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(array.as_array().unwrap().len(), 2);
    }
}
