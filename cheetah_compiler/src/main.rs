use cheetah_compiler::{batch, logging, pipeline};
use std::env;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize global logging system
    logging::init_global_logging()?;

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("cheetah_compiler");

    if args.iter().skip(1).any(|arg| arg == "--help") {
        print_help(program);
        return Ok(());
    }

    let options = match parse_options(&args[1..]) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("Error: {}", message);
            eprintln!("Usage: {} [options] PATHS...", program);
            eprintln!("       {} --help", program);
            std::process::exit(1);
        }
    };

    let mut config = batch::BatchConfig::default();
    if let Some(extension) = options.extension {
        config.extension = extension;
    }
    if let Some(threads) = options.threads {
        config.max_threads = threads;
    }
    if options.sequential {
        config.max_threads = 1;
    }
    config.fail_fast |= options.fail_fast;
    config.settings = pipeline::settings_with_overrides(&options.settings.join("\n"))?;

    match batch::compile_paths(&options.paths, &config) {
        Ok(results) => {
            if options.json {
                for output in &results.successful_files {
                    println!("{}", output.to_json()?);
                }
            }
            for (file_path, error) in &results.failed_files {
                eprintln!("{}: {}", file_path.display(), error);
            }
            println!("{}", results.summary());

            if !results.is_success() {
                std::process::exit(1);
            }
        }
        Err(error) => {
            eprintln!("Error: {}", error);
            std::process::exit(1);
        }
    }

    Ok(())
}

fn print_help(program_name: &str) {
    println!("Cheetah template compiler v{}", env!("CARGO_PKG_VERSION"));
    println!("Compiles Cheetah templates into Python modules");
    println!();
    println!("USAGE:");
    println!("    {} [options] PATHS...", program_name);
    println!();
    println!("ARGUMENTS:");
    println!("    PATHS          Template files, or directories searched recursively");
    println!();
    println!("OPTIONS:");
    println!("    --help                Show this help message");
    println!("    --extension EXT       Template file suffix (default: .tmpl)");
    println!("    --sequential          Compile on the calling thread only");
    println!("    --threads N           Number of worker threads");
    println!("    --fail-fast           Stop at the first failing template");
    println!("    --json                Print one JSON record per compiled template");
    println!("    --setting KEY=VALUE   Override a compiler setting (repeatable)");
}

#[derive(Debug, Default, PartialEq)]
struct CliOptions {
    extension: Option<String>,
    threads: Option<usize>,
    sequential: bool,
    fail_fast: bool,
    json: bool,
    settings: Vec<String>,
    paths: Vec<PathBuf>,
}

fn parse_options(args: &[String]) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--extension" => {
                let value = iter.next().ok_or("--extension requires a value")?;
                options.extension = Some(value.clone());
            }
            "--threads" => {
                let value = iter.next().ok_or("--threads requires a number")?;
                let threads = value
                    .parse::<usize>()
                    .map_err(|_| format!("Invalid thread count '{}'", value))?;
                options.threads = Some(threads.max(1));
            }
            "--setting" => {
                let value = iter.next().ok_or("--setting requires KEY=VALUE")?;
                options.settings.push(value.clone());
            }
            "--sequential" => options.sequential = true,
            "--fail-fast" => options.fail_fast = true,
            "--json" => options.json = true,
            other if other.starts_with("--") => {
                return Err(format!("Unknown option '{}'", other));
            }
            path => options.paths.push(PathBuf::from(path)),
        }
    }

    if options.paths.is_empty() {
        return Err("no template paths given".to_string());
    }
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn test_parse_options() {
        let options = parse_options(&args(&[
            "--threads",
            "4",
            "--fail-fast",
            "--extension",
            ".cheetah",
            "--setting",
            "useNameMapper=False",
            "templates",
            "one.tmpl",
        ]))
        .unwrap();

        assert_eq!(options.threads, Some(4));
        assert!(options.fail_fast);
        assert_eq!(options.extension.as_deref(), Some(".cheetah"));
        assert_eq!(options.settings, vec!["useNameMapper=False".to_string()]);
        assert_eq!(
            options.paths,
            vec![PathBuf::from("templates"), PathBuf::from("one.tmpl")]
        );
    }

    #[test]
    fn test_parse_options_errors() {
        assert!(parse_options(&args(&["--threads", "many", "x"])).is_err());
        assert!(parse_options(&args(&["--bogus", "x"])).is_err());
        assert!(parse_options(&args(&["--json"])).is_err());
        assert!(parse_options(&args(&["--extension"])).is_err());
    }
}
