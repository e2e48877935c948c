use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use tracing_subscriber::EnvFilter;
use weave_core::{WeaveConfig, Weaver};
use weave_rewrite::NamingScheme;

fn cli() -> Command {
    Command::new("weave")
        .version(weave_core::VERSION)
        .about("Weave advice into Go sources through an overlay tree")
        .arg(
            Arg::new("aspect")
                .value_name("ASPECT_FILE")
                .action(ArgAction::Append)
                .value_parser(value_parser!(PathBuf))
                .help("Aspect specification (.yaml, .yml, .json or .toml)"),
        )
        .arg(
            Arg::new("target")
                .long("target")
                .value_name("PACKAGE")
                .help("Target package: import path or directory relative to the source root"),
        )
        .arg(
            Arg::new("overlay")
                .long("overlay")
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf))
                .help("Directory receiving the woven tree"),
        )
        .arg(
            Arg::new("source-root")
                .long("source-root")
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf))
                .help("Root of the original tree [env: WEAVE_SOURCE_ROOT, default: .]"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file; flags override its values"),
        )
        .arg(
            Arg::new("naming")
                .long("naming")
                .value_parser(["sequential", "content"])
                .help("Synthetic identifier scheme"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Print the outcome as JSON"),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .action(ArgAction::SetTrue)
                .help("Verbose logging"),
        )
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn config_from(matches: &ArgMatches) -> anyhow::Result<WeaveConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => WeaveConfig::from_toml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => WeaveConfig::default(),
    };
    if let Some(files) = matches.get_many::<PathBuf>("aspect") {
        config.aspect_files = files.cloned().collect();
    }
    if let Some(target) = matches.get_one::<String>("target") {
        config = config.with_target(target.clone());
    }
    if let Some(overlay) = matches.get_one::<PathBuf>("overlay") {
        config = config.with_overlay_root(overlay.clone());
    }
    if let Some(root) = matches.get_one::<PathBuf>("source-root") {
        config = config.with_source_root(root.clone());
    }
    if let Some(naming) = matches.get_one::<String>("naming") {
        let scheme: NamingScheme = naming.parse().map_err(anyhow::Error::msg)?;
        config = config.with_naming(scheme);
    }
    Ok(config)
}

fn run(matches: &ArgMatches) -> anyhow::Result<()> {
    let config = config_from(matches)?;
    let outcome = Weaver::new(config).run()?;

    for diagnostic in &outcome.diagnostics {
        eprintln!("warning: {diagnostic}");
    }
    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else if outcome.is_nothing_to_do() {
        println!("nothing to do: no join points matched");
    } else {
        println!(
            "woven {} join points: {} files written, {} links created",
            outcome.join_points,
            outcome.written.len(),
            outcome.report.linked.len()
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("debug"));

    match run(&matches) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "weave failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn flags_override_defaults() {
        let matches = cli().get_matches_from([
            "weave",
            "trace.yaml",
            "--target=example.com/app",
            "--overlay",
            "/tmp/out",
            "--naming",
            "content",
        ]);
        let config = config_from(&matches).unwrap();
        assert_eq!(config.aspect_files, vec![PathBuf::from("trace.yaml")]);
        assert_eq!(config.target.as_deref(), Some("example.com/app"));
        assert_eq!(config.overlay_root, Some(PathBuf::from("/tmp/out")));
        assert_eq!(config.naming, NamingScheme::Content);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn two_aspect_files_fail_validation() {
        let matches = cli().get_matches_from(["weave", "a.yaml", "b.yaml", "--target=x", "--overlay=/o"]);
        let config = config_from(&matches).unwrap();
        assert!(config.validate().is_err());
    }
}
