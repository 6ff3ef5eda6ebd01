use super::*;
use crate::project_identity;
use clap::CommandFactory;

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn install_collects_option_flags() {
    let parsed = Cli::try_parse_from([
        project_identity::BINARY_NAME,
        "install",
        "scoop",
        "vlc",
        "--source",
        "Scoop: extras",
        "--scope",
        "machine",
        "--custom",
        "--no-update-scoop",
        "--admin",
    ])
    .expect("install should parse");

    let Command::Install(args) = parsed.command else {
        panic!("expected install");
    };
    assert_eq!(args.backend, "scoop");
    assert_eq!(args.source.as_deref(), Some("Scoop: extras"));
    assert_eq!(args.custom.as_deref(), Some("--no-update-scoop"));
    assert!(args.admin);
    assert!(!args.purge);
}

#[test]
fn global_flags_parse_after_subcommand() {
    let parsed = Cli::try_parse_from([
        project_identity::BINARY_NAME,
        "installed",
        "-b",
        "pip",
        "--format",
        "json",
        "--quiet",
    ])
    .expect("installed should parse");
    assert_eq!(parsed.global.format, OutputFormat::Json);
    assert!(parsed.global.quiet);
}

#[test]
fn unknown_format_is_rejected() {
    let parsed = Cli::try_parse_from([project_identity::BINARY_NAME, "backends", "--format", "yaml"]);
    assert!(parsed.is_err());
}
